//! Upstream request forwarding
//!
//! Replays an inbound request against its resolved target and relays the
//! upstream response back. Bodies stream through in both directions; the
//! proxy never buffers them.

use crate::error::{Error, Result};
use crate::proxy::client::HttpClient;
use crate::proxy::resolver::UpstreamTarget;
use crate::utils::http::should_forward_header;
use hyper::{header, Body, Request, Response};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Forward a request to `target` and return the upstream response
///
/// `path_and_query` is the already-rewritten request target; the caller
/// decides whether a mount prefix was stripped. Connection failures, DNS
/// failures, and timeouts surface as `Error::UpstreamUnreachable`; they are
/// never retried here.
pub async fn forward(
    req: Request<Body>,
    target: &UpstreamTarget,
    path_and_query: &str,
    client: &HttpClient,
    request_timeout: Duration,
) -> Result<Response<Body>> {
    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let uri = target.uri_for(path_and_query);

    let mut builder = Request::builder().method(parts.method).uri(uri.as_str());
    let mut forwarded_headers = 0;
    let mut skipped_headers = 0;
    for (name, value) in parts.headers.iter() {
        if should_forward_header(name.as_str()) {
            builder = builder.header(name, value);
            forwarded_headers += 1;
        } else {
            skipped_headers += 1;
        }
    }
    debug!(
        "Header forwarding: {} forwarded, {} skipped (hop-by-hop)",
        forwarded_headers, skipped_headers
    );

    // Origin-change semantics: the upstream sees itself as the request host
    builder = builder.header(header::HOST, target.host_header());

    let upstream_req = builder
        .body(body)
        .map_err(|e| Error::InvalidTarget(format!("failed to build upstream request: {}", e)))?;

    debug!("Forwarding {} {} to {}", method, path_and_query, target.origin());

    let upstream_start = Instant::now();
    let response = match tokio::time::timeout(request_timeout, client.request(&target.scheme, upstream_req)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            return Err(Error::UpstreamUnreachable(format!(
                "{}: {}",
                target.origin(),
                e
            )));
        }
        Err(_) => {
            return Err(Error::UpstreamUnreachable(format!(
                "{}: no response within {}s",
                target.origin(),
                request_timeout.as_secs()
            )));
        }
    };

    let status = response.status();
    info!(
        "{} {} -> {} ({}ms)",
        method,
        path_and_query,
        status,
        upstream_start.elapsed().as_millis()
    );

    // Propagate status and headers verbatim, minus the hop-by-hop set,
    // and stream the body back without buffering
    let (parts, body) = response.into_parts();
    let mut builder = Response::builder().status(parts.status);
    for (name, value) in parts.headers.iter() {
        if should_forward_header(name.as_str()) {
            builder = builder.header(name, value);
        }
    }

    builder
        .body(body)
        .map_err(|e| Error::UpstreamUnreachable(format!("failed to rebuild upstream response: {}", e)))
}

/// Strip the mount prefix from a static-mode path-and-query
///
/// `/proxy/search?q=x` becomes `/search?q=x`; the bare mount becomes `/`.
/// Paths outside the mount pass through untouched (the router keeps them
/// from reaching the forwarder in static mode).
pub fn rewrite_mount_path(path_and_query: &str, mount: &str) -> String {
    match path_and_query.strip_prefix(mount) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        Some(rest) if rest.starts_with('?') => format!("/{}", rest),
        _ => path_and_query.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_prefix_is_stripped() {
        assert_eq!(rewrite_mount_path("/proxy/search?q=x", "/proxy"), "/search?q=x");
        assert_eq!(rewrite_mount_path("/proxy/a/b", "/proxy"), "/a/b");
    }

    #[test]
    fn bare_mount_becomes_root() {
        assert_eq!(rewrite_mount_path("/proxy", "/proxy"), "/");
        assert_eq!(rewrite_mount_path("/proxy?q=x", "/proxy"), "/?q=x");
    }

    #[test]
    fn unrelated_paths_pass_through() {
        assert_eq!(rewrite_mount_path("/other", "/proxy"), "/other");
        // a longer path segment that merely shares the prefix is not rewritten
        assert_eq!(rewrite_mount_path("/proxyfoo", "/proxy"), "/proxyfoo");
    }
}
