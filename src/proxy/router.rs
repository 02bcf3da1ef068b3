//! Request routing
//!
//! Classifies each inbound request: the excluded static routes first, then
//! CONNECT, then the proxyable rest. Exactly one outcome applies per
//! request. This is the only module aware of both the forwarder and the
//! tunnel establisher; the server shell dispatches on the returned route.

use crate::config::settings::ProxyMode;
use crate::utils::http::build_error_response;
use hyper::{header, Body, Method, Response, StatusCode};

/// Outcome of routing one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Root informational route
    Info,
    /// Health-check route
    Health,
    /// A static route hit with a method other than GET
    MethodNotAllowed,
    /// CONNECT request, handled by the tunnel establisher
    Tunnel,
    /// Proxyable request, handled by the resolver and forwarder
    Forward,
    /// Unmatched path in static mode
    NotFound,
}

/// Classify a request by method and path
///
/// Static routes match on exact path; query strings do not defeat the
/// match, trailing slashes do.
pub fn classify(method: &Method, path: &str, mode: ProxyMode, mount: &str) -> Route {
    if path == "/" || path == "/health" {
        if method != Method::GET {
            return Route::MethodNotAllowed;
        }
        return if path == "/" { Route::Info } else { Route::Health };
    }

    if method == Method::CONNECT {
        return Route::Tunnel;
    }

    match mode {
        ProxyMode::Dynamic => Route::Forward,
        ProxyMode::Static => {
            if matches_mount(path, mount) {
                Route::Forward
            } else {
                Route::NotFound
            }
        }
    }
}

/// Whether a path falls under the proxy mount prefix
///
/// The bare mount matches; a longer segment sharing the prefix does not.
fn matches_mount(path: &str, mount: &str) -> bool {
    match path.strip_prefix(mount) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// Root informational route body
pub fn info_response(mode: ProxyMode) -> Response<Body> {
    let body = match mode {
        ProxyMode::Static => {
            "Proxy server is running. Use /health to check status or /proxy to route through the proxy."
        }
        ProxyMode::Dynamic => {
            "Proxy server is running. Use /health to check status, or send proxy-form requests to relay traffic."
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; charset=utf-8")
        .body(Body::from(body))
        .unwrap()
}

/// Health-check route body
pub fn health_response() -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; charset=utf-8")
        .body(Body::from("Proxy server is healthy"))
        .unwrap()
}

/// 404 for unmatched paths in static mode
pub fn not_found_response() -> Response<Body> {
    build_error_response(
        StatusCode::NOT_FOUND,
        "Not Found: Use /proxy to route through the proxy, or /health to check status.",
    )
}

/// 405 for non-GET requests to the static routes
pub fn method_not_allowed_response() -> Response<Body> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(header::ALLOW, "GET")
        .body(Body::from("Method Not Allowed"))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_routes_match_exactly() {
        assert_eq!(classify(&Method::GET, "/", ProxyMode::Dynamic, "/proxy"), Route::Info);
        assert_eq!(
            classify(&Method::GET, "/health", ProxyMode::Dynamic, "/proxy"),
            Route::Health
        );
        // trailing slash defeats the match
        assert_eq!(
            classify(&Method::GET, "/health/", ProxyMode::Dynamic, "/proxy"),
            Route::Forward
        );
    }

    #[test]
    fn static_routes_are_get_only() {
        assert_eq!(
            classify(&Method::POST, "/health", ProxyMode::Dynamic, "/proxy"),
            Route::MethodNotAllowed
        );
    }

    #[test]
    fn connect_goes_to_the_tunnel() {
        assert_eq!(
            classify(&Method::CONNECT, "", ProxyMode::Dynamic, "/proxy"),
            Route::Tunnel
        );
        assert_eq!(
            classify(&Method::CONNECT, "", ProxyMode::Static, "/proxy"),
            Route::Tunnel
        );
    }

    #[test]
    fn dynamic_mode_forwards_everything_else() {
        assert_eq!(
            classify(&Method::GET, "/anything/at/all", ProxyMode::Dynamic, "/proxy"),
            Route::Forward
        );
        assert_eq!(
            classify(&Method::POST, "/submit", ProxyMode::Dynamic, "/proxy"),
            Route::Forward
        );
    }

    #[test]
    fn static_mode_only_forwards_under_the_mount() {
        assert_eq!(
            classify(&Method::GET, "/proxy/search", ProxyMode::Static, "/proxy"),
            Route::Forward
        );
        assert_eq!(
            classify(&Method::GET, "/proxy", ProxyMode::Static, "/proxy"),
            Route::Forward
        );
        assert_eq!(
            classify(&Method::GET, "/proxyfoo", ProxyMode::Static, "/proxy"),
            Route::NotFound
        );
        assert_eq!(
            classify(&Method::GET, "/elsewhere", ProxyMode::Static, "/proxy"),
            Route::NotFound
        );
    }
}
