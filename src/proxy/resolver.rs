//! Upstream target resolution
//!
//! Derives a validated origin for each request from, in order: the
//! absolute-form request URL, the Host header, and the configured fallback
//! target. Pure derivation, no I/O.

use crate::error::{Error, Result};
use hyper::Uri;
use url::Url;

/// A validated upstream origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl UpstreamTarget {
    /// Parse and validate an origin string such as `https://example.com:8443`
    pub fn parse(origin: &str) -> Result<Self> {
        let url = Url::parse(origin)
            .map_err(|e| Error::InvalidTarget(format!("{}: {}", origin, e)))?;
        Self::from_url(&url)
    }

    fn from_url(url: &Url) -> Result<Self> {
        let scheme = url.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(Error::InvalidTarget(format!(
                "unsupported scheme '{}' in {}",
                scheme, url
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidTarget(format!("no host in {}", url)))?
            .to_string();

        // http and https both carry known default ports
        let port = url.port_or_known_default().unwrap_or(80);

        Ok(Self { scheme, host, port })
    }

    fn is_default_port(&self) -> bool {
        matches!(
            (self.scheme.as_str(), self.port),
            ("http", 80) | ("https", 443)
        )
    }

    /// Origin string, omitting the scheme's default port
    pub fn origin(&self) -> String {
        if self.is_default_port() {
            format!("{}://{}", self.scheme, self.host)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }

    /// Value for the outgoing Host header
    pub fn host_header(&self) -> String {
        if self.is_default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Absolute URI for the given path-and-query on this target
    pub fn uri_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.origin(), path_and_query)
    }
}

/// Resolve the upstream target for a request
///
/// Precedence: absolute-form request URL, then Host header with an implied
/// http scheme, then the configured fallback. A candidate that is present
/// but malformed is an error; resolution never falls through past it.
pub fn resolve(
    uri: &Uri,
    host_header: Option<&str>,
    fallback: Option<&UpstreamTarget>,
) -> Result<UpstreamTarget> {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return UpstreamTarget::parse(&uri.to_string());
    }

    if let Some(host) = host_header {
        let host = host.trim();
        if !host.is_empty() {
            return UpstreamTarget::parse(&format!("http://{}", host));
        }
    }

    match fallback {
        Some(target) => Ok(target.clone()),
        None => Err(Error::InvalidTarget(
            "request carries no absolute URL, Host header, or configured target".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn absolute_form_url_wins() {
        let target = resolve(&uri("http://example.com:8080/path?q=1"), Some("other.host"), None).unwrap();
        assert_eq!(target.scheme, "http");
        assert_eq!(target.host, "example.com");
        assert_eq!(target.port, 8080);
    }

    #[test]
    fn absolute_https_url_defaults_to_443() {
        let target = resolve(&uri("https://example.com/"), None, None).unwrap();
        assert_eq!(target.port, 443);
        assert_eq!(target.origin(), "https://example.com");
        assert_eq!(target.host_header(), "example.com");
    }

    #[test]
    fn host_header_is_used_for_origin_form_requests() {
        let target = resolve(&uri("/search?q=x"), Some("api.internal:3000"), None).unwrap();
        assert_eq!(target.scheme, "http");
        assert_eq!(target.host, "api.internal");
        assert_eq!(target.port, 3000);
        assert_eq!(target.host_header(), "api.internal:3000");
    }

    #[test]
    fn host_header_without_port_defaults_to_80() {
        let target = resolve(&uri("/"), Some("example.com"), None).unwrap();
        assert_eq!(target.port, 80);
        assert_eq!(target.origin(), "http://example.com");
    }

    #[test]
    fn fallback_is_used_when_nothing_else_is_present() {
        let fallback = UpstreamTarget::parse("https://fallback.example").unwrap();
        let target = resolve(&uri("/"), None, Some(&fallback)).unwrap();
        assert_eq!(target, fallback);
    }

    #[test]
    fn malformed_host_header_is_rejected_not_skipped() {
        let fallback = UpstreamTarget::parse("https://fallback.example").unwrap();
        let result = resolve(&uri("/"), Some("bad host"), Some(&fallback));
        assert!(matches!(result, Err(Error::InvalidTarget(_))));
    }

    #[test]
    fn missing_everything_is_invalid() {
        assert!(matches!(
            resolve(&uri("/"), None, None),
            Err(Error::InvalidTarget(_))
        ));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        assert!(matches!(
            UpstreamTarget::parse("ftp://example.com"),
            Err(Error::InvalidTarget(_))
        ));
    }

    #[test]
    fn origin_and_uri_building_keep_explicit_ports() {
        let target = UpstreamTarget::parse("http://localhost:9000").unwrap();
        assert_eq!(target.origin(), "http://localhost:9000");
        assert_eq!(target.uri_for("/a/b?c=d"), "http://localhost:9000/a/b?c=d");
    }
}
