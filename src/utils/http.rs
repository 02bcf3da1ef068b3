//! HTTP utility functions

use hyper::{Body, Response, StatusCode};

/// Check if a header is a hop-by-hop header
pub fn is_hop_by_hop_header(name: &str) -> bool {
    let hop_by_hop_headers = [
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailers",
        "transfer-encoding",
        "upgrade",
    ];

    hop_by_hop_headers.contains(&name.to_lowercase().as_str())
}

/// Whether a header may be copied onto a proxied request or response
///
/// Filters the hop-by-hop set plus headers the proxy rewrites itself.
pub fn should_forward_header(name: &str) -> bool {
    if is_hop_by_hop_header(name) {
        return false;
    }

    !matches!(name.to_lowercase().as_str(), "host" | "proxy-connection")
}

/// Build error response
pub fn build_error_response(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain; charset=utf-8")
        .body(Body::from(message.to_string()))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_headers_are_detected() {
        assert!(is_hop_by_hop_header("Connection"));
        assert!(is_hop_by_hop_header("transfer-encoding"));
        assert!(is_hop_by_hop_header("Proxy-Authorization"));
        assert!(!is_hop_by_hop_header("content-type"));
        assert!(!is_hop_by_hop_header("accept"));
    }

    #[test]
    fn proxy_owned_headers_are_not_forwarded() {
        assert!(!should_forward_header("Host"));
        assert!(!should_forward_header("Proxy-Connection"));
        assert!(!should_forward_header("keep-alive"));
        assert!(should_forward_header("User-Agent"));
        assert!(should_forward_header("X-Request-Id"));
    }

    #[test]
    fn error_response_carries_status_and_body() {
        let response = build_error_response(StatusCode::BAD_GATEWAY, "upstream is down");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
