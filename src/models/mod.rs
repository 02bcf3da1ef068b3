use chrono::{DateTime, Utc};
use hyper::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

// Core data extracted from an HTTP request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestData {
    // Basic HTTP information
    pub method: String,
    pub url: String,
    pub path: String,
    pub query_string: Option<String>,

    // Client information
    pub client_ip: IpAddr,
    pub client_port: u16,

    // Timing
    pub timestamp: DateTime<Utc>,
    pub duration_ms: Option<u64>,

    // Request metadata
    pub host: Option<String>,
    pub user_agent: Option<String>,
}

// Response data we'll collect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    pub status_code: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub response_time_ms: u64,
}

// Complete request-response pair for logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyLog {
    pub request: RequestData,
    pub response: Option<ResponseData>,
    pub error: Option<String>,
}

impl RequestData {
    // Create a new RequestData from the inbound request parts
    pub fn new(method: &Method, uri: &Uri, remote_addr: SocketAddr, headers: &HeaderMap) -> Self {
        // CONNECT carries an authority, not a path
        let (path, query_string) = if method == Method::CONNECT {
            (String::new(), None)
        } else {
            (uri.path().to_string(), uri.query().map(|q| q.to_string()))
        };

        let header_value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        Self {
            method: method.to_string(),
            url: uri.to_string(),
            path,
            query_string,
            client_ip: remote_addr.ip(),
            client_port: remote_addr.port(),
            timestamp: Utc::now(),
            duration_ms: None,
            host: header_value("host"),
            user_agent: header_value("user-agent"),
        }
    }
}

impl ResponseData {
    pub fn new(status_code: u16, status_text: String, content_type: Option<String>, response_time_ms: u64) -> Self {
        Self {
            status_code,
            status_text,
            content_type,
            response_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_data_splits_path_and_query() {
        let uri: Uri = "/search?q=rust".parse().unwrap();
        let data = RequestData::new(
            &Method::GET,
            &uri,
            "127.0.0.1:50000".parse().unwrap(),
            &HeaderMap::new(),
        );
        assert_eq!(data.path, "/search");
        assert_eq!(data.query_string.as_deref(), Some("q=rust"));
        assert_eq!(data.client_port, 50000);
    }

    #[test]
    fn connect_request_has_no_path() {
        let uri: Uri = "example.com:443".parse().unwrap();
        let data = RequestData::new(
            &Method::CONNECT,
            &uri,
            "127.0.0.1:50000".parse().unwrap(),
            &HeaderMap::new(),
        );
        assert_eq!(data.path, "");
        assert!(data.query_string.is_none());
        assert_eq!(data.url, "example.com:443");
    }
}
