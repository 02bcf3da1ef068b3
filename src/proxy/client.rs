//! Upstream HTTP client management
//!
//! Shared hyper clients with connection pooling, so forwarded requests reuse
//! connections instead of paying the establishment cost per request.

use crate::config::settings::HttpClientConfig;
use hyper::client::{HttpConnector, ResponseFuture};
use hyper::{Body, Client, Request};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use std::time::Duration;
use tracing::debug;

/// Pooled upstream clients, one per scheme
pub struct HttpClient {
    https_client: Client<HttpsConnector<HttpConnector>, Body>,
    http_client: Client<HttpConnector, Body>,
}

impl HttpClient {
    /// Create the pooled clients from configuration
    pub fn from_config(config: &HttpClientConfig) -> Self {
        let idle_timeout = Duration::from_secs(config.idle_timeout_secs);
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let max_idle_per_host = config.max_idle_per_host as usize;

        debug!(
            "Initializing upstream clients: max_idle_per_host={}, idle_timeout={:?}, connect_timeout={:?}",
            max_idle_per_host, idle_timeout, connect_timeout
        );

        let https_connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .build();

        let https_client = Client::builder()
            .pool_idle_timeout(idle_timeout)
            .pool_max_idle_per_host(max_idle_per_host)
            .build(https_connector);

        let mut http_connector = HttpConnector::new();
        http_connector.set_connect_timeout(Some(connect_timeout));
        http_connector.set_nodelay(true);

        let http_client = Client::builder()
            .pool_idle_timeout(idle_timeout)
            .pool_max_idle_per_host(max_idle_per_host)
            .build(http_connector);

        Self {
            https_client,
            http_client,
        }
    }

    /// Dispatch a request on the client matching the target scheme
    pub fn request(&self, scheme: &str, req: Request<Body>) -> ResponseFuture {
        if scheme == "https" {
            self.https_client.request(req)
        } else {
            self.http_client.request(req)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_build_from_default_config() {
        let config = HttpClientConfig::default();
        // construction must not panic or perform I/O
        let _client = HttpClient::from_config(&config);
    }
}
