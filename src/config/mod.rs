//! Configuration management

pub mod settings;

pub use settings::{AuthConfig, HttpClientConfig, ProxyConfig, ProxyMode, RoutingConfig, UpstreamConfig};
