//! Relaygate - a forward HTTP/HTTPS proxy server
//!
//! This library provides a forward proxy with per-request target resolution,
//! transparent HTTP forwarding, CONNECT tunneling, and an optional basic
//! authentication gate.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod proxy;
pub mod utils;

// Re-export commonly used items
pub use config::settings::{ProxyConfig, ProxyMode};
pub use error::{Error, Result};
pub use logging::{init_logger, init_logger_with_config, log_debug, log_error, log_info, log_warning};
pub use models::{ProxyLog, RequestData, ResponseData};
pub use proxy::resolver::UpstreamTarget;
pub use proxy::server::ProxyServer;
