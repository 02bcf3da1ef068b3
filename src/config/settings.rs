//! Proxy server configuration settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

/// Target used when static routing is selected without an explicit origin
pub const DEFAULT_STATIC_TARGET: &str = "https://www.google.com";

/// Main configuration for the proxy server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Server listening address
    pub listen_addr: SocketAddr,

    /// Log level configuration
    pub log_level: String,

    /// Request routing configuration
    pub routing: RoutingConfig,

    /// Upstream target configuration
    pub upstream: UpstreamConfig,

    /// Basic authentication configuration
    pub auth: AuthConfig,

    /// HTTP client configuration
    pub http_client: HttpClientConfig,
}

/// How the proxy derives the upstream target for each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Requests under the mount prefix go to the configured target; the
    /// prefix is stripped from the forwarded path
    Static,

    /// The target is derived per request from the absolute-form URL or
    /// the Host header
    Dynamic,
}

impl FromStr for ProxyMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "static" => Ok(ProxyMode::Static),
            "dynamic" => Ok(ProxyMode::Dynamic),
            other => Err(anyhow::anyhow!(
                "Unknown proxy mode '{}', expected 'static' or 'dynamic'",
                other
            )),
        }
    }
}

/// Request routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Routing mode: "static" or "dynamic"
    pub mode: ProxyMode,

    /// Mount prefix for proxyable paths in static mode
    pub mount: String,
}

/// Upstream target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Static upstream target origin, used as the routing target in static
    /// mode and as the resolution fallback in dynamic mode
    pub url: Option<String>,

    /// Connection timeout in seconds
    pub connect_timeout: u64,

    /// Request timeout in seconds
    pub request_timeout: u64,
}

/// Basic authentication configuration
///
/// The gate is active only when both fields are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Maximum idle connections per host
    pub max_idle_per_host: u32,

    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:3000".parse().unwrap()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_level: default_log_level(),
            routing: RoutingConfig::default(),
            upstream: UpstreamConfig::default(),
            auth: AuthConfig::default(),
            http_client: HttpClientConfig::default(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mode: ProxyMode::Dynamic,
            mount: "/proxy".to_string(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout: 10,
            request_timeout: 30,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 50,
            idle_timeout_secs: 90,
            connect_timeout_secs: 10,
        }
    }
}

impl ProxyConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: ProxyConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// Starts from `path` if given, otherwise from `config.yml` when it
    /// exists, otherwise from defaults. Environment variables take
    /// precedence over the file in all cases.
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => {
                let default_path = Path::new("config.yml");
                if default_path.exists() {
                    Self::from_yaml_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to this configuration
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(addr_str) = std::env::var("PROXY_LISTEN_ADDR") {
            self.listen_addr = addr_str
                .parse()
                .with_context(|| format!("Invalid PROXY_LISTEN_ADDR: {}", addr_str))?;
        }

        if let Ok(port_str) = std::env::var("PORT") {
            let port: u16 = port_str
                .parse()
                .with_context(|| format!("Invalid PORT: {}", port_str))?;
            self.listen_addr.set_port(port);
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.log_level = log_level;
        }

        if let Ok(mode) = std::env::var("PROXY_MODE") {
            self.routing.mode = mode.parse()?;
        }

        if let Ok(mount) = std::env::var("PROXY_MOUNT") {
            self.routing.mount = mount;
        }

        if let Ok(target_url) = std::env::var("TARGET_URL") {
            self.upstream.url = Some(target_url);
        }

        if let Ok(username) = std::env::var("PROXY_USERNAME") {
            self.auth.username = Some(username);
        }

        if let Ok(password) = std::env::var("PROXY_PASSWORD") {
            self.auth.password = Some(password);
        }

        if let Ok(timeout) = std::env::var("PROXY_CONNECT_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                self.upstream.connect_timeout = timeout;
            }
        }

        if let Ok(timeout) = std::env::var("PROXY_REQUEST_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                self.upstream.request_timeout = timeout;
            }
        }

        Ok(())
    }

    /// The origin used as the static routing target and the dynamic
    /// resolution fallback
    pub fn effective_target(&self) -> &str {
        self.upstream.url.as_deref().unwrap_or(DEFAULT_STATIC_TARGET)
    }
}
