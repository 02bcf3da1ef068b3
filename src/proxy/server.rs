//! Proxy server implementation

use crate::config::settings::{ProxyConfig, ProxyMode};
use crate::error::{Error, Result};
use crate::models::{ProxyLog, RequestData, ResponseData};
use crate::proxy::auth::AuthGate;
use crate::proxy::client::HttpClient;
use crate::proxy::forwarder::{self, rewrite_mount_path};
use crate::proxy::resolver::{self, UpstreamTarget};
use crate::proxy::router::{self, Route};
use crate::proxy::tunnel;
use crate::utils::http::build_error_response;
use crate::{log_debug, log_error, log_info, log_proxy_transaction, log_warning};
use anyhow::Context;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{header, Body, Request, Response, Server, StatusCode, Uri};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Immutable per-process state shared by every connection
///
/// Built once at startup from the configuration and passed explicitly; no
/// component reads ambient globals.
pub struct ProxyState {
    mode: ProxyMode,
    mount: String,
    fallback: UpstreamTarget,
    auth: AuthGate,
    client: HttpClient,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl ProxyState {
    /// Validate the configuration and build the shared state
    ///
    /// A malformed configured target is a fatal startup error.
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let fallback = UpstreamTarget::parse(config.effective_target())?;

        Ok(Self {
            mode: config.routing.mode,
            mount: config.routing.mount.clone(),
            fallback,
            auth: AuthGate::from_config(&config.auth),
            client: HttpClient::from_config(&config.http_client),
            connect_timeout: Duration::from_secs(config.upstream.connect_timeout),
            request_timeout: Duration::from_secs(config.upstream.request_timeout),
        })
    }

    /// Resolve the upstream target for one proxyable request
    ///
    /// In static mode the Host header names this proxy, not an upstream, so
    /// it is excluded and the configured target is authoritative.
    fn resolve_target(&self, uri: &Uri, host_header: Option<&str>) -> Result<UpstreamTarget> {
        match self.mode {
            ProxyMode::Static => resolver::resolve(uri, None, Some(&self.fallback)),
            ProxyMode::Dynamic => resolver::resolve(uri, host_header, Some(&self.fallback)),
        }
    }
}

pub struct ProxyServer {
    config: ProxyConfig,
}

impl ProxyServer {
    /// Create a new proxy server with configuration
    pub fn new(config: ProxyConfig) -> Self {
        Self { config }
    }

    /// Start the proxy server and run until it fails or is stopped
    pub async fn start(self) -> anyhow::Result<()> {
        let mode = self.config.routing.mode;
        let mount = self.config.routing.mount.clone();
        let target = self.config.effective_target().to_string();
        let auth_enabled =
            self.config.auth.username.is_some() && self.config.auth.password.is_some();

        let (addr, server) = self.bind()?;

        log_info!("🚀 Proxy server listening on {}", addr);
        match mode {
            ProxyMode::Static => {
                log_info!("Static routing: {} -> {}", mount, target);
            }
            ProxyMode::Dynamic => {
                log_info!("Dynamic routing enabled (fallback target: {})", target);
            }
        }
        if auth_enabled {
            log_info!("Basic authentication enabled");
        } else {
            log_info!("Basic authentication disabled (set PROXY_USERNAME and PROXY_PASSWORD to enable)");
        }

        server.await.context("Server error")
    }

    /// Bind the listener and build the serving future
    fn bind(self) -> anyhow::Result<(SocketAddr, impl Future<Output = hyper::Result<()>>)> {
        let state = Arc::new(
            ProxyState::from_config(&self.config)
                .map_err(|e| anyhow::anyhow!("Invalid proxy configuration: {}", e))?,
        );

        let make_svc = make_service_fn(move |conn: &AddrStream| {
            let remote_addr = conn.remote_addr();
            let state = Arc::clone(&state);
            log_debug!("New connection from: {}", remote_addr);

            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    handle_request(req, remote_addr, Arc::clone(&state))
                }))
            }
        });

        let server = Server::try_bind(&self.config.listen_addr)
            .with_context(|| format!("Failed to bind {}", self.config.listen_addr))?
            .http1_preserve_header_case(true)
            .http1_title_case_headers(true)
            .serve(make_svc);

        let addr = server.local_addr();
        Ok((addr, server))
    }
}

/// Handle incoming HTTP request
pub async fn handle_request(
    req: Request<Body>,
    remote_addr: SocketAddr,
    state: Arc<ProxyState>,
) -> std::result::Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let uri = req.uri().clone();

    info!("📥 {} {} from {}", method, uri, remote_addr.ip());

    if let Err(e) = state.auth.check(req.headers()) {
        log_warning!("{} {} rejected: {}", method, uri, e);
        return Ok(AuthGate::challenge_response());
    }

    let response = match router::classify(&method, uri.path(), state.mode, &state.mount) {
        Route::Info => router::info_response(state.mode),
        Route::Health => router::health_response(),
        Route::MethodNotAllowed => router::method_not_allowed_response(),
        Route::NotFound => router::not_found_response(),
        Route::Tunnel => tunnel::establish(req, state.connect_timeout).await,
        Route::Forward => handle_forward(req, remote_addr, &state).await,
    };

    Ok(response)
}

/// Handle a proxyable (non-CONNECT) request
async fn handle_forward(
    req: Request<Body>,
    remote_addr: SocketAddr,
    state: &ProxyState,
) -> Response<Body> {
    let start_time = Instant::now();
    let mut request_data = RequestData::new(req.method(), req.uri(), remote_addr, req.headers());

    let host_header = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let target = match state.resolve_target(req.uri(), host_header.as_deref()) {
        Ok(target) => target,
        Err(e) => {
            log_error!("{} {} rejected: {}", request_data.method, request_data.url, e);
            return build_error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid proxy target: {}", e),
            );
        }
    };

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let path_and_query = match state.mode {
        ProxyMode::Static => rewrite_mount_path(&path_and_query, &state.mount),
        ProxyMode::Dynamic => path_and_query,
    };

    match forwarder::forward(
        req,
        &target,
        &path_and_query,
        &state.client,
        state.request_timeout,
    )
    .await
    {
        Ok(response) => {
            let elapsed = start_time.elapsed().as_millis() as u64;
            request_data.duration_ms = Some(elapsed);

            let response_data = ResponseData::new(
                response.status().as_u16(),
                response.status().to_string(),
                response
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string()),
                elapsed,
            );
            let log_entry = ProxyLog {
                request: request_data,
                response: Some(response_data),
                error: None,
            };
            log_proxy_transaction!(&log_entry);

            response
        }
        Err(e) => {
            let elapsed = start_time.elapsed().as_millis() as u64;
            request_data.duration_ms = Some(elapsed);
            log_error!(
                "❌ {} {} -> {} ({}ms)",
                request_data.method,
                request_data.url,
                e,
                elapsed
            );

            let log_entry = ProxyLog {
                request: request_data,
                response: None,
                error: Some(e.to_string()),
            };
            log_proxy_transaction!(&log_entry);

            let status = match e {
                Error::InvalidTarget(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            build_error_response(status, &format!("Proxy error: {}", e))
        }
    }
}
