//! Main entry point for the relaygate forward proxy

use clap::Parser;
use relaygate::{init_logger_with_config, log_info, ProxyConfig, ProxyServer};

#[derive(Debug, Parser)]
#[command(name = "relaygate", version, about = "Forward HTTP/HTTPS proxy with CONNECT tunneling")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Listening address (host:port)
    #[arg(long)]
    listen_addr: Option<String>,

    /// Static upstream target origin
    #[arg(long)]
    target: Option<String>,

    /// Routing mode: static or dynamic
    #[arg(long)]
    mode: Option<String>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration from YAML file and environment, then apply CLI overrides
    let mut config = ProxyConfig::load_config(args.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    if let Some(listen_addr) = args.listen_addr {
        config.listen_addr = listen_addr.parse().unwrap_or_else(|e| {
            eprintln!("Invalid listen address '{}': {}", listen_addr, e);
            std::process::exit(1);
        });
    }
    if let Some(target) = args.target {
        config.upstream.url = Some(target);
    }
    if let Some(mode) = args.mode {
        config.routing.mode = mode.parse().unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(1);
        });
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }

    init_logger_with_config(&config.log_level);

    log_info!("Starting forward proxy server");
    log_info!("Proxy server starting on {}", config.listen_addr);
    log_info!("Test with: curl -x http://{} http://httpbin.org/get", config.listen_addr);

    ProxyServer::new(config).start().await
}
