//! static-router
//!
//! Serves a static site described by `static.json`.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ pipeline::Dispatcher
//!                                        │  https → auth → proxy → static
//!                                        │  → redirect → route → error_page
//!                                        ▼
//!                              Outcome::Reply ─────────────▶ client
//!                              Outcome::Forward ──▶ origin ─▶ client
//!
//!     config::watcher ── recompiled RoutingTable ──▶ atomic swap
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use static_router::config::env::{Environment, ProcessEnv};
use static_router::config::loader::{load_server_config, load_site};
use static_router::config::schema::ServerConfig;
use static_router::config::watcher::SiteWatcher;
use static_router::lifecycle::{signals, Shutdown};
use static_router::observability::{logging, metrics};
use static_router::{HttpServer, RoutingTable};

#[derive(Parser)]
#[command(name = "static-router")]
#[command(about = "Configuration-driven static site server", long_about = None)]
struct Cli {
    /// Server settings (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site configuration; overrides `site.config_path`.
    #[arg(short, long)]
    site: Option<PathBuf>,

    /// Bind address; overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Load and validate the configuration, print the compiled table, exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_server_config(path)?,
        None => ServerConfig::default(),
    };
    let env = ProcessEnv;
    apply_overrides(&mut config, &cli, &env);

    let site_path = PathBuf::from(&config.site.config_path);
    let site = load_site(&site_path)?;

    logging::init(&config.observability, site.config.debug);
    tracing::info!("static-router v{} starting", env!("CARGO_PKG_VERSION"));

    let table = RoutingTable::compile(&site)?;

    if cli.check {
        for line in table.summary() {
            println!("{line}");
        }
        return Ok(());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        site = %site_path.display(),
        root = %table.root().display(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (watcher, updates) = SiteWatcher::new(&site_path);
    let _watch_handle = if config.site.watch {
        match watcher.run() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Site config watcher unavailable, hot reload disabled");
                None
            }
        }
    } else {
        drop(watcher);
        None
    };

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&signal_shutdown).await;
    });

    let server = HttpServer::new(config, table, Arc::new(env));
    server.run(listener, updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// `PORT` from the environment first, then command-line flags.
fn apply_overrides(config: &mut ServerConfig, cli: &Cli, env: &dyn Environment) {
    if let Some(port) = env.get("PORT") {
        config.listener.bind_address = with_port(&config.listener.bind_address, &port);
    }
    if let Some(site) = &cli.site {
        config.site.config_path = site.display().to_string();
    }
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
}

/// Replace the port of `bind_address` with `port`.
fn with_port(bind_address: &str, port: &str) -> String {
    let host = match bind_address.rsplit_once(':') {
        Some((host, _)) => host,
        None => bind_address,
    };
    format!("{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_router::config::env::MapEnv;

    #[test]
    fn test_with_port() {
        assert_eq!(with_port("0.0.0.0:8080", "5000"), "0.0.0.0:5000");
        assert_eq!(with_port("[::]:8080", "5000"), "[::]:5000");
        assert_eq!(with_port("localhost", "80"), "localhost:80");
    }

    #[test]
    fn test_bind_flag_beats_port_env() {
        let env = MapEnv::new().with("PORT", "5000");

        let mut config = ServerConfig::default();
        let cli = Cli::parse_from(["static-router"]);
        apply_overrides(&mut config, &cli, &env);
        assert_eq!(config.listener.bind_address, "0.0.0.0:5000");

        let mut config = ServerConfig::default();
        let cli = Cli::parse_from(["static-router", "--bind", "127.0.0.1:9000"]);
        apply_overrides(&mut config, &cli, &env);
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["static-router", "--site", "s.json", "--bind", "127.0.0.1:1", "--check"]);
        assert_eq!(cli.site.unwrap(), PathBuf::from("s.json"));
        assert_eq!(cli.bind.as_deref(), Some("127.0.0.1:1"));
        assert!(cli.check);
        assert!(cli.config.is_none());
    }
}
