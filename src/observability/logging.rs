//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick pretty or JSON output from the server config
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - `"debug": true` in `static.json` raises the crate's level to `debug`,
//!   which turns on per-request logging
//! - JSON format for production, pretty format for development

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(level: &str) -> String {
    format!("static_router={level},tower_http={level}")
}

/// Level for the crate's own targets, given the site's `debug` flag.
pub fn effective_level(configured: &str, site_debug: bool) -> &str {
    if site_debug && !configured.eq_ignore_ascii_case("trace") {
        "debug"
    } else {
        configured
    }
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(config: &ObservabilityConfig, site_debug: bool) {
    let level = effective_level(&config.log_level, site_debug);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
