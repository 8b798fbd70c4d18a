//! Configuration schema definitions.
//!
//! Two documents configure the server:
//! - `server.toml` ([`ServerConfig`]): listener, timeouts, limits, logging.
//! - `static.json` ([`SiteConfig`]): the routing rules of one site root.
//!
//! All types derive Serde traits. Every field is defaulted so that an empty
//! document is valid and means "feature disabled".

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Where the site configuration lives and whether it is watched.
    pub site: SiteSettings,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for a request/response in seconds.
    pub request_secs: u64,

    /// Time allowed for an upstream origin to answer a forwarded request.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 25,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest request body buffered for forwarding.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Address the exporter listens on.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Location of the site configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Path to `static.json`.
    pub config_path: String,

    /// Reload the site configuration when the file changes.
    pub watch: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            config_path: "static.json".to_string(),
            watch: true,
        }
    }
}

/// Routing configuration of one site, as written in `static.json`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Content root, relative to the directory holding `static.json`.
    pub root: Option<String>,

    /// Serve `/foo` from `foo.html` and canonicalize `/foo.html` to `/foo`.
    pub clean_urls: bool,

    /// Upgrade every plain-HTTP request to HTTPS.
    pub https_only: bool,

    /// Log every request (raises the log level to `debug`).
    pub debug: bool,

    /// Basic authentication for the whole site (or a scope of it).
    pub basic_auth: Option<BasicAuthSetting>,

    /// Explicit redirects, in configuration order.
    pub redirects: OrderedMap<RedirectConfig>,

    /// Wildcard fallback routes, in configuration order.
    pub routes: OrderedMap<String>,

    /// Reverse proxy mounts keyed by slash-terminated prefix.
    pub proxies: OrderedMap<ProxyMountConfig>,

    /// Response headers injected per path pattern.
    pub headers: OrderedMap<OrderedMap<String>>,

    /// Page rendered for 404 responses.
    pub error_page: Option<String>,

    /// Pages rendered per status code.
    pub error_pages: OrderedMap<String>,
}

/// `basic_auth` accepts either `true` or a detailed object.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BasicAuthSetting {
    Enabled(bool),
    Detailed(BasicAuthConfig),
}

impl BasicAuthSetting {
    /// Detailed settings when auth is switched on.
    pub fn resolve(&self) -> Option<BasicAuthConfig> {
        match self {
            BasicAuthSetting::Enabled(true) => Some(BasicAuthConfig::default()),
            BasicAuthSetting::Enabled(false) => None,
            BasicAuthSetting::Detailed(cfg) => Some(cfg.clone()),
        }
    }
}

/// Basic authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BasicAuthConfig {
    /// Realm advertised in `WWW-Authenticate`.
    pub realm: Option<String>,

    /// Path prefix the credentials are required under (default `/`).
    pub scope: Option<String>,

    /// htpasswd file, relative to the directory holding `static.json`.
    pub htpasswd: Option<String>,

    /// Inline user name.
    pub username: Option<String>,

    /// Inline password hash (htpasswd format).
    pub password: Option<String>,
}

/// One redirect rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedirectConfig {
    /// Target URL or path; may contain `${VAR}` placeholders.
    #[serde(alias = "target")]
    pub url: String,

    /// Redirect status code.
    #[serde(default = "default_redirect_status")]
    pub status: u16,
}

fn default_redirect_status() -> u16 {
    302
}

/// One reverse proxy mount.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyMountConfig {
    /// Upstream origin; may contain `${VAR}` placeholders.
    pub origin: String,
}

/// A string-keyed map that keeps the order entries were written in.
///
/// Rule precedence depends on configuration order. A repeated key keeps the
/// position of its first occurrence and the value of its last.
pub type OrderedMap<V> = IndexMap<String, V>;
