//! Compiled routing table.
//!
//! # Responsibilities
//! - Compile a validated `SiteConfig` into rule sets, once per load
//! - Resolve the content root and the credential sources
//! - Answer per-category lookups for the pipeline stages
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Reload builds a whole new table; nothing is patched in place
//! - O(n) scan per category (acceptable for typical rule counts)

use axum::http::{HeaderName, HeaderValue, StatusCode};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::loader::LoadedSite;
use crate::config::schema::SiteConfig;
use crate::error::SiteError;
use crate::routing::pattern::PathPattern;
use crate::routing::rules::{MatchRule, RulePayload, RuleSet};
use crate::security::auth::AuthPolicy;
use crate::security::htpasswd::HtpasswdFile;

/// Root used when `static.json` names none.
pub const DEFAULT_ROOT: &str = "public_html";

const DEFAULT_HTPASSWD: &str = ".htpasswd";

/// Immutable view of one site's routing configuration.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    root: PathBuf,
    clean_urls: bool,
    https_only: bool,
    auth: Option<AuthPolicy>,
    proxies: RuleSet,
    redirects: RuleSet,
    routes: RuleSet,
    headers: RuleSet,
    error_pages: BTreeMap<u16, String>,
}

impl RoutingTable {
    /// Compile a loaded site.
    pub fn compile(site: &LoadedSite) -> Result<Self, SiteError> {
        Self::from_config(&site.config, &site.base_dir)
    }

    /// Compile `config`, resolving relative paths against `base_dir`.
    pub fn from_config(config: &SiteConfig, base_dir: &Path) -> Result<Self, SiteError> {
        let root = resolve_root(base_dir, config.root.as_deref().unwrap_or(DEFAULT_ROOT));

        let table = Self {
            root,
            clean_urls: config.clean_urls,
            https_only: config.https_only,
            auth: compile_auth(config, base_dir),
            proxies: compile_proxies(config),
            redirects: compile_redirects(config)?,
            routes: compile_routes(config)?,
            headers: compile_headers(config)?,
            error_pages: compile_error_pages(config)?,
        };

        tracing::debug!(
            root = %table.root.display(),
            proxies = table.proxies.len(),
            redirects = table.redirects.len(),
            routes = table.routes.len(),
            header_rules = table.headers.len(),
            auth = table.auth.is_some(),
            "Routing table compiled"
        );
        Ok(table)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clean_urls(&self) -> bool {
        self.clean_urls
    }

    pub fn https_only(&self) -> bool {
        self.https_only
    }

    pub fn auth(&self) -> Option<&AuthPolicy> {
        self.auth.as_ref()
    }

    pub fn proxies(&self) -> &RuleSet {
        &self.proxies
    }

    pub fn redirects(&self) -> &RuleSet {
        &self.redirects
    }

    pub fn routes(&self) -> &RuleSet {
        &self.routes
    }

    pub fn headers(&self) -> &RuleSet {
        &self.headers
    }

    /// Page configured for `status`, relative to the root.
    pub fn error_page(&self, status: StatusCode) -> Option<&str> {
        self.error_pages.get(&status.as_u16()).map(String::as_str)
    }

    /// One line per compiled rule, for `--check`.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("root: {}", self.root.display()),
            format!("clean_urls: {}", self.clean_urls),
            format!("https_only: {}", self.https_only),
        ];
        if let Some(auth) = &self.auth {
            lines.push(format!("basic_auth: realm \"{}\"", auth.realm()));
        }
        for set in [&self.proxies, &self.redirects, &self.routes, &self.headers] {
            for rule in set.iter() {
                lines.push(format!(
                    "{} {} -> {}",
                    rule.payload.kind(),
                    rule.pattern.as_str(),
                    describe(&rule.payload)
                ));
            }
        }
        for (code, file) in &self.error_pages {
            lines.push(format!("error_page {code} -> {file}"));
        }
        lines
    }
}

fn describe(payload: &RulePayload) -> String {
    match payload {
        RulePayload::Proxy { origin } => origin.clone(),
        RulePayload::Redirect { target, status } => format!("{} {}", status.as_u16(), target),
        RulePayload::Route { file } => file.clone(),
        RulePayload::Headers(pairs) => pairs
            .iter()
            .map(|(n, v)| format!("{}: {}", n, v.to_str().unwrap_or("<binary>")))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn resolve_root(base_dir: &Path, root: &str) -> PathBuf {
    let joined = base_dir.join(root);
    match joined.canonicalize() {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(root = %joined.display(), error = %e, "Site root not accessible");
            joined
        }
    }
}

fn compile_auth(config: &SiteConfig, base_dir: &Path) -> Option<AuthPolicy> {
    let settings = config.basic_auth.as_ref()?.resolve()?;

    let file = match &settings.htpasswd {
        Some(path) => Some(HtpasswdFile::load(&base_dir.join(path))),
        None => {
            let default = base_dir.join(DEFAULT_HTPASSWD);
            default.is_file().then(|| HtpasswdFile::load(&default))
        }
    };
    let inline = settings.username.clone().zip(settings.password.clone());

    Some(AuthPolicy::new(settings.realm, settings.scope, file, inline))
}

fn compile_proxies(config: &SiteConfig) -> RuleSet {
    RuleSet::new(
        config
            .proxies
            .iter()
            .map(|(mount, proxy)| {
                MatchRule::new(
                    PathPattern::mount(mount),
                    RulePayload::Proxy {
                        origin: proxy.origin.clone(),
                    },
                )
            })
            .collect(),
    )
}

fn compile_pattern(category: &str, pattern: &str) -> Result<PathPattern, SiteError> {
    PathPattern::compile(pattern)
        .map_err(|e| SiteError::ConfigInvalid(format!("{category}.{pattern}: {e}")))
}

fn compile_redirects(config: &SiteConfig) -> Result<RuleSet, SiteError> {
    let mut rules = Vec::with_capacity(config.redirects.len());
    for (pattern, redirect) in config.redirects.iter() {
        let status = StatusCode::from_u16(redirect.status)
            .ok()
            .filter(StatusCode::is_redirection)
            .ok_or_else(|| {
                SiteError::ConfigInvalid(format!(
                    "redirects.{pattern}: {} is not a redirect status",
                    redirect.status
                ))
            })?;
        rules.push(MatchRule::new(
            compile_pattern("redirects", pattern)?,
            RulePayload::Redirect {
                target: redirect.url.clone(),
                status,
            },
        ));
    }
    Ok(RuleSet::new(rules))
}

fn compile_routes(config: &SiteConfig) -> Result<RuleSet, SiteError> {
    let mut rules = Vec::with_capacity(config.routes.len());
    for (pattern, file) in config.routes.iter() {
        rules.push(MatchRule::new(
            compile_pattern("routes", pattern)?,
            RulePayload::Route { file: file.clone() },
        ));
    }
    Ok(RuleSet::new(rules))
}

fn compile_headers(config: &SiteConfig) -> Result<RuleSet, SiteError> {
    let mut rules = Vec::with_capacity(config.headers.len());
    for (pattern, values) in config.headers.iter() {
        let mut pairs = Vec::with_capacity(values.len());
        for (name, value) in values.iter() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                SiteError::ConfigInvalid(format!("headers.{pattern}.{name}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                SiteError::ConfigInvalid(format!("headers.{pattern}.{name}: {e}"))
            })?;
            pairs.push((name, value));
        }
        rules.push(MatchRule::new(
            compile_pattern("headers", pattern)?,
            RulePayload::Headers(pairs),
        ));
    }
    Ok(RuleSet::new(rules))
}

fn compile_error_pages(config: &SiteConfig) -> Result<BTreeMap<u16, String>, SiteError> {
    let mut pages = BTreeMap::new();
    if let Some(file) = &config.error_page {
        pages.insert(StatusCode::NOT_FOUND.as_u16(), file.clone());
    }
    for (code, file) in config.error_pages.iter() {
        let code: u16 = code
            .parse()
            .ok()
            .filter(|c| (400..=599).contains(c))
            .ok_or_else(|| SiteError::ConfigInvalid(format!("error_pages.{code}: not an error status")))?;
        pages.insert(code, file.clone());
    }
    Ok(pages)
}
