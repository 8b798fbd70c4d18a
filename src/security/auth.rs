//! Basic authentication gate.
//!
//! Credentials come from the `Authorization: Basic` header or from the
//! userinfo part of the request authority. They are checked against, in
//! order: the htpasswd file, the inline pair from `static.json`, and the
//! `BASIC_AUTH_USERNAME` / `BASIC_AUTH_PASSWORD` environment pair. The file
//! is authoritative for any user it lists.
//!
//! The environment pair alone switches the gate on, even without a
//! `basic_auth` key in `static.json`.

use axum::http::{header, HeaderValue, StatusCode};
use base64::Engine;

use crate::config::env::Environment;
use crate::http::request::{Credentials, SiteRequest};
use crate::http::response::SiteResponse;
use crate::security::htpasswd::{verify_password, CredentialStore, HtpasswdFile};

pub const ENV_USERNAME: &str = "BASIC_AUTH_USERNAME";
pub const ENV_PASSWORD: &str = "BASIC_AUTH_PASSWORD";

const DEFAULT_REALM: &str = "Restricted";

/// Result of checking a request against the auth policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    /// No policy applies to this path.
    NotRequired,
    /// Credentials were presented and accepted.
    Allowed,
    /// Missing or invalid credentials (401).
    AuthRequired,
}

/// Compiled basic auth configuration of a site.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    realm: String,
    scope: String,
    file: Option<HtpasswdFile>,
    inline: Option<(String, String)>,
}

impl AuthPolicy {
    pub fn new(
        realm: Option<String>,
        scope: Option<String>,
        file: Option<HtpasswdFile>,
        inline: Option<(String, String)>,
    ) -> Self {
        Self {
            realm: realm.unwrap_or_else(|| DEFAULT_REALM.to_string()),
            scope: scope.unwrap_or_else(|| "/".to_string()),
            file,
            inline,
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }
}

/// Gate: Auth. `None` lets the request through.
pub fn check(
    request: &SiteRequest,
    policy: Option<&AuthPolicy>,
    env: &dyn Environment,
) -> Option<SiteResponse> {
    let env_pair = env_credentials(env);
    let realm = policy.map_or(DEFAULT_REALM, AuthPolicy::realm);

    match authorize(request, policy, env_pair.as_ref()) {
        AuthResult::NotRequired | AuthResult::Allowed => None,
        AuthResult::AuthRequired => Some(unauthorized(realm)),
    }
}

/// Decide whether the request may pass.
pub fn authorize(
    request: &SiteRequest,
    policy: Option<&AuthPolicy>,
    env_pair: Option<&(String, String)>,
) -> AuthResult {
    let in_scope = match policy {
        Some(p) => in_scope(&request.path, &p.scope),
        None => env_pair.is_some(),
    };
    if !in_scope {
        return AuthResult::NotRequired;
    }

    let Some(credentials) = presented_credentials(request) else {
        return AuthResult::AuthRequired;
    };

    if let Some(store) = policy.and_then(|p| p.file.as_ref()) {
        match store.lookup(&credentials.username) {
            Ok(Some(hash)) => {
                return if verify_password(&credentials.password, &hash) {
                    AuthResult::Allowed
                } else {
                    AuthResult::AuthRequired
                };
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Credential lookup failed, denying");
                return AuthResult::AuthRequired;
            }
        }
    }

    let inline = policy.and_then(|p| p.inline.as_ref());
    for (user, hash) in inline.into_iter().chain(env_pair) {
        if *user == credentials.username && verify_password(&credentials.password, hash) {
            return AuthResult::Allowed;
        }
    }

    AuthResult::AuthRequired
}

/// `scope` covers `path` on a segment boundary: `/admin` covers `/admin` and
/// `/admin/x`, not `/administrator`.
fn in_scope(path: &str, scope: &str) -> bool {
    match path.strip_prefix(scope) {
        Some(rest) => scope.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn env_credentials(env: &dyn Environment) -> Option<(String, String)> {
    let user = env.get(ENV_USERNAME).filter(|u| !u.is_empty())?;
    let pass = env.get(ENV_PASSWORD)?;
    Some((user, pass))
}

/// Credentials from userinfo, else from the Authorization header.
pub fn presented_credentials(request: &SiteRequest) -> Option<Credentials> {
    if let Some(c) = &request.credentials {
        return Some(c.clone());
    }
    let value = request.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    parse_basic(value)
}

/// Decode a `Basic <base64(user:pass)>` header value.
pub fn parse_basic(value: &str) -> Option<Credentials> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

fn unauthorized(realm: &str) -> SiteResponse {
    let mut resp = SiteResponse::empty(StatusCode::UNAUTHORIZED);
    let challenge = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("Basic realm=\"Restricted\""));
    resp.headers.insert(header::WWW_AUTHENTICATE, challenge);
    resp
}
