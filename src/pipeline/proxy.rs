//! Proxy router.
//!
//! The longest matching mount wins. The suffix after the mount is joined to
//! the interpolated origin with exactly one `/`, so an origin written with or
//! without a trailing slash forwards to the same upstream path.

use url::Url;

use crate::config::env::{interpolate, Environment};
use crate::error::SiteError;
use crate::http::request::SiteRequest;
use crate::http::response::{ForwardInstruction, Outcome};
use crate::routing::router::RoutingTable;
use crate::routing::rules::RulePayload;
use crate::security::headers::forwarded_headers;

/// Stage: Proxy.
pub fn resolve(
    table: &RoutingTable,
    request: &SiteRequest,
    env: &dyn Environment,
) -> Result<Option<Outcome>, SiteError> {
    let Some(rule) = table.proxies().longest_match(&request.path) else {
        return Ok(None);
    };
    let RulePayload::Proxy { origin } = &rule.payload else {
        return Ok(None);
    };

    let mount = rule.pattern.as_str();
    let suffix = &request.path[mount.len()..];
    let origin = interpolate(origin, env);
    let url = upstream_url(&origin, suffix, request.query.as_deref())?;

    tracing::debug!(mount = %mount, upstream = %url, "Proxy mount matched");
    Ok(Some(Outcome::Forward(ForwardInstruction {
        url,
        method: request.method.clone(),
        headers: forwarded_headers(request),
        body: request.body.clone(),
        mount: mount.to_string(),
        response_headers: Default::default(),
    })))
}

/// Join `origin`, `suffix` and `query` into the upstream URL.
pub fn upstream_url(origin: &str, suffix: &str, query: Option<&str>) -> Result<Url, SiteError> {
    let mut joined = format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        suffix.trim_start_matches('/')
    );
    if let Some(q) = query {
        joined.push('?');
        joined.push_str(q);
    }
    Url::parse(&joined).map_err(|e| SiteError::UpstreamUnreachable {
        origin: origin.to_string(),
        reason: format!("invalid upstream URL {joined}: {e}"),
    })
}
