//! Redirect matcher.

use crate::config::env::{interpolate, Environment};
use crate::http::request::SiteRequest;
use crate::http::response::{absolute_location, Outcome, SiteResponse};
use crate::routing::router::RoutingTable;
use crate::routing::rules::RulePayload;

/// Stage: Redirect. First matching rule in configuration order wins.
pub fn resolve(table: &RoutingTable, request: &SiteRequest, env: &dyn Environment) -> Option<Outcome> {
    let rule = table.redirects().first_match(&request.path)?;
    let RulePayload::Redirect { target, status } = &rule.payload else {
        return None;
    };

    let target = interpolate(target, env);
    let location = absolute_location(request, &target);
    tracing::debug!(
        pattern = %rule.pattern.as_str(),
        location = %location,
        status = status.as_u16(),
        "Redirect matched"
    );
    Some(Outcome::Reply(SiteResponse::redirect(*status, &location)))
}
