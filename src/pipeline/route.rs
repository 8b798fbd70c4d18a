//! Route matcher: wildcard fallback to a content file.

use crate::error::SiteError;
use crate::http::request::SiteRequest;
use crate::http::response::Outcome;
use crate::pipeline::static_files::serve_relative;
use crate::routing::router::RoutingTable;
use crate::routing::rules::RulePayload;

/// Stage: Route. First matching rule in configuration order wins.
///
/// A route whose file is missing is an error (404), not a pass-through.
pub fn resolve(table: &RoutingTable, request: &SiteRequest) -> Result<Option<Outcome>, SiteError> {
    let Some(rule) = table.routes().first_match(&request.path) else {
        return Ok(None);
    };
    let RulePayload::Route { file } = &rule.payload else {
        return Ok(None);
    };
    tracing::debug!(pattern = %rule.pattern.as_str(), file = %file, "Route matched");
    serve_relative(table.root(), file).map(|r| Some(Outcome::Reply(r)))
}
