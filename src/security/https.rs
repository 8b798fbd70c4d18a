//! HTTPS enforcement gate.
//!
//! Insecure requests are upgraded with a 301 before any other rule is
//! consulted. The explicit port is dropped from the target.

use axum::http::StatusCode;

use crate::http::request::{Scheme, SiteRequest};
use crate::http::response::SiteResponse;

/// Gate: HTTPS. `None` lets the request through.
pub fn check(request: &SiteRequest, https_only: bool) -> Option<SiteResponse> {
    if !https_only || request.scheme == Scheme::Https {
        return None;
    }
    let target = format!("https://{}{}", request.host, request.path_and_query());
    tracing::debug!(path = %request.path, "Upgrading insecure request");
    Some(SiteResponse::redirect(StatusCode::MOVED_PERMANENTLY, &target))
}
