//! Error page renderer.
//!
//! A configured page is served with the original status. Without one, or
//! when the page cannot be read, a small built-in HTML page is used.

use axum::http::StatusCode;

use crate::http::response::SiteResponse;
use crate::pipeline::static_files::serve_relative;
use crate::routing::router::RoutingTable;

/// Render the error response for `status`.
pub fn render(table: &RoutingTable, status: StatusCode) -> SiteResponse {
    if let Some(file) = table.error_page(status) {
        match serve_relative(table.root(), file) {
            Ok(mut page) => {
                page.status = status;
                return page;
            }
            Err(e) => {
                tracing::warn!(status = status.as_u16(), error = %e, "Error page unavailable");
            }
        }
    }
    builtin(status)
}

fn builtin(status: StatusCode) -> SiteResponse {
    let reason = status.canonical_reason().unwrap_or("Error");
    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{code} {reason}</title></head>\n\
         <body>\n<h1>{code} {reason}</h1>\n</body>\n</html>\n",
        code = status.as_u16(),
    );
    SiteResponse::content(status, html, "text/html; charset=utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{body, fixture};

    #[test]
    fn test_configured_page_keeps_status() {
        let site = fixture(r#"{"error_pages": {"404": "404.html"}}"#, &[("404.html", "not found")]);
        let resp = render(site.table(), StatusCode::NOT_FOUND);
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(body(&resp), "not found");
    }

    #[test]
    fn test_builtin_page() {
        let site = fixture("{}", &[]);
        let resp = render(site.table(), StatusCode::BAD_GATEWAY);
        assert_eq!(resp.status, StatusCode::BAD_GATEWAY);
        assert!(body(&resp).contains("502 Bad Gateway"));
    }

    #[test]
    fn test_missing_configured_page_falls_back() {
        let site = fixture(r#"{"error_page": "gone.html"}"#, &[]);
        let resp = render(site.table(), StatusCode::NOT_FOUND);
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert!(body(&resp).contains("404 Not Found"));
    }
}
