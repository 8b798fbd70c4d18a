//! Header manipulation.
//!
//! # Responsibilities
//! - Merge configured response headers for a path
//! - Strip hop-by-hop headers from forwarded requests and upstream responses
//! - Add X-Forwarded-Host and X-Forwarded-Proto
//!
//! # Design Decisions
//! - Exact-path rules beat wildcard rules for the same header name
//! - Among wildcard rules the later one replaces the earlier one, never appends
//! - Matching is against the request path as received; a rule for
//!   `/foo.html` does not apply to its clean alias `/foo`

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::http::request::SiteRequest;
use crate::routing::rules::{RulePayload, RuleSet};

/// Connection-scoped headers that never cross the proxy.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
    header::PROXY_AUTHENTICATE,
];

/// Compute the headers configured for `path`.
pub fn merged_headers(rules: &RuleSet, path: &str) -> HeaderMap {
    let mut wildcard = HeaderMap::new();
    let mut exact = HeaderMap::new();

    for rule in rules.all_matches(path) {
        let RulePayload::Headers(pairs) = &rule.payload else {
            continue;
        };
        let target = if rule.pattern.is_exact() {
            &mut exact
        } else {
            &mut wildcard
        };
        for (name, value) in pairs {
            target.insert(name.clone(), value.clone());
        }
    }

    for (name, value) in exact.iter() {
        wildcard.insert(name.clone(), value.clone());
    }
    wildcard
}

/// Set every merged header on `target`, replacing existing values.
pub fn apply(target: &mut HeaderMap, merged: &HeaderMap) {
    for (name, value) in merged.iter() {
        target.insert(name.clone(), value.clone());
    }
}

/// Headers to send upstream for `request`.
pub fn forwarded_headers(request: &SiteRequest) -> HeaderMap {
    let mut headers = request.headers.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    if !request.host.is_empty() {
        let host = match request.port {
            Some(port) => format!("{}:{}", request.host, port),
            None => request.host.clone(),
        };
        if let Ok(value) = HeaderValue::from_str(&host) {
            headers.insert("x-forwarded-host", value);
        }
    }
    headers.insert(
        "x-forwarded-proto",
        HeaderValue::from_static(request.scheme.as_str()),
    );
    headers
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Scheme;
    use crate::routing::pattern::PathPattern;
    use crate::routing::rules::MatchRule;

    fn rule(pattern: &str, pairs: &[(&'static str, &'static str)]) -> MatchRule {
        MatchRule::new(
            PathPattern::compile(pattern).unwrap(),
            RulePayload::Headers(
                pairs
                    .iter()
                    .map(|(n, v)| (HeaderName::from_static(n), HeaderValue::from_static(v)))
                    .collect(),
            ),
        )
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let rules = RuleSet::new(vec![
            rule("/foo.html", &[("x-bar", "1")]),
            rule("/**", &[("x-bar", "2")]),
        ]);
        let merged = merged_headers(&rules, "/foo.html");
        let values: Vec<_> = merged.get_all("x-bar").iter().collect();
        assert_eq!(values, vec!["1"]);
    }

    #[test]
    fn test_exact_beats_wildcard_regardless_of_order() {
        let rules = RuleSet::new(vec![
            rule("/**", &[("x-bar", "2")]),
            rule("/foo.html", &[("x-bar", "1")]),
        ]);
        assert_eq!(merged_headers(&rules, "/foo.html").get("x-bar").unwrap(), "1");
    }

    #[test]
    fn test_later_wildcard_replaces_earlier() {
        let rules = RuleSet::new(vec![
            rule("/**", &[("cache-control", "no-cache"), ("x-a", "a")]),
            rule("/assets/**", &[("cache-control", "max-age=60")]),
        ]);
        let merged = merged_headers(&rules, "/assets/app.js");
        let values: Vec<_> = merged.get_all("cache-control").iter().collect();
        assert_eq!(values, vec!["max-age=60"]);
        assert_eq!(merged.get("x-a").unwrap(), "a");
    }

    #[test]
    fn test_html_rule_not_applied_to_clean_alias() {
        let rules = RuleSet::new(vec![rule("/foo.html", &[("x-foo", "1")])]);
        assert!(merged_headers(&rules, "/foo").is_empty());
        assert!(!merged_headers(&rules, "/foo.html").is_empty());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let rules = RuleSet::new(vec![rule("/**", &[("x-a", "1")])]);
        let merged = merged_headers(&rules, "/x");
        let mut target = HeaderMap::new();
        apply(&mut target, &merged);
        apply(&mut target, &merged);
        assert_eq!(target.get_all("x-a").iter().count(), 1);
    }

    #[test]
    fn test_apply_overwrites_upstream_value() {
        let mut upstream = HeaderMap::new();
        upstream.insert("x-a", HeaderValue::from_static("origin"));
        let mut merged = HeaderMap::new();
        merged.insert("x-a", HeaderValue::from_static("configured"));
        apply(&mut upstream, &merged);
        assert_eq!(upstream.get("x-a").unwrap(), "configured");
    }

    #[test]
    fn test_forwarded_headers_strip_hop_by_hop() {
        let req = SiteRequest::get("/api/x")
            .with_host("example.com:8080")
            .with_scheme(Scheme::Https)
            .with_header("host", "example.com:8080")
            .with_header("connection", "keep-alive, x-secret")
            .with_header("x-secret", "s")
            .with_header("transfer-encoding", "chunked")
            .with_header("accept", "text/html");
        let headers = forwarded_headers(&req);
        assert!(headers.get("host").is_none());
        assert!(headers.get("connection").is_none());
        assert!(headers.get("x-secret").is_none());
        assert!(headers.get("transfer-encoding").is_none());
        assert_eq!(headers.get("accept").unwrap(), "text/html");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "example.com:8080");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "https");
    }
}
