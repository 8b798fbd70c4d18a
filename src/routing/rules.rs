//! Compiled routing rules.
//!
//! Every rule category of `static.json` becomes a [`MatchRule`]: a compiled
//! [`PathPattern`] plus a [`RulePayload`] variant. The categories stay in one
//! closed sum type so the table can be inspected and listed uniformly.

use axum::http::{HeaderName, HeaderValue, StatusCode};

use crate::routing::pattern::PathPattern;

/// What a rule does once its pattern matches.
#[derive(Debug, Clone)]
pub enum RulePayload {
    /// Forward to an upstream origin (template, interpolated per request).
    Proxy { origin: String },
    /// Answer with a redirect to an interpolated target.
    Redirect { target: String, status: StatusCode },
    /// Serve a content file relative to the site root.
    Route { file: String },
    /// Add response headers.
    Headers(Vec<(HeaderName, HeaderValue)>),
}

impl RulePayload {
    /// Short name of the rule category.
    pub fn kind(&self) -> &'static str {
        match self {
            RulePayload::Proxy { .. } => "proxy",
            RulePayload::Redirect { .. } => "redirect",
            RulePayload::Route { .. } => "route",
            RulePayload::Headers(_) => "headers",
        }
    }
}

/// A pattern and the payload it guards.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub pattern: PathPattern,
    pub payload: RulePayload,
}

impl MatchRule {
    pub fn new(pattern: PathPattern, payload: RulePayload) -> Self {
        Self { pattern, payload }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

/// An ordered list of rules of one category.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<MatchRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<MatchRule>) -> Self {
        Self { rules }
    }

    /// First rule in configuration order whose pattern matches.
    pub fn first_match(&self, path: &str) -> Option<&MatchRule> {
        self.rules.iter().find(|r| r.matches(path))
    }

    /// All matching rules, in configuration order.
    pub fn all_matches<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a MatchRule> + 'a {
        self.rules.iter().filter(move |r| r.matches(path))
    }

    /// Rule with the longest matching pattern. Used for mount prefixes.
    pub fn longest_match(&self, path: &str) -> Option<&MatchRule> {
        self.rules
            .iter()
            .filter(|r| r.matches(path))
            .max_by_key(|r| r.pattern.as_str().len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
