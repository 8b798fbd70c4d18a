//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check patterns, mounts, status codes and header syntax
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::{HeaderName, HeaderValue};
use std::fmt;

use crate::config::schema::SiteConfig;
use crate::routing::pattern::PathPattern;

/// One semantic problem in a site configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted location of the offending entry, e.g. `proxies./api`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed site configuration.
pub fn validate_site(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (pattern, rule) in config.redirects.iter() {
        let field = format!("redirects.{pattern}");
        check_pattern(&field, pattern, &mut errors);
        if !(300..=399).contains(&rule.status) {
            errors.push(ValidationError::new(
                &field,
                format!("status {} is not a redirect code", rule.status),
            ));
        }
        if rule.url.is_empty() {
            errors.push(ValidationError::new(&field, "redirect target is empty"));
        }
    }

    for (pattern, file) in config.routes.iter() {
        let field = format!("routes.{pattern}");
        check_pattern(&field, pattern, &mut errors);
        if file.is_empty() {
            errors.push(ValidationError::new(&field, "route target is empty"));
        }
    }

    for (mount, proxy) in config.proxies.iter() {
        let field = format!("proxies.{mount}");
        if !mount.starts_with('/') || !mount.ends_with('/') {
            errors.push(ValidationError::new(
                &field,
                "mount must start and end with '/'",
            ));
        }
        if proxy.origin.is_empty() {
            errors.push(ValidationError::new(&field, "origin is empty"));
        }
    }

    for (pattern, headers) in config.headers.iter() {
        let field = format!("headers.{pattern}");
        check_pattern(&field, pattern, &mut errors);
        for (name, value) in headers.iter() {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::new(
                    &field,
                    format!("invalid header name {name:?}"),
                ));
            }
            if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::new(
                    &field,
                    format!("invalid value for header {name}"),
                ));
            }
        }
    }

    for (code, file) in config.error_pages.iter() {
        let field = format!("error_pages.{code}");
        match code.parse::<u16>() {
            Ok(status) if (400..=599).contains(&status) => {}
            _ => errors.push(ValidationError::new(
                &field,
                "key must be a 4xx or 5xx status code",
            )),
        }
        if file.is_empty() {
            errors.push(ValidationError::new(&field, "error page path is empty"));
        }
    }

    if let Some(auth) = config.basic_auth.as_ref().and_then(|a| a.resolve()) {
        if let Some(realm) = &auth.realm {
            if realm.chars().any(|c| c == '"' || c == '\\' || c.is_control()) {
                errors.push(ValidationError::new(
                    "basic_auth.realm",
                    "realm must not contain quotes, backslashes or control characters",
                ));
            }
        }
        if let Some(scope) = &auth.scope {
            if !scope.starts_with('/') {
                errors.push(ValidationError::new(
                    "basic_auth.scope",
                    "scope must start with '/'",
                ));
            }
        }
        if auth.username.is_some() != auth.password.is_some() {
            errors.push(ValidationError::new(
                "basic_auth",
                "username and password must be set together",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_pattern(field: &str, pattern: &str, errors: &mut Vec<ValidationError>) {
    if !pattern.starts_with('/') {
        errors.push(ValidationError::new(field, "pattern must start with '/'"));
        return;
    }
    if let Err(e) = PathPattern::compile(pattern) {
        errors.push(ValidationError::new(field, format!("bad pattern: {e}")));
    }
}
