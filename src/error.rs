//! Error types shared across the server.
//!
//! Configuration errors are fatal at load time. Every other variant is a
//! per-request failure and is converted into an HTTP response by the
//! dispatcher; none of them escape as a process-level fault.

use axum::http::StatusCode;
use std::path::PathBuf;

/// Errors produced while loading configuration or serving a request.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Malformed or semantically invalid configuration.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The credential store could not answer a lookup.
    #[error("credential lookup failed for {path}: {reason}")]
    CredentialLookupFailed { path: PathBuf, reason: String },

    /// The proxy origin could not be reached or answered with a transport error.
    #[error("upstream {origin} unreachable: {reason}")]
    UpstreamUnreachable { origin: String, reason: String },

    /// Reading content from the site root failed.
    #[error("filesystem error on {path}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `${VAR}` placeholder had no value in the environment.
    #[error("environment variable {0} is not set")]
    InterpolationMissingVariable(String),
}

impl SiteError {
    /// HTTP status a per-request error is rendered with.
    pub fn status(&self) -> StatusCode {
        match self {
            SiteError::ConfigInvalid(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SiteError::CredentialLookupFailed { .. } => StatusCode::UNAUTHORIZED,
            SiteError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            SiteError::FileSystem { source, .. } => {
                if source.kind() == std::io::ErrorKind::NotFound {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            // Substitution is permissive, so this never fails a request on its own.
            SiteError::InterpolationMissingVariable(_) => StatusCode::OK,
        }
    }
}
