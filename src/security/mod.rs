//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → https.rs (upgrade insecure requests)
//!     → auth.rs (Basic credentials, htpasswd.rs store)
//!     → Pass to proxy / static resolution
//!
//! Outgoing:
//!     → headers.rs (configured headers, hop-by-hop stripping, X-Forwarded-*)
//! ```
//!
//! # Design Decisions
//! - Fail closed: an unreadable credential store denies
//! - No trust in client input: request data never becomes header syntax

pub mod auth;
pub mod headers;
pub mod htpasswd;
pub mod https;
