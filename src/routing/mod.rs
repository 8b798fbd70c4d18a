//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Table compilation (at load and on reload):
//!     SiteConfig
//!     → pattern.rs (compile exact / wildcard / mount patterns)
//!     → rules.rs (MatchRule per entry, RuleSet per category)
//!     → router.rs (freeze as immutable RoutingTable)
//!
//! Per request:
//!     pipeline stage → RoutingTable → RuleSet lookup → matched rule or None
//! ```
//!
//! # Design Decisions
//! - Rules compiled at load, immutable at runtime
//! - Wildcards compiled to anchored regexes once, never per request
//! - Deterministic: same input always matches same rule
//! - Configuration order decides among equal candidates

pub mod pattern;
pub mod router;
pub mod rules;

pub use router::RoutingTable;
