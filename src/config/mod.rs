//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! server.toml (TOML)                static.json (JSON)
//!     → loader.rs                       → loader.rs (parse & deserialize)
//!     → ServerConfig                    → validation.rs (semantic checks)
//!                                       → routing::RoutingTable (compiled, immutable)
//!                                       → shared via Arc<ArcSwap<_>> with the server
//!
//! On change of static.json:
//!     watcher.rs detects change
//!     → loader.rs loads, validation.rs validates, table is compiled
//!     → atomic swap of the table snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - `${VAR}` placeholders stay in the table and are resolved per request
//!   through env.rs

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{ServerConfig, SiteConfig};
