//! Configuration-driven static site server.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod security;

pub use config::schema::{ServerConfig, SiteConfig};
pub use error::SiteError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Dispatcher, Stage, PIPELINE};
pub use routing::RoutingTable;
