//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (wire request → SiteRequest)
//!     → pipeline::Dispatcher (Outcome)
//!     → response.rs (SiteResponse → wire) or server.rs (forward upstream)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::SiteRequest;
pub use response::{ForwardInstruction, Outcome, SiteResponse};
pub use server::HttpServer;
