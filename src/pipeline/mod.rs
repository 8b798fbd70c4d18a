//! Request dispatch pipeline.
//!
//! # Data Flow
//! ```text
//! SiteRequest
//!     → https (insecure → 301)
//!     → auth (missing/invalid credentials → 401)
//!     → proxy (longest mount → ForwardInstruction)
//!     → static_files (file, clean URL, directory index)
//!     → redirect (first matching rule)
//!     → route (first matching wildcard fallback)
//!     → error_page (terminal, 404)
//!     → header merge on every non-gate result
//! ```
//!
//! # Design Decisions
//! - The order is the constant [`PIPELINE`]; the first stage with a result wins
//! - Stages are pure functions of (request, table, environment)
//! - A stage error becomes the error page for its status, never a fault
//! - Gate responses (301 upgrade, 401) carry no configured headers

pub mod error_page;
pub mod proxy;
pub mod redirect;
pub mod route;
pub mod static_files;

use axum::http::StatusCode;
use std::fmt;
use std::sync::Arc;

use crate::config::env::Environment;
use crate::error::SiteError;
use crate::http::request::SiteRequest;
use crate::http::response::{Outcome, SiteResponse};
use crate::routing::router::RoutingTable;
use crate::security::{auth, headers, https};

/// One step of the dispatch pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Https,
    Auth,
    Proxy,
    Static,
    Redirect,
    Route,
    ErrorPage,
}

/// Stages in the order they are consulted.
pub const PIPELINE: [Stage; 7] = [
    Stage::Https,
    Stage::Auth,
    Stage::Proxy,
    Stage::Static,
    Stage::Redirect,
    Stage::Route,
    Stage::ErrorPage,
];

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Https => "https",
            Stage::Auth => "auth",
            Stage::Proxy => "proxy",
            Stage::Static => "static",
            Stage::Redirect => "redirect",
            Stage::Route => "route",
            Stage::ErrorPage => "error_page",
        }
    }

    /// Whether configured headers are merged into this stage's result.
    pub fn merges_headers(&self) -> bool {
        !matches!(self, Stage::Https | Stage::Auth)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a request and the stage that produced it.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub outcome: Outcome,
    pub stage: Stage,
}

/// Runs [`PIPELINE`] against one routing table snapshot.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<RoutingTable>,
    env: Arc<dyn Environment>,
}

impl Dispatcher {
    pub fn new(table: Arc<RoutingTable>, env: Arc<dyn Environment>) -> Self {
        Self { table, env }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Decide the response for `request`.
    pub fn dispatch(&self, request: &SiteRequest) -> Dispatched {
        for stage in PIPELINE {
            let result = match self.run(stage, request) {
                Ok(Some(outcome)) => outcome,
                Ok(None) => continue,
                Err(e) => {
                    let status = e.status();
                    tracing::warn!(stage = %stage, path = %request.path, error = %e, "Stage failed");
                    return Dispatched {
                        outcome: Outcome::Reply(self.render_error(request, status)),
                        stage,
                    };
                }
            };
            return Dispatched {
                outcome: self.finish(stage, result, request),
                stage,
            };
        }

        // Stage::ErrorPage always answers.
        Dispatched {
            outcome: Outcome::Reply(self.render_error(request, StatusCode::NOT_FOUND)),
            stage: Stage::ErrorPage,
        }
    }

    /// Answer a request whose body was over the size limit. The gates still
    /// run first; anything they let through gets 413.
    pub fn reject_oversized(&self, request: &SiteRequest) -> Dispatched {
        for stage in PIPELINE.into_iter().take_while(|s| !s.merges_headers()) {
            if let Ok(Some(outcome)) = self.run(stage, request) {
                return Dispatched { outcome, stage };
            }
        }
        Dispatched {
            outcome: Outcome::Reply(self.render_error(request, StatusCode::PAYLOAD_TOO_LARGE)),
            stage: Stage::ErrorPage,
        }
    }

    /// Error page for `status`, with configured headers merged.
    pub fn render_error(&self, request: &SiteRequest, status: StatusCode) -> SiteResponse {
        let mut resp = error_page::render(&self.table, status);
        headers::apply(&mut resp.headers, &headers::merged_headers(self.table.headers(), &request.path));
        resp.for_method(&request.method)
    }

    fn run(&self, stage: Stage, request: &SiteRequest) -> Result<Option<Outcome>, SiteError> {
        let table = self.table.as_ref();
        let env = self.env.as_ref();
        match stage {
            Stage::Https => Ok(https::check(request, table.https_only()).map(Outcome::Reply)),
            Stage::Auth => Ok(auth::check(request, table.auth(), env).map(Outcome::Reply)),
            Stage::Proxy => proxy::resolve(table, request, env),
            Stage::Static => static_files::resolve(table, request),
            Stage::Redirect => Ok(redirect::resolve(table, request, env)),
            Stage::Route => route::resolve(table, request),
            Stage::ErrorPage => Ok(Some(Outcome::Reply(error_page::render(table, StatusCode::NOT_FOUND)))),
        }
    }

    fn finish(&self, stage: Stage, outcome: Outcome, request: &SiteRequest) -> Outcome {
        if !stage.merges_headers() {
            return outcome;
        }
        let merged = headers::merged_headers(self.table.headers(), &request.path);
        match outcome {
            Outcome::Reply(mut resp) => {
                headers::apply(&mut resp.headers, &merged);
                Outcome::Reply(resp.for_method(&request.method))
            }
            Outcome::Forward(mut fwd) => {
                fwd.response_headers = merged;
                Outcome::Forward(fwd)
            }
        }
    }
}
