//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the site handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Enforce the body size limit after the HTTPS and auth gates
//! - Convert wire requests to `SiteRequest` and run the dispatcher
//! - Execute forward instructions against upstream origins
//! - Swap in recompiled routing tables without dropping requests
//! - Observability (metrics, correlation IDs)

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::env::Environment;
use crate::config::schema::ServerConfig;
use crate::error::SiteError;
use crate::http::request::SiteRequest;
use crate::http::response::{ForwardInstruction, Outcome};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::pipeline::{Dispatcher, Stage};
use crate::routing::router::RoutingTable;
use crate::security::headers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<ArcSwap<RoutingTable>>,
    pub env: Arc<dyn Environment>,
    pub client: Client<HttpConnector, Body>,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,
}

/// HTTP server for one site.
pub struct HttpServer {
    router: Router,
    table: Arc<ArcSwap<RoutingTable>>,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server serving `table`, interpolating from `env`.
    pub fn new(config: ServerConfig, table: RoutingTable, env: Arc<dyn Environment>) -> Self {
        let table = Arc::new(ArcSwap::from_pointee(table));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            table: table.clone(),
            env,
            client,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            table,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(site_handler))
            .route("/", any(site_handler))
            .fallback(site_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Handle to the live table, for swapping in a new one.
    pub fn table(&self) -> Arc<ArcSwap<RoutingTable>> {
        self.table.clone()
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Tables received on `updates` replace the live one atomically.
    pub async fn run(
        self,
        listener: TcpListener,
        mut updates: mpsc::UnboundedReceiver<RoutingTable>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let table = self.table.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Some(new_table) => {
                            table.store(Arc::new(new_table));
                            metrics::record_config_reload();
                            tracing::info!("Routing table swapped");
                        }
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Site handler: dispatch, then reply or forward.
async fn site_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let dispatcher = Dispatcher::new(state.table.load_full(), state.env.clone());

    let (body, oversized) = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => (bytes, false),
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
            (Bytes::new(), true)
        }
    };
    let site_request = SiteRequest::from_parts(&parts, body);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %site_request.path,
        "Dispatching request"
    );

    // Stages read the filesystem and verify password hashes synchronously.
    let joined = tokio::task::spawn_blocking(move || {
        let dispatched = if oversized {
            dispatcher.reject_oversized(&site_request)
        } else {
            dispatcher.dispatch(&site_request)
        };
        (dispatcher, site_request, dispatched)
    })
    .await;
    let (dispatcher, site_request, dispatched) = match joined {
        Ok(done) => done,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Dispatch task failed");
            metrics::record_request(&method, "dispatch", 500, start_time);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match dispatched.outcome {
        Outcome::Reply(resp) => {
            tracing::debug!(
                request_id = %request_id,
                stage = %dispatched.stage,
                status = resp.status.as_u16(),
                "Replying"
            );
            metrics::record_request(&method, dispatched.stage.as_str(), resp.status.as_u16(), start_time);
            resp.into_response()
        }
        Outcome::Forward(fwd) => {
            let response = match forward(&state, fwd, &request_id).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Upstream error");
                    dispatcher
                        .render_error(&site_request, e.status())
                        .into_response()
                }
            };
            metrics::record_request(&method, Stage::Proxy.as_str(), response.status().as_u16(), start_time);
            response
        }
    }
}

/// Send a forward instruction upstream. No retries.
async fn forward(state: &AppState, fwd: ForwardInstruction, request_id: &str) -> Result<Response, SiteError> {
    let origin = fwd.url.origin().ascii_serialization();
    let unreachable = |reason: String| SiteError::UpstreamUnreachable {
        origin: origin.clone(),
        reason,
    };

    let uri: Uri = fwd
        .url
        .as_str()
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| unreachable(e.to_string()))?;

    let mut builder = Request::builder().method(fwd.method.clone()).uri(uri);
    if let Some(h) = builder.headers_mut() {
        h.extend(fwd.headers.clone());
    }
    let req = builder
        .body(Body::from(fwd.body.clone()))
        .map_err(|e| unreachable(e.to_string()))?;

    tracing::debug!(request_id = %request_id, upstream = %fwd.url, "Forwarding request");

    let response = match tokio::time::timeout(state.upstream_timeout, state.client.request(req)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            metrics::record_upstream_failure(&fwd.mount);
            return Err(unreachable(e.to_string()));
        }
        Err(_) => {
            metrics::record_upstream_failure(&fwd.mount);
            return Err(unreachable(format!(
                "no response within {}s",
                state.upstream_timeout.as_secs()
            )));
        }
    };

    let (mut parts, body) = response.into_parts();
    headers::strip_hop_by_hop(&mut parts.headers);
    headers::apply(&mut parts.headers, &fwd.response_headers);
    Ok(Response::from_parts(parts, Body::new(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::MapEnv;
    use crate::config::loader::parse_site;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn table(dir: &TempDir, json: &str) -> RoutingTable {
        let config = parse_site(Path::new("static.json"), json).unwrap();
        RoutingTable::from_config(&config, dir.path()).unwrap()
    }

    fn server(json: &str) -> (TempDir, HttpServer) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("public_html");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("index.html"), "home").unwrap();
        let table = table(&dir, json);
        let server = HttpServer::new(ServerConfig::default(), table, Arc::new(MapEnv::new()));
        (dir, server)
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header("host", "example.com:8080")
            .body(Body::empty())
            .unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_serves_static_file() {
        let (_dir, server) = server("{}");
        let response = server.router.clone().oneshot(get("/index.html")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(text(response).await, "home");
    }

    #[tokio::test]
    async fn test_redirect_location_uses_host_header() {
        let (_dir, server) = server(r#"{"redirects": {"/old": {"url": "/"}}}"#);
        let response = server.router.clone().oneshot(get("/old")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "http://example.com/");
    }

    #[tokio::test]
    async fn test_swapped_table_used_by_next_request() {
        let (dir, server) = server("{}");
        let response = server.router.clone().oneshot(get("/docs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        server
            .table()
            .store(Arc::new(table(&dir, r#"{"routes": {"/docs": "index.html"}}"#)));
        let response = server.router.clone().oneshot(get("/docs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, "home");
    }
}
