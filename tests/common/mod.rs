//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use static_router::config::env::{Environment, MapEnv};
use static_router::config::watcher::compile_site;
use static_router::{HttpServer, RoutingTable, ServerConfig, Shutdown};

/// Requests seen by a recording backend, as `METHOD target` plus headers.
pub type Seen = Arc<Mutex<Vec<SeenRequest>>>;

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub line: String,
    pub headers: Vec<(String, String)>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a mock backend that returns a fixed body.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    let (addr, _) = start_recording_backend(body).await;
    addr
}

/// Start a mock backend that records each request head and answers with
/// `body`, plus `X-Upstream` and `X-Shared` headers.
pub async fn start_recording_backend(body: &'static str) -> (SocketAddr, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let log = log.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let mut lines = head.lines();
                let line = lines
                    .next()
                    .unwrap_or_default()
                    .rsplit_once(' ')
                    .map(|(l, _)| l.to_string())
                    .unwrap_or_default();
                let headers = lines
                    .filter_map(|l| l.split_once(':'))
                    .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
                    .collect();
                log.lock().unwrap().push(SeenRequest { line, headers });

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nX-Upstream: origin\r\nX-Shared: origin\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    (addr, seen)
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// A running server over a site written to a temporary directory.
pub struct TestSite {
    pub addr: SocketAddr,
    pub dir: TempDir,
    pub updates: mpsc::UnboundedSender<RoutingTable>,
    shutdown: Shutdown,
}

impl TestSite {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn config_path(&self) -> std::path::PathBuf {
        self.dir.path().join("static.json")
    }

    /// Rewrite `static.json` and push the recompiled table to the server.
    pub fn reload(&self, json: &str) {
        std::fs::write(self.config_path(), json).unwrap();
        self.updates.send(compile_site(&self.config_path()).unwrap()).unwrap();
    }
}

impl Drop for TestSite {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Write a site and serve it with default server settings.
pub async fn start_site(json: &str, files: &[(&str, &str)]) -> TestSite {
    start_site_with(json, files, MapEnv::new(), ServerConfig::default()).await
}

pub async fn start_site_with(
    json: &str,
    files: &[(&str, &str)],
    env: impl Environment + 'static,
    config: ServerConfig,
) -> TestSite {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("public_html");
    std::fs::create_dir_all(&root).unwrap();
    for (name, content) in files {
        write(&root, name, content);
    }
    let config_path = dir.path().join("static.json");
    std::fs::write(&config_path, json).unwrap();
    let table = compile_site(&config_path).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config, table, Arc::new(env));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestSite {
        addr,
        dir,
        updates,
        shutdown,
    }
}

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// A client that neither follows redirects nor uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
