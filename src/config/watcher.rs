//! Site configuration watcher for hot reload.
//!
//! Every change to `static.json` recompiles a complete [`RoutingTable`]. A
//! table is only sent once it compiled; a broken edit keeps the current one.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_site;
use crate::error::SiteError;
use crate::routing::router::RoutingTable;

/// Load and compile the site configuration at `path`.
pub fn compile_site(path: &Path) -> Result<RoutingTable, SiteError> {
    let loaded = load_site(path)?;
    RoutingTable::compile(&loaded)
}

/// A watcher that monitors the site configuration for changes.
pub struct SiteWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RoutingTable>,
}

impl SiteWatcher {
    /// Returns the watcher and a receiver for recompiled tables.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RoutingTable>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    ///
    /// The parent directory is watched so that editors which replace the
    /// file instead of writing it in place are still seen.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let file_name = path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event.kind.is_modify() || event.kind.is_create();
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !(relevant && ours) {
                        return;
                    }
                    tracing::info!(path = %path.display(), "Site config change detected, reloading");
                    match compile_site(&path) {
                        Ok(table) => {
                            let _ = tx.send(table);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload site config, keeping current table");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Site config watcher started");
        Ok(watcher)
    }
}
