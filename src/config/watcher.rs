//! Configuration file watcher for hot reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RouterConfig;

/// Watches one configuration file and emits every valid new version.
///
/// The parent directory is watched so that editors replacing the file
/// (write-to-temp then rename) are still noticed.
pub struct ConfigWatcher {
    path: PathBuf,
    file_name: OsString,
    update_tx: mpsc::UnboundedSender<RouterConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, returning it with the update receiver.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RouterConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let file_name = path.file_name().map(OsString::from).unwrap_or_default();

        (
            Self {
                path: path.to_path_buf(),
                file_name,
                update_tx,
            },
            update_rx,
        )
    }

    fn is_target(&self, event: &Event) -> bool {
        (event.kind.is_modify() || event.kind.is_create())
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(self.file_name.as_os_str()))
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if self.is_target(&event) => match load_config(&self.path) {
                    Ok(config) => {
                        tracing::info!(path = ?self.path, "Configuration reloaded");
                        if self.update_tx.send(config).is_err() {
                            tracing::debug!("Configuration receiver dropped");
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Failed to reload config; keeping current configuration"
                        );
                    }
                },
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
