//! Atomically swappable router handle for configuration reload.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;

use crate::config::schema::RouterConfig;
use crate::error::Result;
use crate::routing::env::ProxyEnv;
use crate::routing::router::Router;
use crate::transport::{Request, Response};

/// Holds the current [`Router`]; readers never block writers.
///
/// In-flight requests keep the router they started with.
#[derive(Debug)]
pub struct SharedRouter {
    current: ArcSwap<Router>,
}

impl SharedRouter {
    pub fn new(router: Router) -> Self {
        Self {
            current: ArcSwap::from_pointee(router),
        }
    }

    /// Snapshot of the current router.
    pub fn load(&self) -> Arc<Router> {
        self.current.load_full()
    }

    /// Replace the router, returning the previous one.
    pub fn store(&self, router: Router) -> Arc<Router> {
        self.current.swap(Arc::new(router))
    }

    pub async fn dispatch(&self, request: Request) -> Result<Response> {
        self.load().dispatch(request).await
    }

    /// Rebuild the router for every configuration received.
    ///
    /// A configuration that fails to build is logged and skipped. Returns
    /// when the sender side is dropped.
    pub async fn apply_updates(
        &self,
        mut updates: mpsc::UnboundedReceiver<RouterConfig>,
        env: ProxyEnv,
    ) {
        while let Some(config) = updates.recv().await {
            match Router::from_config(&config, &env) {
                Ok(router) => {
                    let mounts = router.mounts().len();
                    self.store(router);
                    tracing::info!(mounts, "Router reloaded");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Rejected configuration; keeping current router");
                }
            }
        }
    }
}
