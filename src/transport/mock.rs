//! Transport answering requests from an in-memory handler.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::transport::{Request, Response, Transport, TransportError};

type Handler = dyn Fn(Request) -> Result<Response, TransportError> + Send + Sync;

/// Transport that never touches the network.
///
/// Every request is passed to the handler; its result is returned as-is.
#[derive(Clone)]
pub struct MockTransport {
    name: String,
    handler: Arc<Handler>,
    requests: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(Request) -> Result<Response, TransportError> + Send + Sync + 'static,
    {
        Self {
            name: "mock".to_string(),
            handler: Arc::new(handler),
            requests: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Label used in logs and metrics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of requests handled so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of times `close()` was called.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("name", &self.name)
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl Transport for MockTransport {
    fn handle(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let result = (self.handler)(request);
        Box::pin(async move { result })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {})
    }

    fn name(&self) -> &str {
        &self.name
    }
}
