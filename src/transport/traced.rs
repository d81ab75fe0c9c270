//! Decorator adding a span, timing and metrics around another transport.

use std::time::Instant;

use futures_util::future::BoxFuture;
use tracing::Instrument;

use crate::observability::metrics;
use crate::transport::{Request, Response, Transport, TransportError};

/// Wraps a transport; behaviour is otherwise unchanged.
#[derive(Debug, Clone)]
pub struct TracedTransport<T> {
    inner: T,
}

impl<T: Transport> TracedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> Transport for TracedTransport<T> {
    fn handle(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        let span = tracing::debug_span!(
            "transport",
            transport = %self.inner.name(),
            method = %request.method,
            url = %request.url,
            request_id = tracing::field::Empty,
        );
        if let Some(id) = request.request_id() {
            span.record("request_id", tracing::field::display(id));
        }

        Box::pin(
            async move {
                let start = Instant::now();
                let result = self.inner.handle(request).await;
                match &result {
                    Ok(response) => {
                        metrics::record_transport_request(
                            self.inner.name(),
                            Some(response.status.as_u16()),
                            start,
                        );
                        tracing::debug!(
                            status = response.status.as_u16(),
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "Transport responded"
                        );
                    }
                    Err(e) => {
                        metrics::record_transport_request(self.inner.name(), None, start);
                        tracing::warn!(error = %e, "Transport failed");
                    }
                }
                result
            }
            .instrument(span),
        )
    }

    fn supports_scheme(&self, scheme: &str) -> bool {
        self.inner.supports_scheme(scheme)
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.inner.close()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
