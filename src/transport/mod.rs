//! Transport capability and the request/response types it exchanges.
//!
//! # Data Flow
//! ```text
//! Router::dispatch(Request)
//!     → selected Transport::handle(Request)
//!         - http.rs    (network, direct or through a proxy)
//!         - mock.rs    (canned handler, tests and stubs)
//!         - service.rs (in-process tower::Service, e.g. an axum app)
//!         - traced.rs  (decorator: span + metrics around another transport)
//!     → Response | TransportError
//! ```
//!
//! # Design Decisions
//! - One operation (`handle`), composed by delegation rather than inheritance
//! - Transports own their pooling and teardown; the router only holds `Arc`s
//! - Errors are opaque to the router and propagated unchanged

pub mod http;
pub mod mock;
pub mod service;
pub mod traced;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::routing::matcher::Target;

pub use self::http::HttpTransport;
pub use self::mock::MockTransport;
pub use self::service::ServiceTransport;
pub use self::traced::TracedTransport;

/// Boxed error used at the transport boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Streaming body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// Shared, type-erased transport handle as stored in mount tables.
pub type SharedTransport = Arc<dyn Transport>;

/// A capability that sends one request and produces one response.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Handle a single request.
    fn handle(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>>;

    /// Whether this transport can carry requests for `scheme`.
    ///
    /// Only consulted when the transport acts as the router's default.
    fn supports_scheme(&self, _scheme: &str) -> bool {
        true
    }

    /// Release pooled resources. Requests issued afterwards may fail.
    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    /// Short label for logs and metrics.
    fn name(&self) -> &str {
        "transport"
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn handle(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        (**self).handle(request)
    }

    fn supports_scheme(&self, scheme: &str) -> bool {
        (**self).supports_scheme(scheme)
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Failure raised by a transport. Opaque to the router.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not establish a connection.
    #[error("connect error: {0}")]
    Connect(#[source] BoxError),

    /// The request did not complete in time.
    #[error("request timed out: {0}")]
    Timeout(#[source] BoxError),

    /// The request could not be built or sent.
    #[error("request error: {0}")]
    Request(#[source] BoxError),

    /// Reading or writing a body failed.
    #[error("body error: {0}")]
    Body(#[source] BoxError),

    /// An in-process service returned an error.
    #[error("service error: {0}")]
    Service(#[source] BoxError),

    /// The transport was closed.
    #[error("transport {0} is closed")]
    Closed(String),
}

/// Unique identifier attached to every dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Request or response body.
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Full(Bytes),
    Stream(ByteStream),
}

impl Body {
    pub fn empty() -> Self {
        Body::Empty
    }

    /// Wrap a stream of chunks.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Body::Stream(stream.map(|chunk| chunk.map_err(Into::into)).boxed())
    }

    /// Buffer the whole body in memory.
    pub async fn collect(self) -> Result<Bytes, TransportError> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk.map_err(TransportError::Body)?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Full(bytes) => write!(f, "Body::Full({} bytes)", bytes.len()),
            Body::Stream(_) => f.write_str("Body::Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Full(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Full(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Full(Bytes::from_static(text.as_bytes()))
    }
}

/// An outgoing request.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
    /// Protocol-specific options carried to the transport.
    pub extensions: Extensions,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::Empty,
            extensions: Extensions::new(),
        }
    }

    /// Build a GET request from a URL string.
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Method::GET, Url::parse(url)?))
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host without IPv6 brackets; empty when the URL has none.
    pub fn host(&self) -> Cow<'_, str> {
        Target::from_url(&self.url).host
    }

    /// Explicit port, or the scheme's well-known default.
    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// The ID assigned at dispatch, if any.
    pub fn request_id(&self) -> Option<RequestId> {
        self.extensions.get::<RequestId>().copied()
    }
}

/// A response produced by a transport.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
    pub extensions: Extensions,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::Empty,
            extensions: Extensions::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Collect the body.
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        self.body.collect().await
    }

    /// Collect the body as UTF-8, replacing invalid sequences.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn request_accessors() {
        let req = Request::get("https://Example.com/a/b?q=1").unwrap();
        assert_eq!(req.scheme(), "https");
        assert_eq!(req.host(), "example.com");
        assert_eq!(req.port(), Some(443));
        assert_eq!(req.path(), "/a/b");
        assert!(req.request_id().is_none());
    }

    #[test]
    fn ipv6_host_is_unbracketed() {
        let req = Request::get("http://[::1]:8080/").unwrap();
        assert_eq!(req.host(), "::1");
        assert_eq!(req.port(), Some(8080));
    }

    #[tokio::test]
    async fn stream_body_collects_in_order() {
        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"Hello")),
            Ok(Bytes::from_static(b", ")),
            Ok(Bytes::from_static(b"world!")),
        ];
        let body = Body::from_stream(stream::iter(chunks));
        assert_eq!(body.collect().await.unwrap(), "Hello, world!");
    }

    #[tokio::test]
    async fn stream_body_error_surfaces() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "reset")),
        ];
        let body = Body::from_stream(stream::iter(chunks));
        assert!(matches!(body.collect().await, Err(TransportError::Body(_))));
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
