//! Network transport backed by `reqwest`.
//!
//! # Responsibilities
//! - Send requests over the network, directly or through one proxy
//! - Map `reqwest` failures onto `TransportError`
//! - Refuse new requests after `close()`
//!
//! # Design Decisions
//! - System proxy detection is always disabled; proxies come from mounts only
//! - One client per transport, so each proxy gets its own connection pool
//! - Streaming request bodies are buffered before sending

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;
use url::Url;

use crate::config::schema::TimeoutConfig;
use crate::transport::{Body, Request, Response, Transport, TransportError};

/// Proxy URL schemes accepted for proxied transports.
pub const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Error returned for an unusable proxy URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid proxy URL {url:?}: {reason}")]
pub struct ProxyUrlError {
    pub url: String,
    pub reason: String,
}

/// Parse and check a proxy URL.
pub fn parse_proxy_url(raw: &str) -> Result<Url, ProxyUrlError> {
    let err = |reason: String| ProxyUrlError {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| err(e.to_string()))?;
    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(err(format!("unsupported proxy scheme {:?}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(err("missing host".to_string()));
    }
    Ok(url)
}

/// HTTP(S) transport over the network.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    proxy: Option<Url>,
    label: String,
    closed: Arc<AtomicBool>,
}

impl HttpTransport {
    /// Transport that connects straight to the origin.
    pub fn direct(timeouts: &TimeoutConfig) -> Result<Self, TransportError> {
        Self::build(None, timeouts)
    }

    /// Transport that sends every request through `proxy`.
    pub fn proxied(proxy: Url, timeouts: &TimeoutConfig) -> Result<Self, TransportError> {
        Self::build(Some(proxy), timeouts)
    }

    fn build(proxy: Option<Url>, timeouts: &TimeoutConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(timeouts.connect())
            .timeout(timeouts.request());

        if let Some(proxy) = &proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(map_reqwest_error)?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(map_reqwest_error)?;
        let label = match &proxy {
            Some(url) => format!("proxy:{}", redact(url)),
            None => "direct".to_string(),
        };

        Ok(Self {
            client,
            proxy,
            label,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The proxy this transport forwards through, if any.
    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed(self.label.clone()));
        }

        let Request {
            method,
            url,
            headers,
            body,
            ..
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        match body {
            Body::Empty => {}
            Body::Full(bytes) => builder = builder.body(bytes),
            body @ Body::Stream(_) => builder = builder.body(body.collect().await?),
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let mut out = Response::new(response.status());
        out.headers = response.headers().clone();
        out.body = Body::from_stream(response.bytes_stream());
        Ok(out)
    }
}

impl Transport for HttpTransport {
    fn handle(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        Box::pin(self.send(request))
    }

    fn supports_scheme(&self, scheme: &str) -> bool {
        matches!(scheme, "http" | "https")
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.closed.swap(true, Ordering::AcqRel) {
                tracing::debug!(transport = %self.label, "Transport closed");
            }
        })
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Strip credentials so proxy URLs can be logged.
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.to_string()
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(Box::new(err))
    } else if err.is_connect() {
        TransportError::Connect(Box::new(err))
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(Box::new(err))
    } else {
        TransportError::Request(Box::new(err))
    }
}
