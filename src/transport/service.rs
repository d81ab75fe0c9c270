//! In-process transport driving a `tower::Service`.
//!
//! Lets a client talk to an application (typically an `axum::Router`) in the
//! same process: no sockets, no proxies, the request goes straight into the
//! service and its response comes straight back.

use std::fmt;

use axum::body::{Body as AxumBody, Bytes, HttpBody};
use axum::http::{self, header, HeaderValue};
use futures_util::future::BoxFuture;
use tower::{Service, ServiceExt};

use crate::transport::{Body, BoxError, Request, Response, Transport, TransportError};

/// Adapter from `Transport` to an HTTP `tower::Service`.
#[derive(Clone)]
pub struct ServiceTransport<S> {
    service: S,
    name: String,
}

impl<S> ServiceTransport<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            name: "in-process".to_string(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<S> fmt::Debug for ServiceTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTransport")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<S, B> Transport for ServiceTransport<S>
where
    S: Service<http::Request<AxumBody>, Response = http::Response<B>>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn handle(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        let service = self.service.clone();
        Box::pin(async move {
            let request = into_http_request(request)?;
            let response = service
                .oneshot(request)
                .await
                .map_err(|e| TransportError::Service(e.into()))?;

            let (parts, body) = response.into_parts();
            let mut out = Response::new(parts.status);
            out.headers = parts.headers;
            out.extensions = parts.extensions;
            out.body = Body::from_stream(AxumBody::new(body).into_data_stream());
            Ok(out)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn into_http_request(request: Request) -> Result<http::Request<AxumBody>, TransportError> {
    let Request {
        method,
        url,
        mut headers,
        body,
        extensions,
    } = request;

    // Applications route on Host; fill it from the URL like a real client would.
    if !headers.contains_key(header::HOST) {
        if let Some(host) = url.host_str() {
            let host = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            let value = HeaderValue::from_str(&host)
                .map_err(|e| TransportError::Request(Box::new(e)))?;
            headers.insert(header::HOST, value);
        }
    }

    let body = match body {
        Body::Empty => AxumBody::empty(),
        Body::Full(bytes) => AxumBody::from(bytes),
        Body::Stream(stream) => AxumBody::from_stream(stream),
    };

    let mut out = http::Request::builder()
        .method(method)
        .uri(url.as_str())
        .body(body)
        .map_err(|e| TransportError::Request(Box::new(e)))?;
    *out.headers_mut() = headers;
    out.extensions_mut().extend(extensions);
    Ok(out)
}
