//! Crate-level error type.

use thiserror::Error;

use crate::routing::matcher::PatternError;
use crate::transport::http::ProxyUrlError;
use crate::transport::TransportError;

/// Errors surfaced by router construction and dispatch.
#[derive(Debug, Error)]
pub enum Error {
    /// A routing key could not be parsed. Construction time only.
    #[error("invalid mount: {0}")]
    InvalidPattern(#[from] PatternError),

    /// A proxy URL could not be used. Construction time only.
    #[error(transparent)]
    InvalidProxy(#[from] ProxyUrlError),

    /// A network transport could not be created. Construction time only.
    #[error("failed to initialise transport: {0}")]
    TransportInit(#[source] TransportError),

    /// No transport can carry the request.
    #[error("unsupported protocol {scheme:?} for {url}")]
    UnsupportedProtocol { scheme: String, url: String },

    /// The selected transport failed; passed through unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// True for errors that can only happen while building a router.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidPattern(_) | Error::InvalidProxy(_) | Error::TransportInit(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
