//! Pluggable HTTP transport routing.
//!
//! Picks, among several transports, the one responsible for an outgoing
//! request based on its scheme, host and port, with proxy and no-proxy
//! carve-outs, and forwards the request to it.

pub mod config;
pub mod error;
pub mod observability;
pub mod routing;
pub mod transport;

pub use config::RouterConfig;
pub use error::Error;
pub use routing::{ProxyEnv, Router, RouterBuilder, SharedRouter};
pub use transport::{Body, Request, Response, SharedTransport, Transport, TransportError};
