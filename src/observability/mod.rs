//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router::dispatch / TracedTransport::handle produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → whatever `metrics` recorder the application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics exporter; the binary decides
//! - Request ID flows through dispatch spans
//! - `RUST_LOG` overrides the configured level

pub mod logging;
pub mod metrics;
