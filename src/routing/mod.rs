//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing Request (scheme, host, port)
//!     → router.rs (select transport)
//!     → mounts.rs (most specific matching mount)
//!     → matcher.rs (evaluate routing keys)
//!     → Return: Mounted transport | Bypass | NotFound
//!
//! Router Construction:
//!     ProxyEnv (env.rs) + RouterConfig mounts + explicit mounts
//!     → Parse routing keys (fail fast on malformed keys)
//!     → Sort by specificity
//!     → Freeze as immutable Router
//!     → shared.rs swaps whole Routers on reload
//! ```
//!
//! # Design Decisions
//! - Routers built once, immutable at runtime
//! - No regex in the hot path (suffix matching only)
//! - Deterministic: same input always matches same mount
//! - First match wins (ordered by specificity)

pub mod env;
pub mod matcher;
pub mod mounts;
pub mod router;
pub mod shared;

pub use env::ProxyEnv;
pub use matcher::{PatternError, UrlPattern};
pub use mounts::{MountEntry, MountTable, Resolution};
pub use router::{RouteInfo, Router, RouterBuilder};
pub use shared::SharedRouter;
