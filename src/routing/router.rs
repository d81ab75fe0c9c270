//! Transport selection and dispatch.
//!
//! # Responsibilities
//! - Merge proxy-derived mounts and explicit mounts into one table
//! - Resolve each request to a mounted transport, a bypass, or the default
//! - Forward the request and hand back the transport's result untouched
//! - Close every distinct transport on teardown
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Explicit mounts override proxy-derived mounts with the same key
//! - Bypass and no-match both go to the default transport, which must exist
//!   and support the scheme, otherwise `UnsupportedProtocol`
//! - No retry and no failover between transports

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use url::Url;

use crate::config::schema::RouterConfig;
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::routing::env::ProxyEnv;
use crate::routing::matcher::Target;
use crate::routing::mounts::{MountTable, Resolution};
use crate::transport::http::{parse_proxy_url, HttpTransport};
use crate::transport::{Request, RequestId, Response, SharedTransport, TracedTransport, Transport};

type PendingMount = (String, Option<SharedTransport>);

/// Builder for [`Router`].
#[derive(Debug, Default)]
pub struct RouterBuilder {
    default: Option<SharedTransport>,
    proxy_mounts: Vec<PendingMount>,
    mounts: Vec<PendingMount>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport for unmatched requests and bypass mounts.
    pub fn default_transport(mut self, transport: SharedTransport) -> Self {
        self.default = Some(transport);
        self
    }

    /// A mount derived from proxy settings. Explicit mounts take precedence.
    pub fn proxy_mount(
        mut self,
        pattern: impl Into<String>,
        transport: Option<SharedTransport>,
    ) -> Self {
        self.proxy_mounts.push((pattern.into(), transport));
        self
    }

    /// Route requests matching `pattern` to `transport`.
    pub fn mount(mut self, pattern: impl Into<String>, transport: SharedTransport) -> Self {
        self.mounts.push((pattern.into(), Some(transport)));
        self
    }

    /// Send requests matching `pattern` directly, skipping broader mounts.
    pub fn bypass(mut self, pattern: impl Into<String>) -> Self {
        self.mounts.push((pattern.into(), None));
        self
    }

    /// Fails if any routing key is malformed.
    pub fn build(self) -> Result<Router> {
        let mounts = MountTable::build(self.proxy_mounts.into_iter().chain(self.mounts))?;
        tracing::debug!(
            mounts = mounts.len(),
            has_default = self.default.is_some(),
            "Router built"
        );
        Ok(Router {
            default: self.default,
            mounts,
        })
    }
}

/// How a URL was routed. Serializable for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub url: String,
    /// The mount key that matched, if any.
    pub pattern: Option<String>,
    /// `mounted`, `bypass`, `default` or `unsupported`.
    pub outcome: &'static str,
    /// Name of the transport that would handle the request.
    pub transport: Option<String>,
}

/// Immutable routing facade over a default transport and a mount table.
#[derive(Debug)]
pub struct Router {
    default: Option<SharedTransport>,
    mounts: MountTable<SharedTransport>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Wire network transports from configuration and the proxy environment.
    ///
    /// The explicit `proxy` replaces environment proxies; environment proxies
    /// are only read when `trust_env` is set. One transport is created per
    /// distinct proxy URL.
    pub fn from_config(config: &RouterConfig, env: &ProxyEnv) -> Result<Self> {
        let mut factory = TransportFactory::new(config);
        let mut builder = Router::builder().default_transport(factory.direct()?);

        let proxy_entries = match &config.proxy {
            Some(proxy) => vec![("all://".to_string(), Some(proxy.clone()))],
            None if config.trust_env => env.mounts(),
            None => Vec::new(),
        };
        for (pattern, proxy) in proxy_entries {
            let transport = proxy.as_deref().map(|p| factory.proxied(p)).transpose()?;
            builder = builder.proxy_mount(pattern, transport);
        }

        for (pattern, proxy) in config.mount_targets() {
            builder = match proxy {
                Some(p) => builder.mount(pattern, factory.proxied(p)?),
                None => builder.bypass(pattern),
            };
        }

        builder.build()
    }

    pub fn mounts(&self) -> &MountTable<SharedTransport> {
        &self.mounts
    }

    pub fn default_transport(&self) -> Option<&SharedTransport> {
        self.default.as_ref()
    }

    /// Mount-table resolution for `url`, before the default is applied.
    pub fn resolve(&self, url: &Url) -> Resolution<&SharedTransport> {
        self.mounts.resolve_url(url)
    }

    /// The transport that will handle `url`.
    pub fn transport_for(&self, url: &Url) -> Result<&SharedTransport> {
        self.select(url).map(|(transport, _)| transport)
    }

    fn select(&self, url: &Url) -> Result<(&SharedTransport, &'static str)> {
        let outcome = match self.resolve(url) {
            Resolution::Mounted(transport) => return Ok((transport, "mounted")),
            Resolution::Bypass => "bypass",
            Resolution::NotFound => "default",
        };
        match &self.default {
            Some(transport) if transport.supports_scheme(url.scheme()) => Ok((transport, outcome)),
            _ => Err(Error::UnsupportedProtocol {
                scheme: url.scheme().to_string(),
                url: url.to_string(),
            }),
        }
    }

    /// Describe how `url` is routed.
    pub fn explain(&self, url: &Url) -> RouteInfo {
        let pattern = self
            .mounts
            .lookup(&Target::from_url(url))
            .map(|e| e.pattern().to_string());
        let (outcome, transport) = match self.select(url) {
            Ok((transport, outcome)) => (outcome, Some(transport.name().to_string())),
            Err(_) => ("unsupported", None),
        };
        RouteInfo {
            url: url.to_string(),
            pattern,
            outcome,
            transport,
        }
    }

    /// Send `request` through the transport responsible for its URL.
    ///
    /// Transport failures are returned unchanged.
    pub async fn dispatch(&self, mut request: Request) -> Result<Response> {
        if request.extensions.get::<RequestId>().is_none() {
            request.extensions.insert(RequestId::new());
        }
        let request_id = request.request_id().unwrap_or_default();

        let (transport, outcome) = match self.select(&request.url) {
            Ok(selected) => selected,
            Err(e) => {
                metrics::record_dispatch("unsupported");
                tracing::warn!(
                    request_id = %request_id,
                    url = %request.url,
                    "No transport for request"
                );
                return Err(e);
            }
        };
        metrics::record_dispatch(outcome);

        let span = tracing::info_span!(
            "dispatch",
            request_id = %request_id,
            method = %request.method,
            url = %request.url,
            route = outcome,
            transport = %transport.name(),
        );

        async move {
            tracing::debug!("Dispatching request");
            transport.handle(request).await.map_err(Error::Transport)
        }
        .instrument(span)
        .await
    }

    /// Close every distinct transport once.
    pub async fn close(&self) {
        let mut seen: Vec<&SharedTransport> = Vec::new();
        for transport in self.default.iter().chain(self.mounts.transports()) {
            if !seen.iter().any(|s| Arc::ptr_eq(s, transport)) {
                seen.push(transport);
            }
        }
        for transport in &seen {
            transport.close().await;
        }
        tracing::debug!(transports = seen.len(), "Router closed");
    }
}

/// Creates network transports, sharing one per proxy URL.
struct TransportFactory<'a> {
    config: &'a RouterConfig,
    proxies: HashMap<String, SharedTransport>,
}

impl<'a> TransportFactory<'a> {
    fn new(config: &'a RouterConfig) -> Self {
        Self {
            config,
            proxies: HashMap::new(),
        }
    }

    fn direct(&self) -> Result<SharedTransport> {
        let transport = HttpTransport::direct(&self.config.timeouts).map_err(Error::TransportInit)?;
        Ok(Arc::new(TracedTransport::new(transport)))
    }

    fn proxied(&mut self, proxy: &str) -> Result<SharedTransport> {
        if let Some(existing) = self.proxies.get(proxy) {
            return Ok(existing.clone());
        }
        let url = parse_proxy_url(proxy)?;
        let transport =
            HttpTransport::proxied(url, &self.config.timeouts).map_err(Error::TransportInit)?;
        let transport: SharedTransport = Arc::new(TracedTransport::new(transport));
        self.proxies.insert(proxy.to_string(), transport.clone());
        Ok(transport)
    }
}
