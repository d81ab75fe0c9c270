//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Mount value meaning "send directly, bypassing any proxy".
pub const DIRECT: &str = "direct";

/// Root configuration for the transport router.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Read proxy settings from the environment.
    pub trust_env: bool,

    /// Proxy for every request; replaces environment proxies when set.
    pub proxy: Option<String>,

    /// Routing key → proxy URL, or `"direct"` for bypass.
    pub mounts: BTreeMap<String, String>,

    /// Timeout configuration for network transports.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            trust_env: true,
            proxy: None,
            mounts: BTreeMap::new(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Mounts with their proxy URL, `None` for bypass.
    pub fn mount_targets(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.mounts.iter().map(|(key, value)| {
            let target = if is_direct(value) { None } else { Some(value.as_str()) };
            (key.as_str(), target)
        })
    }
}

fn is_direct(value: &str) -> bool {
    value.eq_ignore_ascii_case(DIRECT) || value.eq_ignore_ascii_case("none")
}

/// Timeout configuration for network transports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter (trace, debug, info, warn, error, or an `EnvFilter` directive).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
