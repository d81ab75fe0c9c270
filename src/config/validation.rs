//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every mount key parses as a routing key
//! - Check every proxy URL is usable
//! - Validate value ranges (timeouts > 0, log filter parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::RouterConfig;
use crate::routing::matcher::{PatternError, UrlPattern};
use crate::transport::http::{parse_proxy_url, ProxyUrlError};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mounts: {0}")]
    InvalidMountKey(#[from] PatternError),

    #[error("{field}: {source}")]
    InvalidProxy {
        field: String,
        #[source]
        source: ProxyUrlError,
    },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("observability.log_level {0:?} is not a valid filter")]
    InvalidLogLevel(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(proxy) = &config.proxy {
        if let Err(source) = parse_proxy_url(proxy) {
            errors.push(ValidationError::InvalidProxy {
                field: "proxy".to_string(),
                source,
            });
        }
    }

    for (key, target) in config.mount_targets() {
        if let Err(e) = UrlPattern::parse(key) {
            errors.push(e.into());
        }
        if let Some(proxy) = target {
            if let Err(source) = parse_proxy_url(proxy) {
                errors.push(ValidationError::InvalidProxy {
                    field: format!("mounts.{key:?}"),
                    source,
                });
            }
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
