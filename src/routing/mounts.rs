//! Mount table: routing keys mapped to transports.
//!
//! # Responsibilities
//! - Parse every key once, at construction
//! - Collapse duplicate keys (last value wins)
//! - Keep entries sorted by descending specificity
//! - Resolve a request target to the first (most specific) match
//!
//! # Design Decisions
//! - A sorted `Vec`, never a hash map: resolution order is part of the contract
//! - Stable sort, so equal keys keep their insertion order
//! - Generic over the stored value so resolution is independent of transports
//! - Explicit `NotFound` rather than a silent default

use url::Url;

use crate::routing::matcher::{PatternError, Target, UrlPattern};

/// One mount: a routing key and its transport, or `None` for bypass.
#[derive(Debug, Clone)]
pub struct MountEntry<T> {
    pattern: UrlPattern,
    transport: Option<T>,
}

impl<T> MountEntry<T> {
    pub fn pattern(&self) -> &UrlPattern {
        &self.pattern
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn is_bypass(&self) -> bool {
        self.transport.is_none()
    }
}

/// Outcome of resolving a request against a mount table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<T> {
    /// The most specific match carries a transport.
    Mounted(T),
    /// The most specific match is a bypass: send directly.
    Bypass,
    /// Nothing matched: use the default transport.
    NotFound,
}

impl<T> Resolution<T> {
    pub fn mounted(self) -> Option<T> {
        match self {
            Resolution::Mounted(t) => Some(t),
            _ => None,
        }
    }
}

/// Immutable, specificity-ordered set of mounts.
#[derive(Debug, Clone)]
pub struct MountTable<T> {
    entries: Vec<MountEntry<T>>,
}

impl<T> Default for MountTable<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> MountTable<T> {
    /// Parse and sort `entries`. Fails on the first malformed key.
    pub fn build<I, K>(entries: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = (K, Option<T>)>,
        K: AsRef<str>,
    {
        let parsed = entries
            .into_iter()
            .map(|(key, transport)| Ok((UrlPattern::parse(key.as_ref())?, transport)))
            .collect::<Result<Vec<_>, PatternError>>()?;
        Ok(Self::from_patterns(parsed))
    }

    /// Sort already-parsed entries.
    pub fn from_patterns<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (UrlPattern, Option<T>)>,
    {
        let mut table: Vec<MountEntry<T>> = Vec::new();
        for (pattern, transport) in entries {
            match table.iter_mut().find(|e| e.pattern == pattern) {
                // Keeps the slot of the first occurrence.
                Some(existing) => {
                    existing.pattern = pattern;
                    existing.transport = transport;
                }
                None => table.push(MountEntry { pattern, transport }),
            }
        }

        table.sort_by(|a, b| b.pattern.specificity().cmp(&a.pattern.specificity()));
        Self { entries: table }
    }

    /// Most specific entry matching `target`.
    pub fn lookup(&self, target: &Target<'_>) -> Option<&MountEntry<T>> {
        self.entries.iter().find(|e| e.pattern.matches(target))
    }

    /// Resolve from parts. `host` is ASCII as `Url::host_str` returns it.
    pub fn resolve(&self, scheme: &str, host: &str, port: Option<u16>) -> Resolution<&T> {
        self.resolve_target(&Target::new(scheme, host, port))
    }

    pub fn resolve_url(&self, url: &Url) -> Resolution<&T> {
        self.resolve_target(&Target::from_url(url))
    }

    pub fn resolve_target(&self, target: &Target<'_>) -> Resolution<&T> {
        match self.lookup(target) {
            Some(MountEntry {
                transport: Some(t), ..
            }) => Resolution::Mounted(t),
            Some(_) => Resolution::Bypass,
            None => Resolution::NotFound,
        }
    }

    /// Entries in resolution order.
    pub fn entries(&self) -> &[MountEntry<T>] {
        &self.entries
    }

    /// Transports held by the table, in resolution order.
    pub fn transports(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter_map(MountEntry::transport)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
