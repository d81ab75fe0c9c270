//! Routing keys and the match predicate.
//!
//! # Responsibilities
//! - Parse routing keys of the form `<scheme>://<host><:port>`
//! - Match a request's scheme, host and port against a key
//! - Rank keys by specificity
//!
//! # Design Decisions
//! - Scheme and host matching are case-insensitive
//! - `*.example.com` matches strict subdomains only
//! - `*example.com` matches the domain and its subdomains, on label boundaries
//! - Request ports are explicit or the scheme's well-known default
//! - No regex: matching is plain suffix comparison

use std::borrow::Cow;
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use thiserror::Error;
use url::{Host, Url};

/// Scheme written in place of a concrete one to match every scheme.
pub const ANY_SCHEME: &str = "all";

/// A malformed routing key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("routing key {0:?} must use URL form, e.g. \"{0}://\"")]
    MissingSeparator(String),

    #[error("routing key {0:?} has an invalid scheme")]
    InvalidScheme(String),

    #[error("routing key {0:?} has an invalid host")]
    InvalidHost(String),

    #[error("routing key {0:?} has an invalid port")]
    InvalidPort(String),

    #[error("routing key {0:?} must not contain a path, query or fragment")]
    PathNotAllowed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemePattern {
    Any,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostPattern {
    /// Empty host or `*`.
    Any,
    Exact(String),
    /// `*.example.com`: strict subdomains.
    Subdomain(String),
    /// `*example.com`: the domain itself and its subdomains.
    Domain(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortPattern {
    /// No port segment.
    Any,
    /// `:*`: the request must have a port, any value.
    Wildcard,
    Exact(u16),
}

/// Sort key: greater is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    scheme: u8,
    host: u8,
    port: u8,
    length: usize,
}

/// The scheme, host and port of a request, as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target<'a> {
    pub scheme: &'a str,
    pub host: Cow<'a, str>,
    pub port: Option<u16>,
}

impl<'a> Target<'a> {
    /// `host` is expected in the form `Url::host_str` gives: ASCII, with IDNA
    /// names already punycode. IPv6 brackets are optional.
    pub fn new(scheme: &'a str, host: &'a str, port: Option<u16>) -> Self {
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        Self {
            scheme,
            host: Cow::Borrowed(host),
            port,
        }
    }

    /// IPv6 hosts are unbracketed; missing ports fall back to the scheme default.
    pub fn from_url(url: &'a Url) -> Self {
        let host = match url.host() {
            Some(Host::Domain(domain)) => Cow::Borrowed(domain),
            Some(Host::Ipv4(addr)) => Cow::Owned(addr.to_string()),
            Some(Host::Ipv6(addr)) => Cow::Owned(addr.to_string()),
            None => Cow::Borrowed(""),
        };
        Self {
            scheme: url.scheme(),
            host,
            port: url.port_or_known_default(),
        }
    }
}

/// A parsed routing key.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    raw: String,
    scheme: SchemePattern,
    host: HostPattern,
    port: PortPattern,
}

impl UrlPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let (scheme, rest) = pattern
            .split_once("://")
            .ok_or_else(|| PatternError::MissingSeparator(pattern.to_string()))?;

        let scheme = parse_scheme(scheme)
            .ok_or_else(|| PatternError::InvalidScheme(pattern.to_string()))?;

        let authority = rest.strip_suffix('/').unwrap_or(rest);
        if authority.contains(['/', '?', '#']) {
            return Err(PatternError::PathNotAllowed(pattern.to_string()));
        }
        if authority.contains('@') {
            return Err(PatternError::InvalidHost(pattern.to_string()));
        }

        let (host, port) = split_authority(authority, pattern)?;
        let port = match port {
            None => PortPattern::Any,
            Some("*") => PortPattern::Wildcard,
            Some(p) => PortPattern::Exact(
                p.parse()
                    .map_err(|_| PatternError::InvalidPort(pattern.to_string()))?,
            ),
        };

        Ok(Self {
            raw: pattern.to_string(),
            scheme,
            host,
            port,
        })
    }

    /// The key as originally written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &SchemePattern {
        &self.scheme
    }

    pub fn host(&self) -> &HostPattern {
        &self.host
    }

    pub fn port(&self) -> PortPattern {
        self.port
    }

    /// True if the key covers every scheme, host and port.
    pub fn is_catch_all(&self) -> bool {
        self.scheme == SchemePattern::Any
            && self.host == HostPattern::Any
            && self.port == PortPattern::Any
    }

    pub fn matches(&self, target: &Target<'_>) -> bool {
        self.matches_scheme(target.scheme)
            && self.matches_host(&target.host)
            && self.matches_port(target.port)
    }

    pub fn matches_url(&self, url: &Url) -> bool {
        self.matches(&Target::from_url(url))
    }

    fn matches_scheme(&self, scheme: &str) -> bool {
        match &self.scheme {
            SchemePattern::Any => true,
            SchemePattern::Exact(s) => s.eq_ignore_ascii_case(scheme),
        }
    }

    fn matches_host(&self, host: &str) -> bool {
        match &self.host {
            HostPattern::Any => true,
            HostPattern::Exact(h) => h.eq_ignore_ascii_case(host),
            HostPattern::Subdomain(domain) => is_subdomain_of(host, domain),
            HostPattern::Domain(domain) => {
                domain.eq_ignore_ascii_case(host) || is_subdomain_of(host, domain)
            }
        }
    }

    fn matches_port(&self, port: Option<u16>) -> bool {
        match self.port {
            PortPattern::Any => true,
            PortPattern::Wildcard => port.is_some(),
            PortPattern::Exact(p) => port == Some(p),
        }
    }

    pub fn specificity(&self) -> Specificity {
        Specificity {
            scheme: match self.scheme {
                SchemePattern::Any => 0,
                SchemePattern::Exact(_) => 1,
            },
            host: match self.host {
                HostPattern::Any => 0,
                HostPattern::Domain(_) => 1,
                HostPattern::Subdomain(_) => 2,
                HostPattern::Exact(_) => 3,
            },
            port: match self.port {
                PortPattern::Any => 0,
                PortPattern::Wildcard => 1,
                PortPattern::Exact(_) => 2,
            },
            length: self.raw.len(),
        }
    }
}

/// Two keys are equal when they match exactly the same requests.
impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme && self.host == other.host && self.port == other.port
    }
}

impl Eq for UrlPattern {}

impl FromStr for UrlPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_scheme(scheme: &str) -> Option<SchemePattern> {
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !first.is_ascii_alphabetic() || !valid_rest {
        return None;
    }
    let scheme = scheme.to_ascii_lowercase();
    if scheme == ANY_SCHEME {
        Some(SchemePattern::Any)
    } else {
        Some(SchemePattern::Exact(scheme))
    }
}

fn split_authority<'a>(
    authority: &'a str,
    pattern: &str,
) -> Result<(HostPattern, Option<&'a str>), PatternError> {
    let invalid_host = || PatternError::InvalidHost(pattern.to_string());

    if let Some(rest) = authority.strip_prefix('[') {
        let (addr, after) = rest.split_once(']').ok_or_else(invalid_host)?;
        let addr: Ipv6Addr = addr.parse().map_err(|_| invalid_host())?;
        let port = match after {
            "" => None,
            _ => Some(after.strip_prefix(':').ok_or_else(invalid_host)?),
        };
        return Ok((HostPattern::Exact(addr.to_string()), port));
    }

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };

    Ok((parse_host(host).ok_or_else(invalid_host)?, port))
}

fn parse_host(host: &str) -> Option<HostPattern> {
    if host.is_empty() || host == "*" {
        return Some(HostPattern::Any);
    }

    let (kind, domain): (fn(String) -> HostPattern, &str) =
        if let Some(domain) = host.strip_prefix("*.") {
            (HostPattern::Subdomain as fn(String) -> HostPattern, domain)
        } else if let Some(domain) = host.strip_prefix('*') {
            (HostPattern::Domain, domain)
        } else {
            (HostPattern::Exact, host)
        };

    if domain.is_empty()
        || domain.starts_with('.')
        || domain.contains('*')
        || domain.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return None;
    }

    // Normalized like request hosts: lowercase ASCII, IDNA names as punycode.
    let domain = Host::parse(domain).ok()?.to_string();
    Some(kind(domain))
}

/// `host` ends with `.domain` and has a non-empty label before it.
fn is_subdomain_of(host: &str, domain: &str) -> bool {
    let Some(split) = host.len().checked_sub(domain.len() + 1) else {
        return false;
    };
    split > 0
        && host.as_bytes()[split] == b'.'
        && host
            .get(split + 1..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, url: &str) -> bool {
        let url = Url::parse(url).unwrap();
        UrlPattern::parse(pattern).unwrap().matches_url(&url)
    }

    #[test]
    fn parses_components() {
        let p = UrlPattern::parse("HTTPS://*.Example.com:8443").unwrap();
        assert_eq!(p.scheme(), &SchemePattern::Exact("https".into()));
        assert_eq!(p.host(), &HostPattern::Subdomain("example.com".into()));
        assert_eq!(p.port(), PortPattern::Exact(8443));
        assert_eq!(p.as_str(), "HTTPS://*.Example.com:8443");

        let p = UrlPattern::parse("all://").unwrap();
        assert!(p.is_catch_all());

        let p = UrlPattern::parse("all://*").unwrap();
        assert!(p.is_catch_all());

        let p = UrlPattern::parse("all://*example.com").unwrap();
        assert_eq!(p.host(), &HostPattern::Domain("example.com".into()));

        let p = UrlPattern::parse("http://[::1]:8080").unwrap();
        assert_eq!(p.host(), &HostPattern::Exact("::1".into()));
        assert_eq!(p.port(), PortPattern::Exact(8080));

        let p = UrlPattern::parse("all://example.com:*").unwrap();
        assert_eq!(p.port(), PortPattern::Wildcard);

        assert!(UrlPattern::parse("http://example.com/").is_ok());
    }

    #[test]
    fn rejects_malformed_keys() {
        let err = |p: &str| UrlPattern::parse(p).unwrap_err();

        assert_eq!(err("http"), PatternError::MissingSeparator("http".into()));
        assert!(matches!(err("://example.com"), PatternError::InvalidScheme(_)));
        assert!(matches!(err("1http://"), PatternError::InvalidScheme(_)));
        assert!(matches!(err("http://example.com:99999"), PatternError::InvalidPort(_)));
        assert!(matches!(err("http://example.com:abc"), PatternError::InvalidPort(_)));
        assert!(matches!(err("http://example.com/path"), PatternError::PathNotAllowed(_)));
        assert!(matches!(err("http://example.com?q"), PatternError::PathNotAllowed(_)));
        assert!(matches!(err("http://ex*ample.com"), PatternError::InvalidHost(_)));
        assert!(matches!(err("http://**.example.com"), PatternError::InvalidHost(_)));
        assert!(matches!(err("http://*."), PatternError::InvalidHost(_)));
        assert!(matches!(err("http://user@example.com"), PatternError::InvalidHost(_)));
        assert!(matches!(err("http://[zz]"), PatternError::InvalidHost(_)));
    }

    #[test]
    fn idn_hosts_are_punycode() {
        let p = UrlPattern::parse("https://Bücher.example").unwrap();
        assert_eq!(p.host(), &HostPattern::Exact("xn--bcher-kva.example".into()));

        let p = UrlPattern::parse("all://*.bücher.example").unwrap();
        assert_eq!(p.host(), &HostPattern::Subdomain("xn--bcher-kva.example".into()));
        assert!(matches("all://*.bücher.example", "http://shop.bücher.example/"));
        assert!(matches("all://*bücher.example", "http://xn--bcher-kva.example/"));
    }

    #[test]
    fn target_host_brackets_are_optional() {
        let p = UrlPattern::parse("all://[::1]").unwrap();
        assert!(p.matches(&Target::new("http", "[::1]", Some(80))));
        assert!(p.matches(&Target::new("http", "::1", Some(80))));
        assert_eq!(Target::new("http", "[::1]", None).host, "::1");
    }

    #[test]
    fn scheme_matching() {
        assert!(matches("all://", "https://example.com"));
        assert!(matches("http://", "http://example.com"));
        assert!(!matches("http://", "https://example.com"));
    }

    #[test]
    fn exact_host_matching() {
        assert!(matches("all://example.com", "https://example.com"));
        assert!(matches("all://example.com", "https://EXAMPLE.com"));
        assert!(!matches("all://example.com", "https://other.com"));
        assert!(!matches("all://example.com", "https://www.example.com"));
    }

    #[test]
    fn strict_subdomain_matching() {
        assert!(matches("all://*.example.com", "http://sub.example.com"));
        assert!(matches("all://*.example.com", "http://a.b.example.com"));
        assert!(!matches("all://*.example.com", "http://example.com"));
        assert!(!matches("all://*.example.com", "http://notexample.com"));
    }

    #[test]
    fn domain_and_subdomain_matching() {
        assert!(matches("all://*example.com", "http://example.com"));
        assert!(matches("all://*example.com", "http://sub.example.com"));
        assert!(!matches("all://*example.com", "http://notexample.com"));
        assert!(!matches("all://*example.com", "http://example.org"));
    }

    #[test]
    fn port_matching() {
        assert!(matches("all://example.com:8080", "http://example.com:8080"));
        assert!(!matches("all://example.com:8080", "http://example.com"));
        // Default ports count as the request's port.
        assert!(matches("all://example.com:443", "https://example.com"));
        assert!(matches("all://example.com:*", "http://example.com"));
        assert!(matches("all://*:*", "https://anything.test:1234"));
        assert!(!matches("all://*:*", "custom://host/"));
    }

    #[test]
    fn ipv6_matching() {
        assert!(matches("all://[::1]", "http://[::1]:8000/"));
        assert!(matches("all://[0:0:0:0:0:0:0:1]", "http://[::1]/"));
        assert!(!matches("all://[::1]", "http://[::2]/"));
    }

    #[test]
    fn exact_key_matches_what_it_encodes() {
        for (pattern, url) in [
            ("http://example.com", "http://example.com/"),
            ("https://example.com:8443", "https://example.com:8443/x"),
            ("ws://10.0.0.1:9000", "ws://10.0.0.1:9000/"),
            ("https://bücher.example", "https://bücher.example/"),
            ("http://ÉCOLE.example:8080", "http://école.example:8080/"),
        ] {
            assert!(matches(pattern, url), "{pattern} should match {url}");
        }
    }

    #[test]
    fn specificity_order() {
        let s = |p: &str| UrlPattern::parse(p).unwrap().specificity();

        // Scheme dominates host, host dominates port.
        assert!(s("http://") > s("all://example.com:80"));
        assert!(s("all://example.com") > s("all://*.example.com:80"));
        assert!(s("all://*.example.com") > s("all://*example.com"));
        assert!(s("all://*example.com") > s("all://:8080"));
        assert!(s("all://example.com:80") > s("all://example.com:*"));
        assert!(s("all://example.com:*") > s("all://example.com"));
        // Length breaks the remaining ties.
        assert!(s("all://longer.example.com") > s("all://short.com"));
    }

    #[test]
    fn equality_ignores_spelling() {
        let p = |s: &str| UrlPattern::parse(s).unwrap();
        assert_eq!(p("ALL://Example.COM"), p("all://example.com/"));
        assert_eq!(p("all://*"), p("all://"));
        assert_ne!(p("all://example.com"), p("all://example.com:80"));
        assert_eq!(p("all://bücher.example"), p("all://xn--bcher-kva.example"));
    }
}
