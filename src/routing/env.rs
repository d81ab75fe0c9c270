//! Proxy settings from the environment.
//!
//! # Responsibilities
//! - Snapshot `HTTP_PROXY`, `HTTPS_PROXY`, `ALL_PROXY`, `NO_PROXY`
//! - Translate the snapshot into routing keys (proxy URL or bypass)
//!
//! # Design Decisions
//! - Pure: `ProxyEnv::from_vars` takes any variable iterator, reads nothing global
//! - Lowercase variables win over uppercase ones
//! - `HTTP_PROXY` is ignored when `REQUEST_METHOD` is set (CGI, "httpoxy")
//! - `NO_PROXY=*` disables every environment proxy
//! - CIDR ranges in `NO_PROXY` are not supported and are skipped
//! - Entries that would not parse as routing keys are skipped with a warning

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::routing::matcher::{UrlPattern, ANY_SCHEME};

/// Routing key derived from the environment, with its proxy URL or `None` for bypass.
pub type EnvMount = (String, Option<String>);

/// Snapshot of the proxy-related environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyEnv {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
    pub no_proxy: Option<String>,
}

#[derive(Default)]
struct Slot {
    upper: Option<String>,
    lower: Option<String>,
}

impl Slot {
    fn set(&mut self, name: &str, value: String) {
        if name.bytes().any(|b| b.is_ascii_lowercase()) {
            self.lower = Some(value);
        } else {
            self.upper = Some(value);
        }
    }

    fn resolve(self) -> Option<String> {
        self.lower.or(self.upper)
    }
}

impl ProxyEnv {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit `(name, value)` pairs. Empty values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let (mut http, mut https, mut all, mut no_proxy) =
            (Slot::default(), Slot::default(), Slot::default(), Slot::default());
        let mut cgi = false;

        for (name, value) in vars {
            let name = name.as_ref();
            let value: String = value.into();
            if name == "REQUEST_METHOD" {
                cgi = true;
                continue;
            }
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            let slot = match name.to_ascii_lowercase().as_str() {
                "http_proxy" => &mut http,
                "https_proxy" => &mut https,
                "all_proxy" => &mut all,
                "no_proxy" => &mut no_proxy,
                _ => continue,
            };
            slot.set(name, value);
        }

        if cgi {
            http.upper = None;
        }

        Self {
            http: http.resolve(),
            https: https.resolve(),
            all: all.resolve(),
            no_proxy: no_proxy.resolve(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Routing keys for this environment, proxies first, then bypasses.
    ///
    /// A `NO_PROXY` host is emitted as `all://host` plus one `<scheme>://host`
    /// key per scheme-specific proxy, so the bypass outranks `http://` and
    /// `https://` proxy mounts.
    pub fn mounts(&self) -> Vec<EnvMount> {
        let mut mounts = Vec::new();
        let mut proxied_schemes = Vec::new();

        for (scheme, proxy) in [("http", &self.http), ("https", &self.https), ("all", &self.all)] {
            if let Some(proxy) = proxy {
                let proxy = if proxy.contains("://") {
                    proxy.clone()
                } else {
                    format!("http://{proxy}")
                };
                mounts.push((format!("{scheme}://"), Some(proxy)));
                if scheme != ANY_SCHEME {
                    proxied_schemes.push(scheme);
                }
            }
        }

        let no_proxy = self.no_proxy.as_deref().unwrap_or_default();
        for entry in no_proxy.split(',').map(str::trim).filter(|h| !h.is_empty()) {
            if entry == "*" {
                return Vec::new();
            }
            let keys = if entry.contains("://") {
                vec![entry.to_string()]
            } else if let Some(host) = no_proxy_host(entry) {
                std::iter::once(ANY_SCHEME)
                    .chain(proxied_schemes.iter().copied())
                    .map(|scheme| format!("{scheme}://{host}"))
                    .collect()
            } else {
                tracing::warn!(entry = %entry, "Ignoring unsupported NO_PROXY entry");
                continue;
            };
            if let Err(e) = UrlPattern::parse(&keys[0]) {
                tracing::warn!(entry = %entry, error = %e, "Ignoring malformed NO_PROXY entry");
                continue;
            }
            mounts.extend(keys.into_iter().map(|key| (key, None)));
        }

        mounts
    }
}

/// Host part of a routing key for one `NO_PROXY` entry.
fn no_proxy_host(entry: &str) -> Option<String> {
    if entry.contains('/') {
        return None;
    }
    if entry.parse::<Ipv4Addr>().is_ok() || entry.eq_ignore_ascii_case("localhost") {
        return Some(entry.to_string());
    }
    let unbracketed = entry.trim_start_matches('[').trim_end_matches(']');
    if unbracketed.parse::<Ipv6Addr>().is_ok() {
        return Some(format!("[{unbracketed}]"));
    }
    // Already a wildcard: `*.d` stays strict, `*d` keeps the domain itself.
    if entry.starts_with('*') {
        return Some(entry.to_string());
    }
    let domain = entry.strip_prefix('.').unwrap_or(entry);
    Some(format!("*{domain}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> ProxyEnv {
        ProxyEnv::from_vars(vars.iter().copied())
    }

    fn key(k: &str, v: Option<&str>) -> EnvMount {
        (k.to_string(), v.map(str::to_string))
    }

    #[test]
    fn empty_environment() {
        let e = env(&[("PATH", "/usr/bin"), ("HTTP_PROXY", "  ")]);
        assert!(e.is_empty());
        assert!(e.mounts().is_empty());
    }

    #[test]
    fn proxies_become_scheme_mounts() {
        let e = env(&[
            ("HTTP_PROXY", "http://127.0.0.1:3128"),
            ("HTTPS_PROXY", "proxy.internal:3129"),
            ("ALL_PROXY", "socks5://127.0.0.1:1080"),
        ]);
        assert_eq!(
            e.mounts(),
            vec![
                key("http://", Some("http://127.0.0.1:3128")),
                key("https://", Some("http://proxy.internal:3129")),
                key("all://", Some("socks5://127.0.0.1:1080")),
            ]
        );
    }

    #[test]
    fn lowercase_wins() {
        let e = env(&[("http_proxy", "http://lower:1"), ("HTTP_PROXY", "http://upper:1")]);
        assert_eq!(e.http.as_deref(), Some("http://lower:1"));
    }

    #[test]
    fn cgi_ignores_uppercase_http_proxy() {
        let e = env(&[("REQUEST_METHOD", "GET"), ("HTTP_PROXY", "http://attacker:1")]);
        assert_eq!(e.http, None);
    }

    #[test]
    fn no_proxy_entries() {
        let e = env(&[(
            "NO_PROXY",
            "127.0.0.1, ::1, [fe80::1], localhost, example.com, .corp.test, \
             http://special.test, 10.0.0.0/8,,",
        )]);
        assert_eq!(
            e.mounts(),
            vec![
                key("all://127.0.0.1", None),
                key("all://[::1]", None),
                key("all://[fe80::1]", None),
                key("all://localhost", None),
                key("all://*example.com", None),
                key("all://*corp.test", None),
                key("http://special.test", None),
            ]
        );
    }

    #[test]
    fn bypass_outranks_scheme_proxies() {
        let e = env(&[("HTTPS_PROXY", "http://proxy:1"), ("NO_PROXY", "internal.test")]);
        assert_eq!(
            e.mounts(),
            vec![
                key("https://", Some("http://proxy:1")),
                key("all://*internal.test", None),
                key("https://*internal.test", None),
            ]
        );
    }

    #[test]
    fn star_disables_everything() {
        let e = env(&[("ALL_PROXY", "http://proxy:1"), ("NO_PROXY", "example.com,*")]);
        assert!(e.mounts().is_empty());
    }

    #[test]
    fn wildcard_no_proxy_entries_keep_their_form() {
        let e = env(&[
            ("HTTPS_PROXY", "http://proxy:1"),
            ("NO_PROXY", "localhost,*.corp.test,*lab.test"),
        ]);
        assert_eq!(
            e.mounts(),
            vec![
                key("https://", Some("http://proxy:1")),
                key("all://localhost", None),
                key("https://localhost", None),
                key("all://*.corp.test", None),
                key("https://*.corp.test", None),
                key("all://*lab.test", None),
                key("https://*lab.test", None),
            ]
        );
    }

    #[test]
    fn malformed_no_proxy_entries_are_skipped() {
        let e = env(&[
            ("HTTP_PROXY", "http://proxy:1"),
            ("NO_PROXY", "**.bad.test,ex*ample.test,http://x.test/path,good.test"),
        ]);
        assert_eq!(
            e.mounts(),
            vec![
                key("http://", Some("http://proxy:1")),
                key("all://*good.test", None),
                key("http://*good.test", None),
            ]
        );
    }
}
