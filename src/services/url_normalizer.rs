//! URL Normalizer for Tabshell.
//!
//! Turns raw address-bar or link text into something a surface can load:
//! either a canonical absolute URL or a search-engine query URL. Every call
//! site that accepts typed or link-originated text goes through here.

use url::Url;

/// Search engine origin used when no settings are loaded.
pub const DEFAULT_SEARCH_BASE: &str = "https://www.google.com";

/// Normalizes user input against a configured search engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlNormalizer {
    search_base: String,
}

impl UrlNormalizer {
    /// `search_base` is the engine origin, e.g. `https://duckduckgo.com`.
    pub fn new(search_base: impl Into<String>) -> Self {
        let base: String = search_base.into();
        Self {
            search_base: base.trim_end_matches('/').to_string(),
        }
    }

    /// The page loaded for empty input.
    pub fn homepage(&self) -> &str {
        &self.search_base
    }

    /// Builds `<engine>/search?q=<percent-encoded query>`.
    pub fn search_url(&self, query: &str) -> String {
        format!("{}/search?q={}", self.search_base, urlencoding::encode(query))
    }

    /// Normalizes `input` into a loadable target.
    ///
    /// - empty / whitespace-only → search homepage
    /// - `about:blank` (any case) → `about:blank`
    /// - URL-looking input without whitespace → canonical URL (`https://` assumed)
    /// - anything else, or input the URL parser rejects → search query
    pub fn normalize(&self, input: &str) -> String {
        let raw = input.trim();
        if raw.is_empty() {
            return self.search_base.clone();
        }

        if raw.eq_ignore_ascii_case("about:blank") {
            return "about:blank".to_string();
        }

        if looks_like_url(raw) {
            let candidate = if has_scheme(raw) {
                raw.to_string()
            } else {
                format!("https://{}", raw)
            };
            if let Ok(parsed) = Url::parse(&candidate) {
                return parsed.to_string();
            }
        }

        self.search_url(raw)
    }
}

impl Default for UrlNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_BASE)
    }
}

/// Normalizes `input` with the default search engine.
pub fn normalize(input: &str) -> String {
    UrlNormalizer::default().normalize(input)
}

fn looks_like_url(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    if has_scheme(raw) {
        return true;
    }
    let host = raw.split('/').next().unwrap_or_default();
    is_localhost(host) || is_ipv4(host) || is_ipv6(host) || host.contains('.')
}

/// `scheme://` where scheme is `[A-Za-z][A-Za-z0-9+.-]*`.
fn has_scheme(raw: &str) -> bool {
    let Some(idx) = raw.find("://") else {
        return false;
    };
    let scheme = &raw[..idx];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

/// Splits an optional `:port` suffix; the port must be all digits.
fn split_port(host: &str) -> Option<&str> {
    match host.rsplit_once(':') {
        Some((name, port)) => {
            if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
                Some(name)
            } else {
                None
            }
        }
        None => Some(host),
    }
}

fn is_localhost(host: &str) -> bool {
    split_port(host).is_some_and(|name| name.eq_ignore_ascii_case("localhost"))
}

fn is_ipv4(host: &str) -> bool {
    let Some(addr) = split_port(host) else {
        return false;
    };
    let octets: Vec<&str> = addr.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| (1..=3).contains(&o.len()) && o.chars().all(|c| c.is_ascii_digit()))
}

fn is_ipv6(host: &str) -> bool {
    let Some(rest) = host.strip_prefix('[') else {
        return false;
    };
    let Some((addr, tail)) = rest.split_once(']') else {
        return false;
    };
    let addr_ok = !addr.is_empty() && addr.chars().all(|c| c.is_ascii_hexdigit() || c == ':');
    let tail_ok = tail.is_empty()
        || tail
            .strip_prefix(':')
            .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    addr_ok && tail_ok
}
