// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request header policy
//!
//! Bare library user-agents get blocked or served degraded markup by many
//! hosts, so every fetch goes out with a realistic desktop-browser header
//! set. A small host-keyed rule table layers extra headers on top for
//! domains that also check navigation context.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION,
    REFERER, USER_AGENT,
};
use url::Url;

/// Realistic browser User-Agent to avoid being blocked
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// Header overrides for one domain and its subdomains
#[derive(Debug, Clone)]
pub struct DomainHeaderRule {
    /// Registrable domain this rule applies to, lowercase
    pub domain: String,
    /// Send a referer pointing at the site's own root
    pub referer_site_root: bool,
    /// Additional static headers layered over the defaults
    pub headers: Vec<(String, String)>,
}

impl DomainHeaderRule {
    /// Rule for `domain` and any subdomain of it
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_lowercase(),
            referer_site_root: false,
            headers: Vec::new(),
        }
    }

    /// Send `referer: <scheme>://<host>/` with requests to this domain
    pub fn with_site_root_referer(mut self) -> Self {
        self.referer_site_root = true;
        self
    }

    /// Add a static header override
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn matches(&self, host: &str) -> bool {
        host == self.domain || host.ends_with(&format!(".{}", self.domain))
    }
}

/// Computes the outgoing header set for a URL
///
/// Pure lookup over an immutable rule table; unparsable URLs get the
/// default set unmodified.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    rules: Vec<DomainHeaderRule>,
}

impl HeaderPolicy {
    /// Policy with the built-in rule table
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    /// Add a rule, keeping the built-ins
    pub fn with_rule(mut self, rule: DomainHeaderRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Headers to send when fetching `url`
    pub fn headers_for(&self, url: &str) -> HeaderMap {
        let mut headers = default_headers();

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return headers,
        };
        let host = match parsed.host_str() {
            Some(host) => host.to_lowercase(),
            None => return headers,
        };

        for rule in self.rules.iter().filter(|r| r.matches(&host)) {
            if rule.referer_site_root {
                // Url::port() already omits scheme-default ports
                let root = match parsed.port() {
                    Some(port) => format!("{}://{}:{}/", parsed.scheme(), host, port),
                    None => format!("{}://{}/", parsed.scheme(), host),
                };
                if let Ok(value) = HeaderValue::from_str(&root) {
                    headers.insert(REFERER, value);
                }
            }
            for (name, value) in &rule.headers {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    headers.insert(name, value);
                }
            }
        }

        headers
    }
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(DEFAULT_ACCEPT_ENCODING));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers
}

/// Hosts known to reject requests without navigation-shaped headers
fn builtin_rules() -> Vec<DomainHeaderRule> {
    vec![
        DomainHeaderRule::new("reuters.com")
            .with_site_root_referer()
            .with_header("sec-fetch-site", "same-origin")
            .with_header("sec-fetch-mode", "navigate")
            .with_header("sec-fetch-dest", "document"),
        DomainHeaderRule::new("bloomberg.com")
            .with_site_root_referer()
            .with_header("sec-fetch-site", "same-origin")
            .with_header("sec-fetch-mode", "navigate")
            .with_header("sec-fetch-dest", "document"),
        DomainHeaderRule::new("ft.com").with_site_root_referer(),
        DomainHeaderRule::new("wsj.com")
            .with_site_root_referer()
            .with_header(
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers_present() {
        let policy = HeaderPolicy::new();
        let headers = policy.headers_for("https://example.com/page");

        assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
        assert_eq!(headers.get(ACCEPT).unwrap(), DEFAULT_ACCEPT);
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), DEFAULT_ACCEPT_LANGUAGE);
        assert_eq!(headers.get(ACCEPT_ENCODING).unwrap(), DEFAULT_ACCEPT_ENCODING);
        assert_eq!(headers.get(CONNECTION).unwrap(), "keep-alive");
        assert_eq!(headers.get("upgrade-insecure-requests").unwrap(), "1");
    }

    #[test]
    fn test_no_rule_means_no_referer() {
        let policy = HeaderPolicy::new();
        let headers = policy.headers_for("https://example.com/page");
        assert!(headers.get(REFERER).is_none());
    }

    #[test]
    fn test_builtin_rule_adds_site_root_referer() {
        let policy = HeaderPolicy::new();
        let headers = policy.headers_for("https://www.reuters.com/world/some-story/");

        assert_eq!(headers.get(REFERER).unwrap(), "https://www.reuters.com/");
        assert_eq!(headers.get("sec-fetch-site").unwrap(), "same-origin");
        assert_eq!(headers.get("sec-fetch-mode").unwrap(), "navigate");
        // defaults survive the overlay
        assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_rule_matches_domain_and_subdomains_only() {
        let rule = DomainHeaderRule::new("reuters.com");
        assert!(rule.matches("reuters.com"));
        assert!(rule.matches("www.reuters.com"));
        assert!(rule.matches("live.markets.reuters.com"));
        assert!(!rule.matches("notreuters.com"));
        assert!(!rule.matches("reuters.com.evil.example"));
    }

    #[test]
    fn test_rule_can_override_accept() {
        let policy = HeaderPolicy::new();
        let headers = policy.headers_for("https://www.wsj.com/articles/x");
        let accept = headers.get(ACCEPT).unwrap().to_str().unwrap();
        assert!(!accept.contains("image/avif"));
    }

    #[test]
    fn test_custom_rule_applies() {
        let policy = HeaderPolicy::new().with_rule(
            DomainHeaderRule::new("intranet.example")
                .with_site_root_referer()
                .with_header("x-requested-with", "extract-node"),
        );
        let headers = policy.headers_for("http://docs.intranet.example/wiki");

        assert_eq!(headers.get(REFERER).unwrap(), "http://docs.intranet.example/");
        assert_eq!(headers.get("x-requested-with").unwrap(), "extract-node");
    }

    #[test]
    fn test_site_root_referer_keeps_explicit_port() {
        let policy = HeaderPolicy::new()
            .with_rule(DomainHeaderRule::new("intranet.example").with_site_root_referer());
        let headers = policy.headers_for("http://docs.intranet.example:8080/wiki/page");

        assert_eq!(headers.get(REFERER).unwrap(), "http://docs.intranet.example:8080/");
    }

    #[test]
    fn test_site_root_referer_drops_default_port() {
        let policy = HeaderPolicy::new();
        // :443 is normalized away at parse time
        let headers = policy.headers_for("https://www.reuters.com:443/world/");

        assert_eq!(headers.get(REFERER).unwrap(), "https://www.reuters.com/");
    }

    #[test]
    fn test_unparsable_url_gets_defaults() {
        let policy = HeaderPolicy::new();
        let headers = policy.headers_for("not a url at all");

        assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
        assert!(headers.get(REFERER).is_none());
    }

    #[test]
    fn test_host_matching_is_case_insensitive() {
        let policy = HeaderPolicy::new();
        let headers = policy.headers_for("https://WWW.REUTERS.COM/technology/");
        assert!(headers.get(REFERER).is_some());
    }
}
