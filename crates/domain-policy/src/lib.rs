//! Allowed/prohibited-domain and IP-block evaluation for every navigation
//! (spec §4.3 "Domain policy").
//!
//! No direct teacher counterpart existed for this responsibility (the
//! teacher's `policy-center` crate evaluates scheduler feature-flag
//! snapshots, not navigation targets), so this module is a new design
//! following the snapshot/provenance structuring style of that crate and
//! the `url::Url`-based host handling used across the kept crates.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use url::Url;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DenialReason {
    InvalidUrl,
    MissingHost,
    IpAddressBlocked,
    NotInAllowedDomains,
    InProhibitedDomains,
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DenialReason::InvalidUrl => "invalid_url",
            DenialReason::MissingHost => "missing_host",
            DenialReason::IpAddressBlocked => "ip_address_blocked",
            DenialReason::NotInAllowedDomains => "not_in_allowed_domains",
            DenialReason::InProhibitedDomains => "in_prohibited_domains",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("navigation to url denied: {reason}")]
pub struct UrlNotAllowed {
    pub reason: DenialReason,
}

/// Patterns are exact hosts or `*.suffix` globs; `www.`/non-`www.` variants
/// are matched automatically for exact patterns.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DomainPolicy {
    pub allowed_domains: Vec<String>,
    pub prohibited_domains: Vec<String>,
    pub block_ip_addresses: bool,
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn matches_pattern(host: &str, pattern: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host == suffix || host.ends_with(&format!(".{suffix}"));
    }
    strip_www(host) == strip_www(pattern)
}

fn matches_any(host: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| matches_pattern(host, p))
}

/// Whether `url`'s host matches `pattern` (exact host or `*.suffix` glob,
/// `www.` stripped on both sides). Shared with the sensitive-data
/// domain-pattern matching in `agent-loop` so both sides of the allowlist
/// story use one matching rule.
pub fn url_host_matches(url: &str, pattern: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    matches_pattern(host, pattern)
}

impl DomainPolicy {
    pub fn new(allowed_domains: Vec<String>, prohibited_domains: Vec<String>, block_ip_addresses: bool) -> Self {
        Self {
            allowed_domains,
            prohibited_domains,
            block_ip_addresses,
        }
    }

    /// Evaluates a navigation target. `about:blank`/`about:newtab` are
    /// always allowed; `data:`/`blob:` URLs bypass host checks entirely.
    pub fn evaluate(&self, url: &str) -> Result<(), DenialReason> {
        if url == "about:blank" || url == "about:newtab" {
            return Ok(());
        }

        let parsed = Url::parse(url).map_err(|_| DenialReason::InvalidUrl)?;

        if matches!(parsed.scheme(), "data" | "blob") {
            return Ok(());
        }

        let host = parsed.host_str().ok_or(DenialReason::MissingHost)?;

        if self.block_ip_addresses {
            if host.parse::<IpAddr>().is_ok() {
                return Err(DenialReason::IpAddressBlocked);
            }
        }

        let allowed_match = !self.allowed_domains.is_empty() && matches_any(host, &self.allowed_domains);
        let prohibited_match = matches_any(host, &self.prohibited_domains);

        if allowed_match && prohibited_match {
            warn!(
                target: "domain_policy.conflict",
                host,
                "host matches both allowed and prohibited domain lists; allow-list wins"
            );
        }

        if allowed_match {
            return Ok(());
        }

        if prohibited_match {
            return Err(DenialReason::InProhibitedDomains);
        }

        if !self.allowed_domains.is_empty() {
            return Err(DenialReason::NotInAllowedDomains);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn about_blank_always_allowed() {
        let policy = DomainPolicy::new(vec!["example.org".into()], vec![], false);
        assert_eq!(policy.evaluate("about:blank"), Ok(()));
        assert_eq!(policy.evaluate("about:newtab"), Ok(()));
    }

    #[test]
    fn data_and_blob_bypass_host_checks() {
        let policy = DomainPolicy::new(vec!["example.org".into()], vec![], false);
        assert_eq!(policy.evaluate("data:text/plain,hi"), Ok(()));
    }

    #[test]
    fn glob_pattern_matches_subdomains() {
        let policy = DomainPolicy::new(vec!["*.example.org".into()], vec![], false);
        assert_eq!(policy.evaluate("https://docs.example.org/x"), Ok(()));
        assert_eq!(
            policy.evaluate("https://evil.com"),
            Err(DenialReason::NotInAllowedDomains)
        );
    }

    #[test]
    fn www_variant_matches_exact_pattern() {
        let policy = DomainPolicy::new(vec!["example.org".into()], vec![], false);
        assert_eq!(policy.evaluate("https://www.example.org"), Ok(()));
    }

    #[test]
    fn ip_address_blocked_when_enabled() {
        let policy = DomainPolicy::new(vec![], vec![], true);
        assert_eq!(
            policy.evaluate("http://127.0.0.1/"),
            Err(DenialReason::IpAddressBlocked)
        );
    }

    #[test]
    fn prohibited_domain_denied_without_allow_list() {
        let policy = DomainPolicy::new(vec![], vec!["evil.com".into()], false);
        assert_eq!(
            policy.evaluate("https://evil.com"),
            Err(DenialReason::InProhibitedDomains)
        );
    }

    #[test]
    fn allow_list_wins_on_overlap_with_prohibited() {
        let policy = DomainPolicy::new(vec!["evil.com".into()], vec!["evil.com".into()], false);
        assert_eq!(policy.evaluate("https://evil.com"), Ok(()));
    }

    #[test]
    fn missing_host_denied() {
        let policy = DomainPolicy::new(vec![], vec![], false);
        assert_eq!(policy.evaluate("file:///etc/passwd"), Err(DenialReason::MissingHost));
    }

    #[test]
    fn invalid_url_denied() {
        let policy = DomainPolicy::new(vec![], vec![], false);
        assert_eq!(policy.evaluate("not a url"), Err(DenialReason::InvalidUrl));
    }
}
