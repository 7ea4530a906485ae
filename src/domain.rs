/// Domain normalization and matching for Mindful Moment
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::PageUrlError;
use crate::site_data::{SiteEntry, SiteRegistry};

const WWW_PREFIX: &str = "www.";

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z][a-z0-9-]{0,61}[a-z0-9]$")
        .expect("domain pattern is valid")
});

/// Strip one leading literal `www.` from a hostname.
///
/// The comparison is case-sensitive: `WWW.example.com` is left alone.
///
/// Examples:
/// - `www.youtube.com` → `youtube.com`
/// - `youtube.com` → `youtube.com`
/// - `www.www.a.com` → `www.a.com`
pub fn normalize_domain(host: &str) -> &str {
    host.strip_prefix(WWW_PREFIX).unwrap_or(host)
}

/// Extract the normalized hostname of an http(s) page URL.
pub fn hostname_from_url(raw: &str) -> Result<String, PageUrlError> {
    let url = Url::parse(raw.trim()).map_err(|_| PageUrlError::Invalid {
        url: raw.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(PageUrlError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
        });
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(normalize_domain(host).to_string()),
        _ => Err(PageUrlError::NoHost {
            url: raw.to_string(),
        }),
    }
}

/// Check that user-typed text looks like a hostname worth monitoring.
pub fn is_valid_domain(input: &str) -> bool {
    input.len() <= 253 && DOMAIN_RE.is_match(input)
}

/// How a page domain is compared with a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Normalized domains must be identical.
    #[default]
    Exact,
    /// Either normalized domain contains the other. Over-broad: `x.com`
    /// matches `netflix.com`. Kept only as an opt-in legacy behaviour.
    Substring,
}

impl MatchPolicy {
    /// Compare a page domain with an entry domain. Both are normalized first.
    pub fn matches(self, page: &str, entry: &str) -> bool {
        let page = normalize_domain(page);
        let entry = normalize_domain(entry);
        match self {
            MatchPolicy::Exact => page == entry,
            MatchPolicy::Substring => page.contains(entry) || entry.contains(page),
        }
    }
}

/// Result of checking the current page against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Matched an enabled entry: show the reminder and track time.
    Monitored,
    /// Matched an entry that is switched off.
    Suppressed,
    /// No entry matched (or the registry could not be read).
    NotMonitored,
}

impl MatchOutcome {
    pub fn is_monitored(self) -> bool {
        self == MatchOutcome::Monitored
    }
}

/// First registry entry matching the host, in registry order.
pub fn find_match<'a>(
    registry: &'a SiteRegistry,
    host: &str,
    policy: MatchPolicy,
) -> Option<&'a SiteEntry> {
    registry
        .entries()
        .iter()
        .find(|entry| policy.matches(host, &entry.domain))
}

/// Decide whether reminders apply to the host.
pub fn check_site(registry: &SiteRegistry, host: &str, policy: MatchPolicy) -> MatchOutcome {
    match find_match(registry, host, policy) {
        Some(entry) if entry.enabled => MatchOutcome::Monitored,
        Some(_) => MatchOutcome::Suppressed,
        None => MatchOutcome::NotMonitored,
    }
}
