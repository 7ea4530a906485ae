/// Data structures for Mindful Moment
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::normalize_domain;

/// Sites monitored on a fresh install.
pub const DEFAULT_SITES: &[&str] = &[
    "youtube.com",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "facebook.com",
];

/// A monitored site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteEntry {
    pub domain: String,
    pub enabled: bool,
}

impl SiteEntry {
    pub fn new(domain: &str, enabled: bool) -> SiteEntry {
        SiteEntry {
            domain: normalize_domain(domain).to_string(),
            enabled,
        }
    }
}

/// Ordered list of monitored sites, stored as a plain JSON array.
///
/// Duplicate domains are tolerated when read back from storage; lookups
/// always use the first entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SiteRegistry {
    entries: Vec<SiteEntry>,
}

impl SiteRegistry {
    pub fn from_entries(entries: Vec<SiteEntry>) -> Self {
        SiteRegistry { entries }
    }

    /// Registry holding every given domain, all enabled.
    pub fn with_defaults<S: AsRef<str>>(domains: &[S]) -> Self {
        SiteRegistry {
            entries: domains
                .iter()
                .map(|domain| SiteEntry::new(domain.as_ref(), true))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[SiteEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        self.entries
            .iter()
            .any(|entry| normalize_domain(&entry.domain) == domain)
    }

    /// Append a new enabled entry. Returns false if the domain is already listed.
    pub fn add(&mut self, domain: &str) -> bool {
        if domain.is_empty() || self.contains(domain) {
            return false;
        }
        self.entries.push(SiteEntry::new(domain, true));
        true
    }

    /// Remove every entry for the domain.
    pub fn remove(&mut self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        let original_len = self.entries.len();
        self.entries
            .retain(|entry| normalize_domain(&entry.domain) != domain);
        self.entries.len() < original_len
    }

    /// Switch every entry for the domain on or off. Returns true if any entry changed.
    pub fn set_enabled(&mut self, domain: &str, enabled: bool) -> bool {
        let domain = normalize_domain(domain);
        let mut changed = false;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| normalize_domain(&entry.domain) == domain)
        {
            changed |= entry.enabled != enabled;
            entry.enabled = enabled;
        }
        changed
    }

    pub fn reset_to_defaults<S: AsRef<str>>(&mut self, domains: &[S]) {
        *self = SiteRegistry::with_defaults(domains);
    }
}

/// Accumulated seconds per normalized domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TimeSpent {
    seconds: BTreeMap<String, u64>,
}

impl TimeSpent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, domain: &str, secs: u64) {
        let total = self
            .seconds
            .entry(normalize_domain(domain).to_string())
            .or_insert(0);
        *total = total.saturating_add(secs);
    }

    pub fn get(&self, domain: &str) -> u64 {
        self.seconds
            .get(normalize_domain(domain))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.seconds
            .values()
            .fold(0u64, |acc, secs| acc.saturating_add(*secs))
    }

    pub fn reset(&mut self) {
        self.seconds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.seconds.iter().map(|(domain, secs)| (domain.as_str(), *secs))
    }
}
