/// Reminder configuration
///
/// One struct replaces the per-revision variants of the dialog: which
/// prompts to show, which waits to offer, whether the user may continue
/// without waiting, and whether time is tracked. Every field has a default,
/// so a partial override stored under `reminderSettings` is enough.
use serde::{Deserialize, Serialize};

use crate::domain::MatchPolicy;
use crate::site_data::DEFAULT_SITES;

/// Text shown in the reminder dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub title: String,
    pub message: String,
}

impl Prompt {
    pub fn new(title: &str, message: &str) -> Prompt {
        Prompt {
            title: title.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReminderConfig {
    pub prompts: Vec<Prompt>,
    /// Offered waits in seconds.
    pub wait_options: Vec<u32>,
    /// Offer "continue without waiting".
    pub allow_skip: bool,
    pub track_time: bool,
    pub match_policy: MatchPolicy,
    /// Written to storage the first time the site list is found empty.
    pub default_sites: Vec<String>,
    pub fade_out_ms: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        ReminderConfig {
            prompts: default_prompts(),
            wait_options: vec![10, 30, 60, 300],
            allow_skip: true,
            track_time: true,
            match_policy: MatchPolicy::Exact,
            default_sites: DEFAULT_SITES.iter().map(|s| s.to_string()).collect(),
            fade_out_ms: 300,
        }
    }
}

fn default_prompts() -> Vec<Prompt> {
    vec![
        Prompt::new("Mindful Moment", "Are you spending your time intentionally?"),
        Prompt::new("Pause", "Is this what you meant to do right now?"),
        Prompt::new("Quick check-in", "Will you be glad you spent the next few minutes here?"),
    ]
}

impl ReminderConfig {
    /// Clean up user-supplied overrides.
    ///
    /// Zero waits are dropped, waits are sorted and deduplicated, and empty
    /// lists fall back to their defaults.
    pub fn validated(mut self) -> Self {
        let defaults = ReminderConfig::default();

        self.prompts
            .retain(|p| !p.title.trim().is_empty() || !p.message.trim().is_empty());
        if self.prompts.is_empty() {
            self.prompts = defaults.prompts;
        }

        self.wait_options.retain(|secs| *secs > 0);
        self.wait_options.sort_unstable();
        self.wait_options.dedup();
        if self.wait_options.is_empty() {
            self.wait_options = defaults.wait_options;
        }

        self.default_sites.retain(|site| !site.trim().is_empty());
        if self.default_sites.is_empty() {
            self.default_sites = defaults.default_sites;
        }

        self
    }

    pub fn offers_wait(&self, secs: u32) -> bool {
        self.wait_options.contains(&secs)
    }
}

/// Uniformly pick an index below `len` from the browser's CSPRNG.
///
/// Falls back to the first index if randomness is unavailable.
pub fn random_index(len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => (u64::from_le_bytes(buf) % len as u64) as usize,
        Err(e) => {
            log::warn!("Random source unavailable: {}", e);
            0
        }
    }
}

/// Label for a wait option, e.g. `30 sec`, `5 min`, `1 min 30 sec`.
pub fn wait_label(secs: u32) -> String {
    match (secs / 60, secs % 60) {
        (0, s) => format!("{} sec", s),
        (m, 0) => format!("{} min", m),
        (m, s) => format!("{} min {} sec", m, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReminderConfig::default();
        assert_eq!(config.match_policy, MatchPolicy::Exact);
        assert!(!config.prompts.is_empty());
        assert_eq!(config.default_sites.len(), DEFAULT_SITES.len());
        assert!(config.offers_wait(30));
        assert!(!config.offers_wait(31));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config: ReminderConfig =
            serde_json::from_str(r#"{"trackTime": false, "matchPolicy": "substring"}"#).unwrap();

        assert!(!config.track_time);
        assert_eq!(config.match_policy, MatchPolicy::Substring);
        assert_eq!(config.wait_options, ReminderConfig::default().wait_options);
        assert!(config.allow_skip);
    }

    #[test]
    fn test_validated_falls_back_on_empty_lists() {
        let config = ReminderConfig {
            prompts: vec![Prompt::new(" ", "")],
            wait_options: vec![0],
            default_sites: vec![],
            ..ReminderConfig::default()
        }
        .validated();

        assert_eq!(config, ReminderConfig::default());
    }

    #[test]
    fn test_validated_sorts_waits() {
        let config = ReminderConfig {
            wait_options: vec![300, 10, 0, 10, 60],
            ..ReminderConfig::default()
        }
        .validated();

        assert_eq!(config.wait_options, vec![10, 60, 300]);
    }

    #[test]
    fn test_random_index_in_range() {
        assert_eq!(random_index(0), 0);
        assert_eq!(random_index(1), 0);
        for _ in 0..100 {
            assert!(random_index(3) < 3);
        }
    }

    #[test]
    fn test_wait_label() {
        assert_eq!(wait_label(10), "10 sec");
        assert_eq!(wait_label(300), "5 min");
        assert_eq!(wait_label(90), "1 min 30 sec");
    }
}
