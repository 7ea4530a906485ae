/// Error types for Mindful Moment.
///
/// None of these are fatal: every caller degrades to "do nothing this
/// cycle" and at most shows transient status text.

use thiserror::Error;

/// Failures talking to the synced key-value store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The host store rejected the call or is not reachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored value exists but does not have the expected shape.
    #[error("malformed value under '{key}': {message}")]
    Malformed { key: String, message: String },

    /// A value could not be converted for writing.
    #[error("failed to serialize value for '{key}': {message}")]
    Serialize { key: String, message: String },
}

/// Failures turning a tab URL into a page hostname.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageUrlError {
    #[error("invalid page url '{url}'")]
    Invalid { url: String },

    #[error("page url '{url}' has no host")]
    NoHost { url: String },

    #[error("unsupported url scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },
}

/// A user action that the reminder dialog cannot accept in its current phase.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReminderError {
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    #[error("a wait of {0}s is not one of the offered options")]
    WaitNotOffered(u32),

    #[error("continuing without waiting is disabled")]
    SkipDisabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StoreError::Malformed {
            key: "sites".to_string(),
            message: "expected a sequence".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed value under 'sites': expected a sequence"
        );

        let err = ReminderError::InvalidTransition {
            action: "leave",
            phase: "idle",
        };
        assert_eq!(err.to_string(), "cannot leave while idle");
    }
}
