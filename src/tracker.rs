/// Foreground time accounting for monitored sites
///
/// Time is measured from timestamps rather than counted in ticks, so a
/// partial second before the page is hidden is carried over and completed
/// after it comes back. Hidden spans are never measured.
#[derive(Debug, Clone, Default)]
pub struct TimeTracker {
    domain: Option<String>,
    /// Start of the current foreground span, in milliseconds.
    visible_since: Option<f64>,
    /// Foreground milliseconds not yet credited as whole seconds.
    carry_ms: f64,
}

/// What the page runtime must do with the one-second tracking timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerCommand {
    StartTimer,
    StopTimer,
    Nothing,
}

impl TimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// True while foreground time is being measured.
    pub fn is_active(&self) -> bool {
        self.domain.is_some() && self.visible_since.is_some()
    }

    /// Begin tracking a monitored domain.
    pub fn start(&mut self, domain: &str, now_ms: f64, visible: bool) -> TrackerCommand {
        if self.domain.as_deref() == Some(domain) {
            return TrackerCommand::Nothing;
        }
        self.domain = Some(domain.to_string());
        self.carry_ms = 0.0;
        self.visible_since = None;
        if visible {
            self.visible_since = Some(now_ms);
            TrackerCommand::StartTimer
        } else {
            TrackerCommand::Nothing
        }
    }

    /// React to a visibility change.
    pub fn set_visible(&mut self, visible: bool, now_ms: f64) -> TrackerCommand {
        if self.domain.is_none() {
            return TrackerCommand::Nothing;
        }
        match (visible, self.visible_since) {
            (true, None) => {
                self.visible_since = Some(now_ms);
                TrackerCommand::StartTimer
            }
            (false, Some(since)) => {
                self.carry_ms += (now_ms - since).max(0.0);
                self.visible_since = None;
                TrackerCommand::StopTimer
            }
            _ => TrackerCommand::Nothing,
        }
    }

    /// Whole seconds to credit since the last tick.
    pub fn tick(&mut self, now_ms: f64) -> u64 {
        let Some(since) = self.visible_since else {
            return 0;
        };
        if self.domain.is_none() {
            return 0;
        }
        self.carry_ms += (now_ms - since).max(0.0);
        self.visible_since = Some(now_ms);
        self.settle()
    }

    /// Take the whole seconds measured so far, keeping the fraction.
    ///
    /// Called after hiding so time measured before the page goes to the
    /// background is credited even if it never comes back.
    pub fn settle(&mut self) -> u64 {
        let whole = (self.carry_ms / 1000.0).floor();
        self.carry_ms -= whole * 1000.0;
        whole as u64
    }

    /// Stop for good. Uncredited partial time is dropped.
    pub fn stop(&mut self) -> TrackerCommand {
        let was_running = self.visible_since.is_some();
        *self = TimeTracker::default();
        if was_running {
            TrackerCommand::StopTimer
        } else {
            TrackerCommand::Nothing
        }
    }
}
