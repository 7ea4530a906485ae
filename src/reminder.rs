/// Reminder engine.
///
/// A per-page state machine with no timers of its own: the page runtime
/// calls `tick()` once per second while a countdown runs and carries out
/// the returned effects (closing the tab, removing the dialog).
///
/// ## State Transitions
///
/// ```text
/// Idle -> Deciding -> Suppressed
///                  -> SelectionPending -> CountingDown -> Resolved(Continue)
///                     SelectionPending -> Resolved(Continue)        (skip)
///        SelectionPending | CountingDown -> Resolved(Leave)         (leave)
/// ```
///
/// `Suppressed` and `Resolved` accept a new check, so the popup can ask a
/// page to re-check after the dialog is gone.

use crate::config::{Prompt, ReminderConfig};
use crate::domain::MatchOutcome;
use crate::error::ReminderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The user waited out the countdown or skipped it.
    Continue,
    /// The user asked for the tab to be closed.
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Storage lookup in flight. Blocks concurrent checks.
    Deciding,
    Suppressed,
    SelectionPending,
    CountingDown,
    Resolved(Resolution),
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Deciding => "deciding",
            Phase::Suppressed => "suppressed",
            Phase::SelectionPending => "waiting for a choice",
            Phase::CountingDown => "counting down",
            Phase::Resolved(_) => "resolved",
        }
    }

    /// A dialog is on screen in these phases.
    pub fn is_showing(self) -> bool {
        matches!(self, Phase::SelectionPending | Phase::CountingDown)
    }
}

/// What the page runtime must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Attach the dialog showing this prompt.
    ShowDialog(Prompt),
    /// Start the one-second countdown timer.
    StartCountdown(u32),
    /// Stop any countdown and remove the dialog, fading it out.
    Dismiss,
    /// Stop any countdown, remove the dialog, and ask for the tab to close.
    CloseTab,
    Nothing,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    Tick(u32),
    Finished,
}

#[derive(Debug, Clone)]
pub struct ReminderEngine {
    config: ReminderConfig,
    phase: Phase,
    seconds_remaining: u32,
    prompt: Option<Prompt>,
}

impl ReminderEngine {
    pub fn new(config: ReminderConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            seconds_remaining: 0,
            prompt: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    /// Replace the configuration. Only takes effect for the next dialog.
    pub fn set_config(&mut self, config: ReminderConfig) {
        self.config = config;
    }

    /// Claim the page for a reminder check.
    ///
    /// Must run synchronously before any storage read: a second trigger
    /// arriving while the first is still deciding sees `Deciding` and backs
    /// off. Returns false if a check is in flight or a dialog is present.
    pub fn begin_check(&mut self, dialog_present: bool) -> bool {
        if dialog_present {
            return false;
        }
        match self.phase {
            Phase::Idle | Phase::Suppressed | Phase::Resolved(_) => {
                self.phase = Phase::Deciding;
                self.seconds_remaining = 0;
                self.prompt = None;
                true
            }
            Phase::Deciding | Phase::SelectionPending | Phase::CountingDown => false,
        }
    }

    /// Finish a check with the matcher's verdict.
    ///
    /// `pick` receives the number of prompts and returns the index to show.
    pub fn decide(&mut self, outcome: MatchOutcome, pick: impl FnOnce(usize) -> usize) -> Effect {
        if self.phase != Phase::Deciding {
            return Effect::Nothing;
        }
        if !outcome.is_monitored() {
            self.phase = Phase::Suppressed;
            return Effect::Nothing;
        }

        let prompts = &self.config.prompts;
        let Some(prompt) = prompts.get(pick(prompts.len()).min(prompts.len().saturating_sub(1)))
        else {
            // empty prompt pool
            self.phase = Phase::Suppressed;
            return Effect::Nothing;
        };
        let prompt = prompt.clone();
        self.prompt = Some(prompt.clone());
        self.phase = Phase::SelectionPending;
        Effect::ShowDialog(prompt)
    }

    /// Start waiting `secs` seconds before the dialog goes away.
    pub fn choose_wait(&mut self, secs: u32) -> Result<Effect, ReminderError> {
        self.expect_phase("choose a wait", Phase::SelectionPending)?;
        if !self.config.offers_wait(secs) {
            return Err(ReminderError::WaitNotOffered(secs));
        }
        self.seconds_remaining = secs;
        self.phase = Phase::CountingDown;
        Ok(Effect::StartCountdown(secs))
    }

    /// Continue browsing without a countdown.
    pub fn skip(&mut self) -> Result<Effect, ReminderError> {
        self.expect_phase("skip", Phase::SelectionPending)?;
        if !self.config.allow_skip {
            return Err(ReminderError::SkipDisabled);
        }
        self.phase = Phase::Resolved(Resolution::Continue);
        Ok(Effect::Dismiss)
    }

    /// Give up on the page. Cancels any countdown.
    pub fn leave(&mut self) -> Result<Effect, ReminderError> {
        if !self.phase.is_showing() {
            return Err(self.invalid("leave"));
        }
        self.seconds_remaining = 0;
        self.phase = Phase::Resolved(Resolution::Leave);
        Ok(Effect::CloseTab)
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `None` outside `CountingDown`, so a tick that fires after
    /// the countdown was cancelled does nothing.
    pub fn tick(&mut self) -> Option<TickEvent> {
        if self.phase != Phase::CountingDown {
            return None;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            self.phase = Phase::Resolved(Resolution::Continue);
            Some(TickEvent::Finished)
        } else {
            Some(TickEvent::Tick(self.seconds_remaining))
        }
    }

    /// The dialog vanished without a user action (page teardown, removed
    /// from the DOM by the site). Resolves so a later check may run again.
    pub fn abandon(&mut self) {
        if self.phase.is_showing() || self.phase == Phase::Deciding {
            self.seconds_remaining = 0;
            self.phase = Phase::Resolved(Resolution::Continue);
        }
    }

    fn expect_phase(&self, action: &'static str, phase: Phase) -> Result<(), ReminderError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> ReminderError {
        ReminderError::InvalidTransition {
            action,
            phase: self.phase.name(),
        }
    }
}

/// Countdown text as `MM:SS`, e.g. `04:30`.
pub fn format_countdown(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
