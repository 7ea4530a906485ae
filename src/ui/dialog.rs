/// Reminder dialog injected into monitored pages

use yew::prelude::*;

use crate::config::{Prompt, wait_label};
use crate::reminder::format_countdown;
use crate::stats::format_duration;

/// Class of the dialog's host element; its presence marks a live dialog.
pub const DIALOG_CLASS: &str = "focus-reminder";
pub const FADING_CLASS: &str = "focus-reminder--fading";
/// Class of the elapsed-time badge shown after the user chose to continue.
pub const BROWSING_TIMER_CLASS: &str = "browsing-timer";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogAction {
    Wait(u32),
    Skip,
    Leave,
}

#[derive(Properties, PartialEq, Clone)]
pub struct ReminderDialogProps {
    pub prompt: Prompt,
    pub wait_options: Vec<u32>,
    pub allow_skip: bool,
    /// Seconds left once a wait has been chosen.
    #[prop_or_default]
    pub remaining: Option<u32>,
    pub on_action: Callback<DialogAction>,
}

#[function_component(ReminderDialog)]
pub fn reminder_dialog(props: &ReminderDialogProps) -> Html {
    let on_leave = props.on_action.reform(|_: MouseEvent| DialogAction::Leave);
    let on_skip = props.on_action.reform(|_: MouseEvent| DialogAction::Skip);

    html! {
        <div class="focus-reminder-card" role="dialog" aria-modal="true">
            if props.allow_skip && props.remaining.is_none() {
                <button class="close-button" title="Continue" onclick={on_skip.clone()}>{"×"}</button>
            }
            <h2>{&props.prompt.title}</h2>
            <p>{&props.prompt.message}</p>

            {match props.remaining {
                Some(secs) => html! {
                    <div class="focus-reminder-countdown">
                        <span class="focus-reminder-timer">{format_countdown(secs)}</span>
                        <div class="focus-reminder-buttons">
                            <button class="leave" onclick={on_leave}>{"Focus on What Matters"}</button>
                        </div>
                    </div>
                },
                None => html! {
                    <div class="focus-reminder-buttons">
                        {for props.wait_options.iter().map(|secs| {
                            let secs = *secs;
                            html! {
                                <button
                                    key={secs}
                                    class="continue"
                                    onclick={props.on_action.reform(move |_: MouseEvent| DialogAction::Wait(secs))}
                                >
                                    {format!("Wait {}", wait_label(secs))}
                                </button>
                            }
                        })}
                        if props.allow_skip {
                            <button class="skip" onclick={on_skip}>{"Continue Now"}</button>
                        }
                        <button class="leave" onclick={on_leave}>{"Focus on What Matters"}</button>
                    </div>
                },
            }}
        </div>
    }
}

#[derive(Properties, PartialEq, Clone)]
pub struct BrowsingTimerProps {
    /// Foreground seconds since the dialog was dismissed.
    pub elapsed: u64,
}

#[function_component(BrowsingTimer)]
pub fn browsing_timer(props: &BrowsingTimerProps) -> Html {
    html! {
        <span class="browsing-timer-text" title="Time on this site">
            {format_duration(props.elapsed)}
        </span>
    }
}
