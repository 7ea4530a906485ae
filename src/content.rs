/// Content-script runtime: one controller per page
///
/// Owns the reminder engine, the time tracker, the mounted dialog, the
/// browsing timer badge and the two one-second timers. Timers are `Interval` handles stored in
/// `Option`s; taking them out and dropping them is how every exit route
/// (resolution, leave, hide, teardown) stops periodic work.
use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element};
use yew::AppHandle;
use yew::html::BaseComponent;

use crate::bridge::{self, ChromeSyncStore};
use crate::config::{Prompt, ReminderConfig, random_index};
use crate::domain::{self, MatchOutcome, normalize_domain};
use crate::messages::Message;
use crate::reminder::{Effect, Phase, ReminderEngine, TickEvent};
use crate::storage;
use crate::timer::{self, Interval};
use crate::tracker::{TimeTracker, TrackerCommand};
use crate::ui::dialog::{
    BROWSING_TIMER_CLASS, BrowsingTimer, BrowsingTimerProps, DIALOG_CLASS, DialogAction,
    FADING_CLASS, ReminderDialog, ReminderDialogProps,
};

const TICK_MS: i32 = 1000;

type SharedPage = Rc<RefCell<PageController>>;

// Every listener and timer holds a `Weak`; this is the one strong reference.
thread_local! {
    static PAGE: RefCell<Option<SharedPage>> = const { RefCell::new(None) };
}

/// A Yew component rendered into its own element at the end of `<body>`.
struct Mounted<C: BaseComponent> {
    host: Element,
    app: AppHandle<C>,
    props: C::Properties,
}

impl<C> Mounted<C>
where
    C: BaseComponent,
    C::Properties: Clone + 'static,
{
    fn mount(document: &Document, class: &str, props: C::Properties) -> Result<Self, JsValue> {
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("page has no body"))?;
        let host = document.create_element("div")?;
        host.set_class_name(class);
        body.append_child(&host)?;

        let app = yew::Renderer::<C>::with_root_and_props(host.clone(), props.clone()).render();
        Ok(Mounted { host, app, props })
    }

    fn update(&mut self, change: impl FnOnce(&mut C::Properties)) {
        change(&mut self.props);
        self.app.update(self.props.clone());
    }

    fn unmount(self) {
        self.app.destroy();
        self.host.remove();
    }

    fn fade_out(self, millis: u32) {
        if let Err(e) = self.host.class_list().add_1(FADING_CLASS) {
            debug!("Could not start fade-out: {:?}", e);
        }
        let host = self.host.clone();
        if timer::set_timeout(millis as i32, move || self.unmount()).is_err() {
            host.remove();
        }
    }
}

pub struct PageController {
    host_name: String,
    engine: ReminderEngine,
    tracker: TimeTracker,
    dialog: Option<Mounted<ReminderDialog>>,
    browsing: Option<Mounted<BrowsingTimer>>,
    countdown: Option<Interval>,
    tracking: Option<Interval>,
}

impl PageController {
    fn new(host_name: String) -> Self {
        PageController {
            host_name,
            engine: ReminderEngine::new(ReminderConfig::default()),
            tracker: TimeTracker::new(),
            dialog: None,
            browsing: None,
            countdown: None,
            tracking: None,
        }
    }

    fn domain(&self) -> &str {
        normalize_domain(&self.host_name)
    }

    /// Stop everything periodic and drop the dialog.
    fn teardown(&mut self) -> u64 {
        self.countdown = None;
        self.tracking = None;
        self.tracker.set_visible(false, js_sys::Date::now());
        let unsaved = self.tracker.settle();
        self.tracker.stop();
        self.engine.abandon();
        if let Some(dialog) = self.dialog.take() {
            dialog.unmount();
        }
        if let Some(badge) = self.browsing.take() {
            badge.unmount();
        }
        unsaved
    }

    /// Add foreground seconds to the browsing timer, if one is showing.
    fn show_elapsed(&mut self, secs: u64) {
        if secs == 0 {
            return;
        }
        if let Some(badge) = self.browsing.as_mut() {
            badge.update(|props| props.elapsed += secs);
        }
    }
}

/// Install the controller on the current page and run the first check.
pub fn install() {
    let Some(window) = web_sys::window() else {
        warn!("No window; reminder not installed");
        return;
    };
    let Some(document) = window.document() else {
        warn!("No document; reminder not installed");
        return;
    };
    let host_name = window.location().hostname().unwrap_or_default();
    if host_name.is_empty() {
        debug!("Page has no hostname; reminder not installed");
        return;
    }

    let page: SharedPage = Rc::new(RefCell::new(PageController::new(host_name)));
    PAGE.with(|slot| *slot.borrow_mut() = Some(page.clone()));

    {
        let page = Rc::downgrade(&page);
        bridge::listen_for_messages(move |message, _| {
            if message == Message::CheckReminder {
                if let Some(page) = page.upgrade() {
                    request_check(&page);
                }
            }
        });
    }

    add_listener(&document, "visibilitychange", &page, |page, _| on_visibility_change(page));
    add_listener(&window, "pagehide", &page, |page, _| on_page_hide(page));
    add_listener(&window, "pageshow", &page, |page, event| {
        // Restored from the back/forward cache after a teardown.
        let persisted = js_sys::Reflect::get(event, &JsValue::from_str("persisted"))
            .map(|v| v.is_truthy())
            .unwrap_or(false);
        if persisted {
            request_check(page);
        }
    });

    if document.ready_state() == "complete" {
        request_check(&page);
    } else {
        add_listener(&window, "load", &page, |page, _| request_check(page));
    }
}

/// Attach a page-lifetime event listener that sees the controller.
fn add_listener(
    target: &web_sys::EventTarget,
    event: &str,
    page: &SharedPage,
    handler: impl Fn(&SharedPage, &web_sys::Event) + 'static,
) {
    let page = Rc::downgrade(page);
    let listener = Closure::wrap(Box::new(move |e: web_sys::Event| {
        if let Some(page) = page.upgrade() {
            handler(&page, &e);
        }
    }) as Box<dyn FnMut(web_sys::Event)>);

    match target.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref()) {
        Ok(()) => listener.forget(),
        Err(e) => warn!("Could not listen for {}: {:?}", event, e),
    }
}

fn document() -> Option<Document> {
    web_sys::window().and_then(|w| w.document())
}

fn dialog_in_document() -> bool {
    document()
        .and_then(|d| d.query_selector(&format!(".{}", DIALOG_CLASS)).ok().flatten())
        .is_some()
}

fn page_visible() -> bool {
    document().map(|d| !d.hidden()).unwrap_or(false)
}

/// Decide whether to show the reminder, at most one dialog at a time.
fn request_check(page: &SharedPage) {
    // Claimed before the storage read so a second trigger backs off.
    if !page.borrow_mut().engine.begin_check(dialog_in_document()) {
        debug!("Reminder check skipped: already {:?}", page.borrow().engine.phase());
        return;
    }

    let page = page.clone();
    spawn_local(async move {
        let store = ChromeSyncStore;
        let config = storage::load_config(&store).await;
        let domain = page.borrow().domain().to_string();

        let outcome = match storage::load_or_initialize(&store, config.default_sites.as_slice()).await {
            Ok(registry) => domain::check_site(&registry, &domain, config.match_policy),
            Err(e) => {
                warn!("Could not read monitored sites: {}", e);
                MatchOutcome::NotMonitored
            }
        };
        debug!("Reminder check for {}: {:?}", domain, outcome);

        conclude_check(&page, config, outcome);
    });
}

/// Finish a check once storage has answered.
fn conclude_check(page: &SharedPage, config: ReminderConfig, outcome: MatchOutcome) {
    let track = outcome.is_monitored() && config.track_time;
    let effect = {
        let mut ctl = page.borrow_mut();
        // Torn down while the read was in flight.
        if ctl.engine.phase() != Phase::Deciding {
            debug!("Reminder check abandoned in {:?}", ctl.engine.phase());
            return;
        }
        ctl.engine.set_config(config);
        ctl.engine.decide(outcome, random_index)
    };

    update_tracking(page, track);
    apply(page, effect);
}

fn dialog_props(page: &SharedPage, prompt: Prompt) -> ReminderDialogProps {
    let weak = Rc::downgrade(page);
    let ctl = page.borrow();
    let config = ctl.engine.config();
    ReminderDialogProps {
        prompt,
        wait_options: config.wait_options.clone(),
        allow_skip: config.allow_skip,
        remaining: None,
        on_action: yew::Callback::from(move |action: DialogAction| {
            if let Some(page) = weak.upgrade() {
                on_dialog_action(&page, action);
            }
        }),
    }
}

fn on_dialog_action(page: &SharedPage, action: DialogAction) {
    let result = {
        let mut ctl = page.borrow_mut();
        match action {
            DialogAction::Wait(secs) => ctl.engine.choose_wait(secs),
            DialogAction::Skip => ctl.engine.skip(),
            DialogAction::Leave => ctl.engine.leave(),
        }
    };
    match result {
        Ok(effect) => apply(page, effect),
        Err(e) => debug!("Ignoring dialog action {:?}: {}", action, e),
    }
}

/// Carry out an engine effect.
fn apply(page: &SharedPage, effect: Effect) {
    match effect {
        Effect::ShowDialog(prompt) => {
            let Some(document) = document() else { return };
            if let Some(badge) = page.borrow_mut().browsing.take() {
                badge.unmount();
            }
            let props = dialog_props(page, prompt);
            match Mounted::<ReminderDialog>::mount(&document, DIALOG_CLASS, props) {
                Ok(dialog) => page.borrow_mut().dialog = Some(dialog),
                Err(e) => {
                    warn!("Could not attach reminder dialog: {:?}", e);
                    page.borrow_mut().engine.abandon();
                }
            }
        }
        Effect::StartCountdown(secs) => {
            let weak = Rc::downgrade(page);
            let interval = Interval::new(TICK_MS, move || {
                if let Some(page) = weak.upgrade() {
                    on_countdown_tick(&page);
                }
            });
            let mut ctl = page.borrow_mut();
            match interval {
                Ok(interval) => ctl.countdown = Some(interval),
                Err(e) => warn!("Could not start countdown: {:?}", e),
            }
            if let Some(dialog) = ctl.dialog.as_mut() {
                dialog.update(|props| props.remaining = Some(secs));
            }
        }
        Effect::Dismiss => {
            {
                let mut ctl = page.borrow_mut();
                ctl.countdown = None;
                let fade_ms = ctl.engine.config().fade_out_ms;
                if let Some(dialog) = ctl.dialog.take() {
                    dialog.fade_out(fade_ms);
                }
            }
            start_browsing_timer(page);
        }
        Effect::CloseTab => {
            let dialog = {
                let mut ctl = page.borrow_mut();
                ctl.countdown = None;
                ctl.dialog.take()
            };
            info!("Leaving {}", page.borrow().domain());
            spawn_local(async move {
                if let Some(dialog) = dialog {
                    dialog.unmount();
                }
                if let Err(e) = bridge::send_to_background(Message::CloseTab).await {
                    warn!("{}", e);
                }
            });
        }
        Effect::Nothing => {}
    }
}

fn on_countdown_tick(page: &SharedPage) {
    let mut ctl = page.borrow_mut();
    match ctl.engine.tick() {
        Some(TickEvent::Tick(remaining)) => {
            if let Some(dialog) = ctl.dialog.as_mut() {
                dialog.update(|props| props.remaining = Some(remaining));
            }
        }
        Some(TickEvent::Finished) => {
            if let Some(interval) = ctl.countdown.take() {
                timer::retire(interval);
            }
            let fade_ms = ctl.engine.config().fade_out_ms;
            if let Some(dialog) = ctl.dialog.take() {
                dialog.fade_out(fade_ms);
            }
            drop(ctl);
            start_browsing_timer(page);
        }
        // Countdown was cancelled but the timer outlived it.
        None => {
            if let Some(interval) = ctl.countdown.take() {
                timer::retire(interval);
            }
        }
    }
}

/// Show elapsed foreground time once the user chose to keep browsing.
///
/// The badge is fed by the tracking interval, so it only exists while time
/// is being tracked for this page.
fn start_browsing_timer(page: &SharedPage) {
    let mut ctl = page.borrow_mut();
    if ctl.browsing.is_some() || !ctl.engine.config().track_time || ctl.tracker.domain().is_none() {
        return;
    }
    let Some(document) = document() else { return };
    match Mounted::<BrowsingTimer>::mount(&document, BROWSING_TIMER_CLASS, BrowsingTimerProps { elapsed: 0 }) {
        Ok(badge) => ctl.browsing = Some(badge),
        Err(e) => warn!("Could not show browsing timer: {:?}", e),
    }
}

fn update_tracking(page: &SharedPage, track: bool) {
    let command = {
        let mut ctl = page.borrow_mut();
        if track {
            let domain = ctl.domain().to_string();
            ctl.tracker.start(&domain, js_sys::Date::now(), page_visible())
        } else {
            ctl.tracker.stop()
        }
    };
    apply_tracker(page, command);
}

fn apply_tracker(page: &SharedPage, command: TrackerCommand) {
    match command {
        TrackerCommand::StartTimer => {
            let weak = Rc::downgrade(page);
            match Interval::new(TICK_MS, move || {
                if let Some(page) = weak.upgrade() {
                    on_tracking_tick(&page);
                }
            }) {
                Ok(interval) => page.borrow_mut().tracking = Some(interval),
                Err(e) => warn!("Could not start time tracking: {:?}", e),
            }
        }
        TrackerCommand::StopTimer => {
            page.borrow_mut().tracking = None;
        }
        TrackerCommand::Nothing => {}
    }
}

fn on_tracking_tick(page: &SharedPage) {
    let (domain, secs) = {
        let mut ctl = page.borrow_mut();
        let secs = ctl.tracker.tick(js_sys::Date::now());
        ctl.show_elapsed(secs);
        (ctl.tracker.domain().map(str::to_string), secs)
    };
    if let Some(domain) = domain {
        credit(domain, secs);
    }
}

fn credit(domain: String, secs: u64) {
    if secs == 0 {
        return;
    }
    spawn_local(async move {
        if let Err(e) = storage::add_time_spent(&ChromeSyncStore, &domain, secs).await {
            warn!("Dropped {}s for {}: {}", secs, domain, e);
        }
    });
}

fn on_visibility_change(page: &SharedPage) {
    let visible = page_visible();
    let (command, settled, domain) = {
        let mut ctl = page.borrow_mut();
        let command = ctl.tracker.set_visible(visible, js_sys::Date::now());
        let settled = if visible { 0 } else { ctl.tracker.settle() };
        ctl.show_elapsed(settled);
        (command, settled, ctl.tracker.domain().map(str::to_string))
    };
    apply_tracker(page, command);
    if let Some(domain) = domain {
        credit(domain, settled);
    }
}

fn on_page_hide(page: &SharedPage) {
    let (domain, unsaved) = {
        let mut ctl = page.borrow_mut();
        let domain = ctl.tracker.domain().map(str::to_string);
        (domain, ctl.teardown())
    };
    if let Some(domain) = domain {
        credit(domain, unsaved);
    }
    debug!("Page hidden; reminder timers stopped");
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use wasm_bindgen_test::*;

    use super::*;
    use crate::reminder::Resolution;

    wasm_bindgen_test_configure!(run_in_browser);

    fn new_page() -> SharedPage {
        Rc::new(RefCell::new(PageController::new("www.youtube.com".to_string())))
    }

    fn untracked() -> ReminderConfig {
        ReminderConfig {
            track_time: false,
            ..ReminderConfig::default()
        }
    }

    fn idle_interval() -> Interval {
        Interval::new(60_000, || {}).unwrap()
    }

    fn show_dialog(page: &SharedPage, config: ReminderConfig) -> Element {
        assert!(page.borrow_mut().engine.begin_check(false));
        conclude_check(page, config, MatchOutcome::Monitored);
        let ctl = page.borrow();
        assert_eq!(ctl.engine.phase(), Phase::SelectionPending);
        ctl.dialog.as_ref().unwrap().host.clone()
    }

    #[wasm_bindgen_test]
    fn dialog_already_in_page_blocks_check() {
        let document = document().unwrap();
        let stray = document.create_element("div").unwrap();
        stray.set_class_name(DIALOG_CLASS);
        document.body().unwrap().append_child(&stray).unwrap();

        let page = new_page();
        request_check(&page);

        assert_eq!(page.borrow().engine.phase(), Phase::Idle);
        stray.remove();
    }

    #[wasm_bindgen_test]
    fn monitored_check_mounts_dialog() {
        let page = new_page();
        let host = show_dialog(&page, untracked());

        assert!(host.is_connected());
        assert_eq!(host.class_name(), DIALOG_CLASS);
        assert!(page.borrow().tracking.is_none());
    }

    #[wasm_bindgen_test]
    fn skip_clears_countdown_and_dialog() {
        let page = new_page();
        show_dialog(&page, untracked());
        page.borrow_mut().countdown = Some(idle_interval());

        let effect = page.borrow_mut().engine.skip().unwrap();
        assert_eq!(effect, Effect::Dismiss);
        apply(&page, effect);

        let ctl = page.borrow();
        assert!(ctl.countdown.is_none());
        assert!(ctl.dialog.is_none());
        // nothing is tracked, so no badge
        assert!(ctl.browsing.is_none());
    }

    #[wasm_bindgen_test]
    fn leave_clears_countdown_and_dialog() {
        let page = new_page();
        show_dialog(&page, untracked());
        let effect = page.borrow_mut().engine.choose_wait(10).unwrap();
        apply(&page, effect);
        assert!(page.borrow().countdown.is_some());

        let effect = page.borrow_mut().engine.leave().unwrap();
        assert_eq!(effect, Effect::CloseTab);
        apply(&page, effect);

        let ctl = page.borrow();
        assert!(ctl.countdown.is_none());
        assert!(ctl.dialog.is_none());
        assert_eq!(ctl.engine.phase(), Phase::Resolved(Resolution::Leave));
    }

    #[wasm_bindgen_test]
    fn page_hide_stops_timers_and_unmounts_dialog() {
        let page = new_page();
        let host = show_dialog(&page, ReminderConfig::default());
        page.borrow_mut().countdown = Some(idle_interval());
        page.borrow_mut().tracking = Some(idle_interval());

        on_page_hide(&page);

        let ctl = page.borrow();
        assert!(ctl.countdown.is_none());
        assert!(ctl.tracking.is_none());
        assert!(ctl.dialog.is_none());
        assert!(!host.is_connected());
        assert!(ctl.tracker.domain().is_none());
    }

    #[wasm_bindgen_test]
    fn check_finishing_after_teardown_does_nothing() {
        let page = new_page();
        assert!(page.borrow_mut().engine.begin_check(false));
        on_page_hide(&page);

        conclude_check(&page, ReminderConfig::default(), MatchOutcome::Monitored);

        let ctl = page.borrow();
        assert!(ctl.tracker.domain().is_none());
        assert!(ctl.tracking.is_none());
        assert!(ctl.dialog.is_none());
        assert_eq!(ctl.engine.phase(), Phase::Resolved(Resolution::Continue));
    }

    #[wasm_bindgen_test]
    fn continuing_shows_browsing_timer_until_page_hide() {
        let page = new_page();
        show_dialog(&page, ReminderConfig::default());

        let effect = page.borrow_mut().engine.skip().unwrap();
        apply(&page, effect);

        let host = {
            let mut ctl = page.borrow_mut();
            ctl.show_elapsed(3);
            ctl.show_elapsed(0);
            let badge = ctl.browsing.as_ref().unwrap();
            assert_eq!(badge.props.elapsed, 3);
            badge.host.clone()
        };
        assert_eq!(host.class_name(), BROWSING_TIMER_CLASS);
        assert!(host.is_connected());

        on_page_hide(&page);

        assert!(page.borrow().browsing.is_none());
        assert!(!host.is_connected());
    }

    #[wasm_bindgen_test]
    fn new_dialog_replaces_browsing_timer() {
        let page = new_page();
        show_dialog(&page, ReminderConfig::default());
        let effect = page.borrow_mut().engine.skip().unwrap();
        apply(&page, effect);
        let badge = page.borrow().browsing.as_ref().unwrap().host.clone();

        show_dialog(&page, ReminderConfig::default());

        assert!(page.borrow().browsing.is_none());
        assert!(!badge.is_connected());
        on_page_hide(&page);
    }
}
