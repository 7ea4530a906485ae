/// Popup UI for Mindful Moment

use log::{info, warn};
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::bridge::{self, ChromeSyncStore};
use crate::config::ReminderConfig;
use crate::domain::{hostname_from_url, is_valid_domain, normalize_domain};
use crate::messages::Message;
use crate::site_data::{SiteRegistry, TimeSpent};
use crate::stats::{format_duration, percent_of, top_sites};
use crate::storage;
use crate::timer;
use crate::ui::components::{SiteRow, Status, StatusLine, UsageBar};

const STATUS_MS: i32 = 2000;
const TOP_SITES: usize = 10;

#[derive(Clone, PartialEq)]
enum AppState {
    Loading(String),
    Idle,
    Error(String),
}

#[derive(Clone, PartialEq)]
enum ActiveTab {
    Sites,
    Statistics,
}

/// What the popup knows about the tab it was opened over.
#[derive(Clone, Debug, PartialEq)]
enum ActiveSite {
    Loading,
    Page { tab_id: i32, domain: String },
    Invalid,
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Loading("Loading sites...".to_string()));
    let config = use_state(ReminderConfig::default);
    let sites = use_state(SiteRegistry::default);
    let time_spent = use_state(TimeSpent::new);
    let active_site = use_state(|| ActiveSite::Loading);
    let active_tab = use_state(|| ActiveTab::Sites);
    let manual_input = use_state(String::new);
    let status = use_state(|| None::<Status>);
    let status_seq = use_mut_ref(|| 0u32);

    // Show a status line that clears itself unless replaced first
    let show_status = {
        let status = status.clone();
        let status_seq = status_seq.clone();
        Callback::from(move |(message, is_error): (String, bool)| {
            let id = {
                let mut seq = status_seq.borrow_mut();
                *seq = seq.wrapping_add(1);
                *seq
            };
            status.set(Some(Status { message, is_error }));

            let status = status.clone();
            let status_seq = status_seq.clone();
            let cleared = timer::set_timeout(STATUS_MS, move || {
                if status_is_current(*status_seq.borrow(), id) {
                    status.set(None);
                }
            });
            if let Err(e) = cleared {
                warn!("Could not schedule status clear: {:?}", e);
            }
        })
    };

    // Load everything on mount and ask the page to re-check its reminder
    {
        let state = state.clone();
        let config = config.clone();
        let sites = sites.clone();
        let time_spent = time_spent.clone();
        let active_site = active_site.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                let store = ChromeSyncStore;
                let loaded_config = storage::load_config(&store).await;

                match storage::load_or_initialize(&store, loaded_config.default_sites.as_slice()).await {
                    Ok(registry) => {
                        sites.set(registry);
                        state.set(AppState::Idle);
                    }
                    Err(e) => state.set(AppState::Error(format!("Failed to load sites: {}", e))),
                }
                match storage::load_time_spent(&store).await {
                    Ok(loaded) => time_spent.set(loaded),
                    Err(e) => warn!("Failed to load statistics: {}", e),
                }
                config.set(loaded_config);

                let site = current_site().await;
                if let ActiveSite::Page { tab_id, .. } = &site {
                    // Pages without our content script reject this; that is fine.
                    let _ = bridge::send_to_tab(*tab_id, Message::CheckReminder).await;
                }
                active_site.set(site);
            });
            || ()
        });
    }

    // Toggle a site on or off
    let on_toggle = {
        let config = config.clone();
        let sites = sites.clone();
        let active_site = active_site.clone();
        let show_status = show_status.clone();

        Callback::from(move |(domain, enabled): (String, bool)| {
            let defaults = config.default_sites.clone();
            let sites = sites.clone();
            let active_site = (*active_site).clone();
            let show_status = show_status.clone();

            spawn_local(async move {
                match update_registry(&defaults, |registry| registry.set_enabled(&domain, enabled)).await {
                    Ok((registry, _)) => {
                        sites.set(registry);
                        let message = if enabled { "Site enabled" } else { "Site disabled" };
                        show_status.emit((message.to_string(), false));

                        // Reload the page under the popup so the change shows at once
                        if let Some(tab_id) = tab_to_reload(&active_site, &domain) {
                            if let Err(e) = bridge::reload_tab(tab_id).await {
                                warn!("{}", e);
                            }
                        }
                    }
                    Err(e) => show_status.emit((e, true)),
                }
            });
        })
    };

    // Remove a site
    let on_delete = {
        let config = config.clone();
        let sites = sites.clone();
        let show_status = show_status.clone();

        Callback::from(move |domain: String| {
            let defaults = config.default_sites.clone();
            let sites = sites.clone();
            let show_status = show_status.clone();

            spawn_local(async move {
                match update_registry(&defaults, |registry| registry.remove(&domain)).await {
                    Ok((registry, _)) => {
                        info!("Removed {}", domain);
                        sites.set(registry);
                        show_status.emit(("Site removed".to_string(), false));
                    }
                    Err(e) => show_status.emit((e, true)),
                }
            });
        })
    };

    // Add a site (current page or typed)
    let add_site = {
        let config = config.clone();
        let sites = sites.clone();
        let show_status = show_status.clone();

        Callback::from(move |domain: String| {
            let defaults = config.default_sites.clone();
            let sites = sites.clone();
            let show_status = show_status.clone();

            spawn_local(async move {
                match update_registry(&defaults, |registry| registry.add(&domain)).await {
                    Ok((registry, true)) => {
                        info!("Added {}", domain);
                        sites.set(registry);
                        show_status.emit(("Site added".to_string(), false));
                    }
                    Ok((registry, false)) => {
                        sites.set(registry);
                        show_status.emit(("Already added".to_string(), true));
                    }
                    Err(e) => show_status.emit((e, true)),
                }
            });
        })
    };

    let on_restore_defaults = {
        let config = config.clone();
        let sites = sites.clone();
        let show_status = show_status.clone();

        Callback::from(move |_| {
            let defaults = config.default_sites.clone();
            let sites = sites.clone();
            let show_status = show_status.clone();

            spawn_local(async move {
                let restore = |registry: &mut SiteRegistry| {
                    registry.reset_to_defaults(&defaults);
                    true
                };
                match update_registry(&defaults, restore).await {
                    Ok((registry, _)) => {
                        info!("Site list restored to defaults");
                        sites.set(registry);
                        show_status.emit(("Default sites restored".to_string(), false));
                    }
                    Err(e) => show_status.emit((e, true)),
                }
            });
        })
    };

    let on_add_current = {
        let active_site = active_site.clone();
        let add_site = add_site.clone();

        Callback::from(move |_| {
            if let ActiveSite::Page { domain, .. } = &*active_site {
                add_site.emit(domain.clone());
            }
        })
    };

    let on_manual_input = {
        let manual_input = manual_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                manual_input.set(input.value());
            }
        })
    };

    let on_add_manual = {
        let manual_input = manual_input.clone();
        let add_site = add_site.clone();
        let show_status = show_status.clone();

        Callback::from(move |_| match parse_manual_domain(&manual_input) {
            Some(domain) => {
                add_site.emit(domain);
                manual_input.set(String::new());
            }
            None => show_status.emit(("Enter a domain like example.com".to_string(), true)),
        })
    };

    // Statistics
    let on_refresh_stats = {
        let time_spent = time_spent.clone();
        let show_status = show_status.clone();

        Callback::from(move |_| {
            let time_spent = time_spent.clone();
            let show_status = show_status.clone();

            spawn_local(async move {
                match storage::load_time_spent(&ChromeSyncStore).await {
                    Ok(loaded) => time_spent.set(loaded),
                    Err(e) => show_status.emit((format!("Failed to load statistics: {}", e), true)),
                }
            });
        })
    };

    let on_reset_stats = {
        let time_spent = time_spent.clone();
        let show_status = show_status.clone();

        Callback::from(move |_| {
            let time_spent = time_spent.clone();
            let show_status = show_status.clone();

            spawn_local(async move {
                match storage::reset_time_spent(&ChromeSyncStore).await {
                    Ok(()) => {
                        info!("Statistics reset");
                        time_spent.set(TimeSpent::new());
                        show_status.emit(("Statistics reset".to_string(), false));
                    }
                    Err(e) => show_status.emit((format!("Failed to reset: {}", e), true)),
                }
            });
        })
    };

    let is_busy = !matches!(*state, AppState::Idle);
    let add_button = add_button_state(&active_site, &sites);

    // Tab click handlers
    let on_tab_click = {
        let active_tab = active_tab.clone();
        let on_refresh_stats = on_refresh_stats.clone();
        move |tab: ActiveTab| {
            let active_tab = active_tab.clone();
            let on_refresh_stats = on_refresh_stats.clone();
            Callback::from(move |e: MouseEvent| {
                if tab == ActiveTab::Statistics {
                    on_refresh_stats.emit(e);
                }
                active_tab.set(tab.clone());
            })
        }
    };

    let tab_class = |tab: ActiveTab| {
        if *active_tab == tab {
            "pf-v5-c-tabs__item pf-m-current"
        } else {
            "pf-v5-c-tabs__item"
        }
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Mindful Moment"}</h1>

            // Tab navigation
            <div class="pf-v5-c-tabs tabs-nav">
                <ul class="pf-v5-c-tabs__list">
                    <li class={tab_class(ActiveTab::Sites)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_tab_click(ActiveTab::Sites)}>
                            <span class="pf-v5-c-tabs__item-text">{"Sites"}</span>
                        </button>
                    </li>
                    <li class={tab_class(ActiveTab::Statistics)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_tab_click(ActiveTab::Statistics)}>
                            <span class="pf-v5-c-tabs__item-text">{"Statistics"}</span>
                        </button>
                    </li>
                </ul>
            </div>

            // Status display
            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                AppState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                AppState::Idle => html! {}
            }}

            <div class="tab-pane-content">
                {match &*active_tab {
                    ActiveTab::Sites => html! {
                        <div class="flex-column-gap">
                            <Button
                                onclick={on_add_current}
                                disabled={is_busy || add_button.disabled}
                                variant={ButtonVariant::Primary}
                                block={true}
                            >
                                {add_button.label}
                            </Button>

                            <div class="manual-add">
                                <input
                                    type="text"
                                    placeholder="example.com"
                                    value={(*manual_input).clone()}
                                    oninput={on_manual_input}
                                    class="manual-add-input"
                                />
                                <Button onclick={on_add_manual} disabled={is_busy} variant={ButtonVariant::Secondary}>
                                    {"Add"}
                                </Button>
                            </div>

                            <ul id="siteList" class="site-list">
                                {for sites.entries().iter().enumerate().map(|(i, site)| html! {
                                    <SiteRow
                                        key={format!("{}-{}", i, site.domain)}
                                        site={site.clone()}
                                        on_toggle={on_toggle.clone()}
                                        on_delete={on_delete.clone()}
                                        disabled={is_busy}
                                    />
                                })}
                            </ul>

                            <Button onclick={on_restore_defaults} disabled={is_busy} variant={ButtonVariant::Link}>
                                {"Restore Default Sites"}
                            </Button>
                        </div>
                    },
                    ActiveTab::Statistics => {
                        let total = time_spent.total();
                        let top = top_sites(&time_spent, TOP_SITES);
                        html! {
                            <div class="flex-column-gap">
                                <div class="stats-container">
                                    <h2 class="stats-title">
                                        {format!("Time on monitored sites: {}", format_duration(total))}
                                    </h2>
                                    if top.is_empty() {
                                        <p class="stats-empty">{"Nothing tracked yet."}</p>
                                    } else {
                                        <div class="stats-box">
                                            {for top.into_iter().map(|(domain, secs)| html! {
                                                <UsageBar
                                                    key={domain.clone()}
                                                    domain={domain.clone()}
                                                    seconds={secs}
                                                    percent={percent_of(secs, total)}
                                                />
                                            })}
                                        </div>
                                    }
                                </div>
                                <Button onclick={on_reset_stats} disabled={is_busy} variant={ButtonVariant::Danger} block={true}>
                                    {"Reset Statistics"}
                                </Button>
                            </div>
                        }
                    },
                }}
            </div>

            <StatusLine status={(*status).clone()} />

            <p class="footer-popup">
                {"Mindful Moment v0.1.0"}
            </p>
        </div>
    }
}

// Helper functions

#[derive(Debug, PartialEq)]
struct AddButton {
    label: &'static str,
    disabled: bool,
}

fn add_button_state(active_site: &ActiveSite, sites: &SiteRegistry) -> AddButton {
    match active_site {
        ActiveSite::Loading => AddButton {
            label: "Add Current Site",
            disabled: true,
        },
        ActiveSite::Invalid => AddButton {
            label: "Invalid URL",
            disabled: true,
        },
        ActiveSite::Page { domain, .. } if sites.contains(domain) => AddButton {
            label: "Already Added",
            disabled: true,
        },
        ActiveSite::Page { .. } => AddButton {
            label: "Add Current Site",
            disabled: false,
        },
    }
}

/// The tab under the popup, if it shows the site that was just toggled.
fn tab_to_reload(active_site: &ActiveSite, toggled: &str) -> Option<i32> {
    match active_site {
        ActiveSite::Page { tab_id, domain } if normalize_domain(domain) == normalize_domain(toggled) => {
            Some(*tab_id)
        }
        _ => None,
    }
}

/// A clear timer only removes the status it was scheduled for.
fn status_is_current(latest: u32, scheduled_for: u32) -> bool {
    latest == scheduled_for
}

/// Normalize typed input (`WWW.Example.com ` → `example.com`) and validate it.
fn parse_manual_domain(input: &str) -> Option<String> {
    let lowered = input.trim().to_lowercase();
    let domain = normalize_domain(&lowered);
    is_valid_domain(domain).then(|| domain.to_string())
}

async fn current_site() -> ActiveSite {
    match bridge::active_tab().await {
        Ok(tab) => match tab.url.as_deref().map(hostname_from_url) {
            Some(Ok(domain)) => ActiveSite::Page {
                tab_id: tab.id,
                domain,
            },
            Some(Err(e)) => {
                info!("Current tab cannot be added: {}", e);
                ActiveSite::Invalid
            }
            None => ActiveSite::Invalid,
        },
        Err(e) => {
            warn!("{}", e);
            ActiveSite::Invalid
        }
    }
}

/// Re-read the registry, apply `change`, and save only if it changed.
///
/// Re-reading narrows the window in which an edit from another context
/// gets overwritten.
async fn update_registry<F>(defaults: &[String], change: F) -> Result<(SiteRegistry, bool), String>
where
    F: FnOnce(&mut SiteRegistry) -> bool,
{
    let store = ChromeSyncStore;
    let mut registry = storage::load_or_initialize(&store, defaults)
        .await
        .map_err(|e| format!("Failed to load sites: {}", e))?;

    let changed = change(&mut registry);
    if changed {
        storage::save_registry(&store, &registry)
            .await
            .map_err(|e| format!("Failed to save sites: {}", e))?;
    }
    Ok((registry, changed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_button_states() {
        let sites = SiteRegistry::with_defaults(&["youtube.com"]);

        assert_eq!(
            add_button_state(&ActiveSite::Invalid, &sites),
            AddButton { label: "Invalid URL", disabled: true }
        );
        assert_eq!(
            add_button_state(
                &ActiveSite::Page { tab_id: 1, domain: "youtube.com".to_string() },
                &sites
            ),
            AddButton { label: "Already Added", disabled: true }
        );
        assert_eq!(
            add_button_state(
                &ActiveSite::Page { tab_id: 1, domain: "github.com".to_string() },
                &sites
            ),
            AddButton { label: "Add Current Site", disabled: false }
        );
        assert!(add_button_state(&ActiveSite::Loading, &sites).disabled);
    }

    #[test]
    fn test_tab_to_reload() {
        let page = ActiveSite::Page { tab_id: 7, domain: "youtube.com".to_string() };

        assert_eq!(tab_to_reload(&page, "youtube.com"), Some(7));
        assert_eq!(tab_to_reload(&page, "www.youtube.com"), Some(7));
        assert_eq!(tab_to_reload(&page, "m.youtube.com"), None);
        assert_eq!(tab_to_reload(&page, "tube.com"), None);
        assert_eq!(tab_to_reload(&ActiveSite::Invalid, "youtube.com"), None);
        assert_eq!(tab_to_reload(&ActiveSite::Loading, "youtube.com"), None);
    }

    #[test]
    fn test_older_status_timer_does_not_clear_newer_status() {
        let mut seq = 0u32;
        seq += 1;
        let first = seq;
        seq += 1;
        let second = seq;

        assert!(!status_is_current(seq, first));
        assert!(status_is_current(seq, second));
    }

    #[test]
    fn test_parse_manual_domain() {
        assert_eq!(parse_manual_domain("  WWW.Reddit.com "), Some("reddit.com".to_string()));
        assert_eq!(parse_manual_domain("news.ycombinator.com"), Some("news.ycombinator.com".to_string()));
        assert_eq!(parse_manual_domain("https://reddit.com"), None);
        assert_eq!(parse_manual_domain(""), None);
    }
}
