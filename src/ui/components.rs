/// Reusable popup components

use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::site_data::SiteEntry;
use crate::stats::format_duration;

#[derive(Properties, PartialEq)]
pub struct UsageBarProps {
    pub domain: String,
    pub seconds: u64,
    pub percent: u8, // 0-100
}

#[function_component(UsageBar)]
pub fn usage_bar(props: &UsageBarProps) -> Html {
    let percent = props.percent.min(100);

    html! {
        <div class="stat-item">
            <div class="stat-label">
                <span class="stat-domain">{&props.domain}</span>
                <span class="stat-count">{format_duration(props.seconds)}</span>
            </div>
            <div class="progress-container">
                <div style={format!("width: {}%; background-color: #5B4FE8; height: 100%; transition: width 0.3s ease;", percent)}></div>
            </div>
        </div>
    }
}

#[derive(Clone, PartialEq)]
pub struct Status {
    pub message: String,
    pub is_error: bool,
}

#[derive(Properties, PartialEq)]
pub struct StatusLineProps {
    #[prop_or_default]
    pub status: Option<Status>,
}

/// Transient status text under the site list.
#[function_component(StatusLine)]
pub fn status_line(props: &StatusLineProps) -> Html {
    match &props.status {
        Some(status) => {
            let color = if status.is_error { "#ff3b30" } else { "#666" };
            html! {
                <p id="statusMessage" class="status-message" style={format!("color: {};", color)}>
                    {&status.message}
                </p>
            }
        }
        None => html! { <p id="statusMessage" class="status-message"></p> },
    }
}

#[derive(Properties, PartialEq)]
pub struct SiteRowProps {
    pub site: SiteEntry,
    pub on_toggle: Callback<(String, bool)>,
    pub on_delete: Callback<String>,
    #[prop_or(false)]
    pub disabled: bool,
}

#[function_component(SiteRow)]
pub fn site_row(props: &SiteRowProps) -> Html {
    let on_change = {
        let domain = props.site.domain.clone();
        props.on_toggle.reform(move |e: Event| {
            let checked = e
                .target_dyn_into::<HtmlInputElement>()
                .map(|input| input.checked())
                .unwrap_or(false);
            (domain.clone(), checked)
        })
    };
    let on_delete = {
        let domain = props.site.domain.clone();
        props.on_delete.reform(move |_: MouseEvent| domain.clone())
    };

    html! {
        <li class="site-item">
            <button class="delete-btn" title="Delete site" onclick={on_delete} disabled={props.disabled}>{"×"}</button>
            <span class="domain-text">{&props.site.domain}</span>
            <div class="controls">
                <label class="toggle">
                    <input
                        type="checkbox"
                        checked={props.site.enabled}
                        onchange={on_change}
                        disabled={props.disabled}
                    />
                    <span class="slider"></span>
                </label>
            </div>
        </li>
    }
}
