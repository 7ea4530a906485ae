/// Mindful Moment - Browser extension that nudges you away from distracting sites
/// Built with Rust + WASM + Yew

mod background;
mod bridge;
pub mod config;
mod content;
pub mod domain;
pub mod error;
pub mod messages;
pub mod reminder;
pub mod site_data;
pub mod stats;
pub mod storage;
mod timer;
pub mod tracker;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export domain normalization for JavaScript access
#[wasm_bindgen]
pub fn normalize_domain(host: &str) -> String {
    domain::normalize_domain(host).to_string()
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Install the reminder on a page (content script)
#[wasm_bindgen]
pub fn start_reminder() {
    content::install();
}

// Listen for "close my tab" requests (background service worker)
#[wasm_bindgen]
pub fn start_background() {
    background::install();
}
