/// Bindings to the browser extension APIs
///
/// `js/chrome.js` only forwards to `chrome.*`; decoding and error mapping
/// happen here.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::error::StoreError;
use crate::messages::Message;
use crate::storage::KeyValueStore;

#[wasm_bindgen(module = "/js/chrome.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getSyncStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setSyncStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendRuntimeMessage(message: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendTabMessage(tab_id: i32, message: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryActiveTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn reloadTab(tab_id: i32) -> Result<(), JsValue>;

    /// Registers `callback(message, senderTabId)` on `chrome.runtime.onMessage`.
    fn addRuntimeMessageListener(callback: &js_sys::Function);
}

/// `chrome.storage.sync`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeSyncStore;

impl KeyValueStore for ChromeSyncStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw = getSyncStorage(key)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?;

        if raw.is_null() || raw.is_undefined() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(raw)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        // Plain objects, not ES Maps: chrome.storage cannot persist a Map.
        let raw = value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| StoreError::Serialize {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        setSyncStorage(key, raw)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))
    }
}

/// The focused tab of the current window
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveTab {
    pub id: i32,
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn active_tab() -> Result<ActiveTab, String> {
    let tab_js = queryActiveTab()
        .await
        .map_err(|e| format!("Failed to query active tab: {:?}", e))?;
    serde_wasm_bindgen::from_value(tab_js).map_err(|e| format!("Failed to parse tab: {:?}", e))
}

pub async fn close_tab(tab_id: i32) -> Result<(), String> {
    removeTab(tab_id)
        .await
        .map_err(|e| format!("Failed to close tab {}: {:?}", tab_id, e))
}

pub async fn reload_tab(tab_id: i32) -> Result<(), String> {
    reloadTab(tab_id)
        .await
        .map_err(|e| format!("Failed to reload tab {}: {:?}", tab_id, e))
}

fn encode(message: Message) -> Result<JsValue, String> {
    serde_wasm_bindgen::to_value(&message).map_err(|e| format!("Failed to serialize: {:?}", e))
}

/// Fire-and-forget message to the background context.
pub async fn send_to_background(message: Message) -> Result<(), String> {
    sendRuntimeMessage(encode(message)?)
        .await
        .map_err(|e| format!("Failed to send {:?}: {:?}", message, e))
}

/// Fire-and-forget message to a tab's content script.
pub async fn send_to_tab(tab_id: i32, message: Message) -> Result<(), String> {
    sendTabMessage(tab_id, encode(message)?)
        .await
        .map_err(|e| format!("Failed to send {:?} to tab {}: {:?}", message, tab_id, e))
}

/// Route runtime messages to `handler(message, sender_tab_id)`.
///
/// Messages that do not decode are dropped with a debug log. The listener
/// lives for the lifetime of the context.
pub fn listen_for_messages(mut handler: impl FnMut(Message, Option<i32>) + 'static) {
    let listener = Closure::wrap(Box::new(move |message: JsValue, sender_tab: JsValue| {
        match serde_wasm_bindgen::from_value::<Message>(message) {
            Ok(message) => handler(message, sender_tab.as_f64().map(|id| id as i32)),
            Err(e) => log::debug!("Ignoring unrecognised message: {}", e),
        }
    }) as Box<dyn FnMut(JsValue, JsValue)>);

    addRuntimeMessageListener(listener.as_ref().unchecked_ref());
    listener.forget();
}
