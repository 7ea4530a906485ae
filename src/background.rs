/// Background context: the only place allowed to close tabs
use log::{debug, warn};
use wasm_bindgen_futures::spawn_local;

use crate::bridge;
use crate::messages::{Message, tab_to_close};

pub fn install() {
    bridge::listen_for_messages(handle_message);
    debug!("Background listener installed");
}

fn handle_message(message: Message, sender_tab: Option<i32>) {
    match tab_to_close(message, sender_tab) {
        Some(tab_id) => spawn_local(async move {
            if let Err(e) = bridge::close_tab(tab_id).await {
                warn!("{}", e);
            }
        }),
        None => debug!("Nothing to do for {:?} from tab {:?}", message, sender_tab),
    }
}
