/// Messages exchanged between extension contexts
use serde::{Deserialize, Serialize};

/// Wire form is `{"action": "closeTab"}` / `{"action": "checkReminder"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    /// Page → background: close the sending tab.
    CloseTab,
    /// Popup → page: run the reminder check again.
    CheckReminder,
}

/// Tab the background context should close in response to a message.
pub fn tab_to_close(message: Message, sender_tab: Option<i32>) -> Option<i32> {
    match message {
        Message::CloseTab => sender_tab,
        Message::CheckReminder => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_string(&Message::CloseTab).unwrap(),
            r#"{"action":"closeTab"}"#
        );
        let parsed: Message = serde_json::from_str(r#"{"action":"checkReminder"}"#).unwrap();
        assert_eq!(parsed, Message::CheckReminder);
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(serde_json::from_str::<Message>(r#"{"action":"explode"}"#).is_err());
        assert!(serde_json::from_str::<Message>(r#"{}"#).is_err());
    }

    #[test]
    fn test_tab_to_close() {
        assert_eq!(tab_to_close(Message::CloseTab, Some(7)), Some(7));
        assert_eq!(tab_to_close(Message::CloseTab, None), None);
        assert_eq!(tab_to_close(Message::CheckReminder, Some(7)), None);
    }
}
