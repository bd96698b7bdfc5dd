use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::ChatMessage;

/// A transcript persisted in the local chat archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedChat {
    /// Unique identifier, derived from the save time in milliseconds.
    pub id: String,

    /// Display name chosen by the user.
    pub name: String,

    /// The transcript, in conversation order.
    pub messages: Vec<ChatMessage>,

    /// When the chat was saved.
    #[serde(rename = "savedAt", with = "crate::utils::time")]
    pub saved_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};
    use time::macros::datetime;

    #[test]
    fn saved_chat_wire_shape() {
        let chat = SavedChat {
            id: "1733000000000".to_string(),
            name: "Banana farm".to_string(),
            messages: vec![ChatMessage::user("Hi")],
            saved_at: datetime!(2024-12-01 10:30:00 UTC),
        };

        assert_eq!(
            to_value(&chat).unwrap(),
            json!({
                "id": "1733000000000",
                "name": "Banana farm",
                "messages": [{"role": "user", "content": "Hi"}],
                "savedAt": "2024-12-01T10:30:00Z"
            })
        );
    }

    #[test]
    fn saved_chat_accepts_browser_iso_strings() {
        let json = json!({
            "id": "1",
            "name": "n",
            "messages": [],
            "savedAt": "2024-12-01T10:30:00.123Z"
        });
        let chat: SavedChat = serde_json::from_value(json).unwrap();
        assert_eq!(chat.saved_at.millisecond(), 123);
    }
}
