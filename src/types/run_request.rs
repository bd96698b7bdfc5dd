use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Caller input for one conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTurn {
    /// The user the session belongs to.
    pub user_id: String,

    /// The session carrying the conversation context.
    pub session_id: SessionId,

    /// The user's message text.
    pub text: String,
}

impl RunTurn {
    /// Create a new `RunTurn`.
    pub fn new(user_id: impl Into<String>, session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id,
            text: text.into(),
        }
    }
}

/// A text part of a message sent to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPart {
    /// The text.
    pub text: String,
}

/// The message being submitted by a run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Always `user`.
    pub role: String,

    /// The message parts.
    pub parts: Vec<TextPart>,
}

/// Body of the streaming run endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// The agent application name.
    pub app_name: String,

    /// The user the session belongs to.
    pub user_id: String,

    /// The session carrying the conversation context.
    pub session_id: String,

    /// The message being submitted.
    #[serde(rename = "newMessage")]
    pub new_message: NewMessage,
}

impl RunRequest {
    /// Build the wire request for `turn` against the application `app_name`.
    pub fn new(app_name: impl Into<String>, turn: &RunTurn) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: turn.user_id.clone(),
            session_id: turn.session_id.as_str().to_string(),
            new_message: NewMessage {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: turn.text.clone(),
                }],
            },
        }
    }
}
