use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking for advice.
    User,

    /// The advisory agent.
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,

    /// The message text, possibly containing markdown.
    pub content: String,
}

impl ChatMessage {
    /// Create a new `ChatMessage`.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Returns true if the message was written by the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn chat_message_serialization() {
        let message = ChatMessage::assistant("Plant after the first rains.");
        let json = to_value(&message).unwrap();

        assert_eq!(
            json,
            json!({
                "role": "assistant",
                "content": "Plant after the first rains."
            })
        );
    }

    #[test]
    fn chat_message_deserialization() {
        let json = json!({
            "role": "user",
            "content": "Which crop suits clay soil?"
        });

        let message: ChatMessage = serde_json::from_value(json).unwrap();
        assert!(message.is_user());
        assert_eq!(message.content, "Which crop suits clay soil?");
    }

    #[test]
    fn unknown_role_rejected() {
        let json = json!({"role": "system", "content": "x"});
        assert!(serde_json::from_value::<ChatMessage>(json).is_err());
    }
}
