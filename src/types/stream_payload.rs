use serde::{Deserialize, Serialize};

use crate::types::TextUnit;

/// A part of streamed content.
///
/// Parts that carry something other than text (function calls, for example)
/// deserialize with `text` unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    /// The part text, if this is a text part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Message content carried by a streamed event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamContent {
    /// The author role reported by the agent, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The content parts.
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

/// An incremental text fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDelta {
    /// The fragment text.
    #[serde(default)]
    pub text: String,
}

/// The JSON payload of one `data:` line.
///
/// Two shapes are produced by the agent service: a full-message event
/// (`{partial, content: {parts: [{text}]}}`) and a token delta
/// (`{delta: {text}}`). Fields outside these are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPayload {
    /// Set to `true` on intermediate full-message events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,

    /// The message content of a full-message event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<StreamContent>,

    /// The fragment of a token-delta event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<StreamDelta>,
}

impl StreamPayload {
    /// Extract the text unit carried by this payload, if any.
    ///
    /// A non-empty delta wins. Otherwise content yields a full message only
    /// when `partial` is not `true` and the joined part texts are non-empty.
    pub fn text_unit(&self) -> Option<TextUnit> {
        if let Some(delta) = &self.delta
            && !delta.text.is_empty()
        {
            return Some(TextUnit::Delta(delta.text.clone()));
        }
        if self.partial == Some(true) {
            return None;
        }
        let content = self.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(TextUnit::Full(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> StreamPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn full_message_joins_parts() {
        let p = payload(json!({
            "partial": false,
            "author": "pungde_agent",
            "content": {
                "role": "model",
                "parts": [{"text": "Rotate crops "}, {"functionCall": {"name": "x"}}, {"text": "yearly."}]
            }
        }));
        assert_eq!(
            p.text_unit(),
            Some(TextUnit::Full("Rotate crops yearly.".to_string()))
        );
    }

    #[test]
    fn missing_partial_counts_as_complete() {
        let p = payload(json!({"content": {"parts": [{"text": "Done."}]}}));
        assert_eq!(p.text_unit(), Some(TextUnit::Full("Done.".to_string())));
    }

    #[test]
    fn partial_content_is_skipped() {
        let p = payload(json!({"partial": true, "content": {"parts": [{"text": "Rot"}]}}));
        assert_eq!(p.text_unit(), None);
    }

    #[test]
    fn delta_variant() {
        let p = payload(json!({"delta": {"text": "Ro"}}));
        assert_eq!(p.text_unit(), Some(TextUnit::Delta("Ro".to_string())));
    }

    #[test]
    fn empty_texts_yield_nothing() {
        assert_eq!(payload(json!({"delta": {"text": ""}})).text_unit(), None);
        assert_eq!(payload(json!({"content": {"parts": []}})).text_unit(), None);
        assert_eq!(
            payload(json!({"content": {"parts": [{"functionResponse": {}}]}})).text_unit(),
            None
        );
        assert_eq!(payload(json!({})).text_unit(), None);
    }
}
