use serde::{Deserialize, Serialize};

use crate::types::Role;

/// A single entry in the chat transcript.
///
/// The controller creates messages in pairs: the user's text and an empty
/// placeholder for the model's reply that fills in as fragments arrive.
/// The serialized form uses camelCase keys and omits the two flags when
/// they are false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier within a transcript.
    pub id: String,

    /// Who wrote the message.
    pub role: Role,

    /// The message text, possibly partial while streaming.
    pub content: String,

    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,

    /// True while the model's reply is still arriving.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_streaming: bool,

    /// True if the reply failed before completing.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl Message {
    /// Create a finished user message.
    pub fn user(id: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            timestamp,
            is_streaming: false,
            is_error: false,
        }
    }

    /// Create an empty model message that is waiting for fragments.
    pub fn placeholder(id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            role: Role::Model,
            content: String::new(),
            timestamp,
            is_streaming: true,
            is_error: false,
        }
    }

    /// Returns true if the model wrote this message.
    pub fn is_model(&self) -> bool {
        self.role == Role::Model
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn finished_message_omits_flags() {
        let message = Message::user("1700000000000", "Hello", 1_700_000_000_000);
        assert_eq!(
            to_value(&message).unwrap(),
            json!({
                "id": "1700000000000",
                "role": "user",
                "content": "Hello",
                "timestamp": 1_700_000_000_000i64
            })
        );
    }

    #[test]
    fn placeholder_serializes_streaming_flag() {
        let message = Message::placeholder("2", 5);
        assert_eq!(
            to_value(&message).unwrap(),
            json!({
                "id": "2",
                "role": "model",
                "content": "",
                "timestamp": 5,
                "isStreaming": true
            })
        );
    }

    #[test]
    fn flags_default_to_false() {
        let message: Message = serde_json::from_value(json!({
            "id": "3",
            "role": "model",
            "content": "partial",
            "timestamp": 9,
            "isError": true
        }))
        .unwrap();
        assert!(message.is_model());
        assert!(message.is_error);
        assert!(!message.is_streaming);
    }
}
