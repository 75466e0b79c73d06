use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One turn of a Gemini conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// The author of the turn; omitted for system instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// The ordered parts making up the turn.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a single-part text turn for the given role.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            parts: vec![Part::text(text)],
        }
    }

    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// Create a model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self::text(Role::Model, text)
    }

    /// Create a role-less content block, as used for system instructions.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenate the visible text of every part.
    ///
    /// Parts flagged as model thoughts are skipped.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

/// A piece of a [`Content`] turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Text payload, absent for non-text parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// True if the part is a model thought summary rather than answer text.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thought: bool,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: false,
        }
    }
}
