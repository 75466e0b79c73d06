use serde::{Deserialize, Serialize};
use std::fmt;

/// The author of a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the person at the keyboard.
    User,

    /// Text produced by the model.
    Model,
}

impl Role {
    /// The wire name of the role, shared by the store and the Gemini API.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), r#""model""#);
    }

    #[test]
    fn role_deserialization() {
        let role: Role = serde_json::from_str(r#""model""#).unwrap();
        assert_eq!(role, Role::Model);
        assert!(serde_json::from_str::<Role>(r#""assistant""#).is_err());
    }
}
