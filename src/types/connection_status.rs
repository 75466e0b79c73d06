use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of a chat controller.
///
/// Exactly one value holds at a time.  Messages are accepted only while
/// [`ConnectionStatus::Connected`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// A connection attempt is under way.
    Connecting,

    /// The model is reachable and the session is ready.
    Connected,

    /// No connection has been attempted yet.
    #[default]
    Disconnected,

    /// The last connection attempt failed; a retry is required.
    Error,
}

impl ConnectionStatus {
    /// Returns true when new messages may be sent.
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
        assert!(!ConnectionStatus::default().is_connected());
        assert!(ConnectionStatus::Connected.is_connected());
    }

    #[test]
    fn display_matches_serialization() {
        for status in [
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected,
            ConnectionStatus::Error,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }
}
