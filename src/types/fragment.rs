use serde::{Deserialize, Serialize};

/// An incremental piece of a streamed response's text.
///
/// Concatenating every fragment of a stream, in order, yields the full
/// response.  A fragment may be empty when a chunk carried no text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// The text carried by this fragment.
    pub text: String,
}

impl Fragment {
    /// Create a new `Fragment` with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Returns true if the fragment carries no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
