use serde::{Deserialize, Serialize};

use crate::types::Content;

/// One chunk of a streamed Gemini response.
///
/// Each server-sent event carries a complete `GenerateContentResponse`
/// whose candidate holds only the text generated since the previous chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate continuations; chat requests produce at most one.
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Feedback on the prompt, present when it was blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,

    /// Token accounting, usually only on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,

    /// The concrete model version that served the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// The answer text carried by this chunk.
    ///
    /// Returns the joined text of the first candidate, or an empty string
    /// when the chunk has no candidate or no text.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(Content::joined_text)
            .unwrap_or_default()
    }

    /// The finish reason of the first candidate, if generation ended.
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
    }
}

/// A candidate continuation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The generated content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    /// Why generation stopped, e.g. `STOP`, `MAX_TOKENS`, `SAFETY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Position of the candidate in the response.
    #[serde(default)]
    pub index: u32,
}

/// Prompt-level safety feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Why the prompt was blocked, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Token counts reported by the API.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt, including history and system instruction.
    #[serde(default)]
    pub prompt_token_count: u64,

    /// Tokens generated across all candidates.
    #[serde(default)]
    pub candidates_token_count: u64,

    /// Sum of prompt and candidate tokens.
    #[serde(default)]
    pub total_token_count: u64,
}
