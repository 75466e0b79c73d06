// Public modules
pub mod connection_status;
pub mod content;
pub mod fragment;
pub mod generate_content_request;
pub mod generate_content_response;
pub mod message;
pub mod model;
pub mod role;
pub mod theme;

// Re-exports
pub use connection_status::ConnectionStatus;
pub use content::{Content, Part};
pub use fragment::Fragment;
pub use generate_content_request::GenerateContentRequest;
pub use generate_content_response::{
    Candidate, GenerateContentResponse, PromptFeedback, UsageMetadata,
};
pub use message::Message;
pub use model::{KnownModel, Model};
pub use role::Role;
pub use theme::{Theme, ThemeParseError};
