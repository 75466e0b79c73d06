// Public modules
pub mod adapter;
pub mod chat;
pub mod client;
pub mod error;
pub mod sse;
pub mod store;
pub mod types;
pub mod utils;

mod observability;

// Re-exports
pub use adapter::{
    ChatSession, DEFAULT_SYSTEM_INSTRUCTION, FragmentStream, GeminiAdapter, ModelAdapter,
    SessionConfig,
};
pub use client::{EventStream, Gemini, api_key_from_env};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::*;
