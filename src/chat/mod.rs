//! Interactive terminal chat built on the model adapter.
//!
//! # Architecture
//!
//! - [`controller`]: the chat state machine (connection lifecycle, message
//!   list, streaming, persistence)
//! - [`render`]: the presentation trait the controller notifies
//! - [`commands`]: slash command parsing
//! - [`config`]: CLI argument parsing and configuration
//! - [`theme`]: the persisted light/dark preference

pub mod commands;
pub mod config;
pub mod controller;
pub mod render;
pub mod theme;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use controller::{
    ChatController, DEFAULT_CONNECT_DELAY, ERROR_SUFFIX, RejectReason, SendOutcome,
};
pub use render::{PlainTextRenderer, Renderer};
pub use theme::{ThemePreference, terminal_hint};
