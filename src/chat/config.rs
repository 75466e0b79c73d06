//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the binary builds its controller from.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::adapter::{DEFAULT_SYSTEM_INSTRUCTION, SessionConfig};
use crate::chat::controller::DEFAULT_CONNECT_DELAY;
use crate::types::Model;

/// Command-line arguments for the parley-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-2.5-flash)", "MODEL")]
    pub model: Option<String>,

    /// System instruction for the conversation.
    #[arrrg(optional, "System instruction for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Directory holding saved history and preferences.
    #[arrrg(optional, "Directory for saved history and theme", "DIR")]
    pub data_dir: Option<String>,

    /// Pause after connecting, in milliseconds.
    #[arrrg(optional, "Delay after connecting in ms (default: 800)", "MS")]
    pub connect_delay_ms: Option<u64>,

    /// Keep nothing on disk.
    #[arrrg(flag, "Do not read or write saved history and theme")]
    pub ephemeral: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Resolved configuration for a chat session.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The model that answers.
    pub model: Model,

    /// Instruction applied to the whole conversation.
    pub system_instruction: String,

    /// Where history and theme are stored.  `None` means the platform data
    /// directory.
    pub data_dir: Option<PathBuf>,

    /// Pause between initialization and reporting `connected`.
    pub connect_delay: Duration,

    /// Whether to use in-memory storage only.
    pub ephemeral: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.5-flash
    /// - System instruction: the built-in assistant persona
    /// - Connect delay: 800 ms
    /// - Storage: platform data directory
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            data_dir: None,
            connect_delay: DEFAULT_CONNECT_DELAY,
            ephemeral: false,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Sets the storage directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets the connect delay.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Keeps history and theme in memory only.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The session configuration for the model adapter.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.model.clone(), self.system_instruction.clone())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            model: args
                .model
                .and_then(|name| name.parse::<Model>().ok())
                .unwrap_or(defaults.model),
            system_instruction: args.system.unwrap_or(defaults.system_instruction),
            data_dir: args.data_dir.map(PathBuf::from),
            connect_delay: args
                .connect_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_delay),
            ephemeral: args.ephemeral,
            use_color: !args.no_color,
        }
    }
}
