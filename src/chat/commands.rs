//! Slash command parsing for the chat application.
//!
//! Input that starts with `/` controls the session locally and is never
//! sent to the model.

use crate::types::Theme;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Clear the conversation and its saved history.
    Clear,

    /// Reconnect after a failed connection.
    Retry,

    /// Switch theme.  `None` toggles between light and dark.
    Theme(Option<Theme>),

    /// Replay the conversation so far.
    History,

    /// Show the connection status and message count.
    Status,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use parley::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(parse_command("/theme light").is_some());
/// assert!(parse_command("Hello, Gemini!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match (command.as_str(), argument) {
        ("clear", None) => ChatCommand::Clear,
        ("retry" | "reconnect", None) => ChatCommand::Retry,
        ("theme", None) => ChatCommand::Theme(None),
        ("theme", Some(arg)) => match arg.to_lowercase().parse::<Theme>() {
            Ok(theme) => ChatCommand::Theme(Some(theme)),
            Err(err) => ChatCommand::Invalid(format!("/theme: {err} (use light or dark)")),
        },
        ("history", None) => ChatCommand::History,
        ("status", None) => ChatCommand::Status,
        ("help" | "?", None) => ChatCommand::Help,
        ("quit" | "exit" | "q", None) => ChatCommand::Quit,
        (
            "clear" | "retry" | "reconnect" | "history" | "status" | "help" | "?" | "quit" | "exit"
            | "q",
            Some(_),
        ) => ChatCommand::Invalid(format!("/{command} takes no arguments")),
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear the conversation and saved history
  /retry                 Reconnect after a connection error
  /theme [light|dark]    Set the theme (no argument toggles it)
  /history               Show the conversation so far
  /status                Show connection status
  /help                  Show this help message
  /quit                  Exit the chat

End a line with \ to continue typing on the next line."#
}
