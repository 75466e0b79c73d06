//! Terminal output for parley-chat.
//!
//! This module provides a trait-based rendering abstraction that the
//! controller drives as the conversation changes.  The default
//! implementation writes to the terminal with ANSI colours chosen from the
//! active [`Theme`].

use std::io::{self, Stdout, Write};

use crate::types::{ConnectionStatus, Message, Role, Theme};
use crate::utils::time::format_millis;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_DIM: &str = "\x1b[2m";

/// Colours for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    user: &'static str,
    model: &'static str,
    error: &'static str,
    info: &'static str,
    ok: &'static str,
    pending: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            // Bright colours that read well on dark backgrounds.
            Theme::Dark => Palette {
                user: "\x1b[96m",
                model: "\x1b[97m",
                error: "\x1b[91m",
                info: "\x1b[37m",
                ok: "\x1b[92m",
                pending: "\x1b[93m",
            },
            // Saturated colours that read well on light backgrounds.
            Theme::Light => Palette {
                user: "\x1b[34m",
                model: "\x1b[30m",
                error: "\x1b[31m",
                info: "\x1b[90m",
                ok: "\x1b[32m",
                pending: "\x1b[33m",
            },
        }
    }
}

/// Receives everything the controller wants shown.
///
/// Only the printing methods are required; the notification hooks default
/// to doing nothing so renderers can pick the level of detail they need.
pub trait Renderer: Send {
    /// Print a chunk of response text as it streams in.
    fn print_text(&mut self, text: &str);

    /// Print a failure, e.g. a connection error or a broken stream.
    fn print_error(&mut self, error: &str);

    /// Print a notice that is not part of the conversation.
    fn print_info(&mut self, info: &str);

    /// Print a complete message, e.g. when replaying restored history.
    fn print_message(&mut self, message: &Message);

    /// Called when the connection status changes.
    fn print_status(&mut self, status: ConnectionStatus) {
        _ = status;
    }

    /// Called before the first fragment of a response.
    fn start_response(&mut self) {}

    /// Called when a response is complete, successful or not.
    fn finish_response(&mut self);

    /// Called after every change to the message list.
    fn messages_changed(&mut self, messages: &[Message]) {
        _ = messages;
    }
}

/// Writes to stdout/stderr, coloured per theme unless colour is off.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    palette: Palette,
    in_response: bool,
}

impl PlainTextRenderer {
    /// A coloured renderer using the dark palette.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// A renderer that colours output only if `use_color` is set.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            palette: Palette::for_theme(Theme::default()),
            in_response: false,
        }
    }

    /// Sets the colour theme.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.set_theme(theme);
        self
    }

    /// Switches the colour theme for subsequent output.
    pub fn set_theme(&mut self, theme: Theme) {
        self.palette = Palette::for_theme(theme);
    }

    /// Streamed text has no newline, so push it out explicitly.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn label(&self, role: Role) -> String {
        match role {
            Role::User => self.paint(self.palette.user, "You:"),
            Role::Model => self.paint(self.palette.model, "Gemini:"),
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        if self.use_color {
            print!("{}{text}{ANSI_RESET}", self.palette.model);
        } else {
            print!("{text}");
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        let line = self.paint(self.palette.error, &format!("Error: {error}"));
        if self.in_response {
            eprintln!();
        }
        eprintln!("{line}");
    }

    fn print_info(&mut self, info: &str) {
        println!("{}", self.paint(self.palette.info, info));
    }

    fn print_message(&mut self, message: &Message) {
        let time = format_millis(message.timestamp).unwrap_or_default();
        let stamp = if self.use_color {
            format!("{ANSI_DIM}[{time}]{ANSI_RESET}")
        } else {
            format!("[{time}]")
        };
        println!("{stamp} {}", self.label(message.role));
        let body = if message.is_error {
            self.paint(self.palette.error, &message.content)
        } else {
            message.content.clone()
        };
        println!("{body}\n");
    }

    fn print_status(&mut self, status: ConnectionStatus) {
        let color = match status {
            ConnectionStatus::Connected => self.palette.ok,
            ConnectionStatus::Connecting => self.palette.pending,
            ConnectionStatus::Disconnected => self.palette.info,
            ConnectionStatus::Error => self.palette.error,
        };
        println!("{}", self.paint(color, &format!("[{status}]")));
    }

    fn start_response(&mut self) {
        self.in_response = true;
        println!("{}", self.label(Role::Model));
    }

    fn finish_response(&mut self) {
        self.in_response = false;
        println!("\n");
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
        assert_eq!(renderer.palette, Palette::for_theme(Theme::Dark));
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
        assert_eq!(renderer.paint("\x1b[31m", "plain"), "plain");
        assert_eq!(renderer.label(Role::User), "You:");
    }

    #[test]
    fn theme_switches_palette() {
        let mut renderer = PlainTextRenderer::new().with_theme(Theme::Light);
        assert_eq!(renderer.palette, Palette::for_theme(Theme::Light));
        renderer.set_theme(Theme::Dark);
        assert_eq!(renderer.paint("\x1b[91m", "x"), "\x1b[91mx\x1b[0m");
    }
}
