//! Interactive chat application for conversing with Gemini.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! GEMINI_API_KEY=... parley-chat
//!
//! # Specify a model and system instruction
//! parley-chat --model gemini-2.5-pro --system "You are a terse code reviewer"
//!
//! # Keep nothing on disk and skip the connect pause
//! parley-chat --ephemeral --connect-delay-ms 0
//! ```
//!
//! Set `PARLEY_LOG` (e.g. `PARLEY_LOG=parley=debug`) to see diagnostics on
//! stderr.

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use parley::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, PlainTextRenderer, RejectReason, Renderer,
    SendOutcome, ThemePreference, help_text, parse_command, terminal_hint,
};
use parley::{ConnectionStatus, FileStore, GeminiAdapter, KeyValueStore, MemoryStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PARLEY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Main entry point for the parley-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let (args, _) = ChatArgs::from_command_line_relaxed("parley-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    if config.ephemeral {
        run(config, MemoryStore::new()).await
    } else {
        let store = match &config.data_dir {
            Some(dir) => FileStore::new(dir),
            None => FileStore::in_data_dir()?,
        };
        tracing::debug!(dir = %store.dir().display(), "using data directory");
        run(config, store).await
    }
}

async fn run<S>(config: ChatConfig, store: S) -> Result<(), Box<dyn std::error::Error>>
where
    S: KeyValueStore + Clone,
{
    let mut theme = ThemePreference::load(store.clone(), terminal_hint());
    let mut renderer = PlainTextRenderer::with_color(config.use_color).with_theme(theme.theme());
    let adapter = GeminiAdapter::new(config.session_config());
    let mut controller =
        ChatController::new(adapter, store).with_connect_delay(config.connect_delay);
    let mut rl = DefaultEditor::new()?;

    println!("Gemini Chat (model: {})", config.model);
    println!("Type /help for commands, /quit to exit\n");

    for message in controller.messages() {
        renderer.print_message(message);
    }
    controller.connect(&mut renderer).await;

    loop {
        let text = match read_message(&mut rl) {
            Ok(Some(text)) => text,
            Ok(None) => continue,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        };

        if let Some(cmd) = parse_command(&text) {
            match cmd {
                ChatCommand::Quit => {
                    println!("Goodbye!");
                    break;
                }
                ChatCommand::Clear => {
                    controller.clear_chat(&mut renderer);
                    renderer.print_info("Conversation cleared.");
                }
                ChatCommand::Retry => {
                    if controller.status() == ConnectionStatus::Connected {
                        renderer.print_info("Already connected.");
                    } else {
                        controller.retry_connection(&mut renderer).await;
                    }
                }
                ChatCommand::Theme(choice) => {
                    match choice {
                        Some(choice) => theme.set(choice),
                        None => {
                            theme.toggle();
                        }
                    }
                    renderer.set_theme(theme.theme());
                    renderer.print_info(&format!("Theme set to {}.", theme.theme()));
                }
                ChatCommand::History => {
                    if controller.messages().is_empty() {
                        renderer.print_info("No messages yet.");
                    }
                    for message in controller.messages() {
                        renderer.print_message(message);
                    }
                }
                ChatCommand::Status => {
                    renderer.print_info(&format!(
                        "Status: {} | Model: {} | Messages: {} | Theme: {}",
                        controller.status(),
                        config.model,
                        controller.messages().len(),
                        theme.theme(),
                    ));
                }
                ChatCommand::Help => {
                    for line in help_text().lines() {
                        println!("    {line}");
                    }
                }
                ChatCommand::Invalid(msg) => {
                    renderer.print_error(&msg);
                }
            }
            continue;
        }

        match controller.send_message(&text, &mut renderer).await {
            SendOutcome::Completed | SendOutcome::Failed => {}
            SendOutcome::Rejected(RejectReason::EmptyMessage) => {}
            SendOutcome::Rejected(RejectReason::NotConnected(status)) => {
                let hint = if status == ConnectionStatus::Error {
                    " Use /retry to reconnect."
                } else {
                    ""
                };
                renderer.print_info(&format!("Not connected ({status}).{hint}"));
            }
            SendOutcome::Rejected(reason) => {
                renderer.print_info(&format!("Message not sent: {reason}."));
            }
        }
    }

    Ok(())
}

/// Reads one message, joining lines that end with a backslash.
///
/// Returns `Ok(None)` for blank input.
fn read_message(rl: &mut DefaultEditor) -> Result<Option<String>, ReadlineError> {
    let mut text = String::new();
    let mut prompt = "You: ";
    loop {
        let line = rl.readline(prompt)?;
        match line.strip_suffix('\\') {
            Some(head) => {
                text.push_str(head);
                text.push('\n');
                prompt = "...  ";
            }
            None => {
                text.push_str(&line);
                break;
            }
        }
    }
    if text.trim().is_empty() {
        return Ok(None);
    }
    let _ = rl.add_history_entry(text.as_str());
    Ok(Some(text))
}
