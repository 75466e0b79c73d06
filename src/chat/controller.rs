//! The chat session state machine.
//!
//! [`ChatController`] owns the message list and the connection status.  It
//! drives a [`ModelAdapter`] for responses, mirrors the message list into a
//! [`KeyValueStore`] after every change, and notifies a [`Renderer`] so the
//! presentation can follow along.

use std::fmt;
use std::time::Duration;

use futures::StreamExt;

use crate::adapter::ModelAdapter;
use crate::chat::render::Renderer;
use crate::error::Result;
use crate::observability::{
    CHAT_CONNECT_FAILURES, CHAT_SEND_FAILURES, CHAT_SENDS, CHAT_SENDS_REJECTED,
};
use crate::store::{self, KeyValueStore};
use crate::types::{ConnectionStatus, Message};
use crate::utils::time::now_millis;

/// Appended to a response that failed part way through.
pub const ERROR_SUFFIX: &str =
    "\n\n*[Error: Failed to complete response. Please check your connection.]*";

/// How long the controller lingers in `Connecting` after a successful
/// initialization.
pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_millis(800);

/// Why a message was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The text was empty or whitespace.
    EmptyMessage,
    /// The controller was not connected; carries the status at the time.
    NotConnected(ConnectionStatus),
    /// A response was already streaming.
    AlreadyStreaming,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyMessage => write!(f, "message is empty"),
            RejectReason::NotConnected(status) => write!(f, "not connected ({status})"),
            RejectReason::AlreadyStreaming => write!(f, "a response is still streaming"),
        }
    }
}

/// The result of [`ChatController::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The response streamed to completion.
    Completed,
    /// The response failed; the bot message carries the error suffix.
    Failed,
    /// Nothing was sent and the message list is untouched.
    Rejected(RejectReason),
}

impl SendOutcome {
    /// Returns true if the message was accepted, whether or not the reply
    /// completed.
    pub fn was_sent(&self) -> bool {
        !matches!(self, SendOutcome::Rejected(_))
    }
}

/// Issues millisecond-based identifiers that never repeat.
#[derive(Debug, Default)]
struct MessageIds {
    last: i64,
}

impl MessageIds {
    fn resume_after(messages: &[Message]) -> Self {
        let last = messages
            .iter()
            .filter_map(|m| m.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Self { last }
    }

    fn next(&mut self, now: i64) -> String {
        self.last = now.max(self.last + 1);
        self.last.to_string()
    }
}

/// Orchestrates one conversation.
pub struct ChatController<A: ModelAdapter, S: KeyValueStore> {
    adapter: A,
    store: S,
    messages: Vec<Message>,
    status: ConnectionStatus,
    is_streaming: bool,
    ids: MessageIds,
    connect_delay: Duration,
}

impl<A: ModelAdapter, S: KeyValueStore> ChatController<A, S> {
    /// Creates a controller, restoring any history persisted in `store`.
    ///
    /// Messages that were still streaming when the history was written are
    /// finalized, since their responses can never resume.
    pub fn new(adapter: A, store: S) -> Self {
        let mut messages = store::load_history(&store);
        let mut repaired = false;
        for message in messages.iter_mut().filter(|m| m.is_streaming) {
            message.is_streaming = false;
            repaired = true;
        }
        let ids = MessageIds::resume_after(&messages);
        tracing::debug!(restored = messages.len(), "chat history loaded");
        let mut controller = Self {
            adapter,
            store,
            messages,
            status: ConnectionStatus::Disconnected,
            is_streaming: false,
            ids,
            connect_delay: DEFAULT_CONNECT_DELAY,
        };
        if repaired {
            controller.persist();
        }
        controller
    }

    /// Sets the delay applied after a successful initialization.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// The conversation so far, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// True while a response is streaming.
    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    /// True if [`send_message`](Self::send_message) would accept non-empty text.
    pub fn can_send(&self) -> bool {
        self.status.is_connected() && !self.is_streaming
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Initializes the adapter and moves to `Connected` or `Error`.
    pub async fn connect(&mut self, renderer: &mut dyn Renderer) -> ConnectionStatus {
        self.set_status(ConnectionStatus::Connecting, renderer);
        match self.adapter.initialize().await {
            Ok(()) => {
                if !self.connect_delay.is_zero() {
                    tokio::time::sleep(self.connect_delay).await;
                }
                tracing::info!("connected");
                self.set_status(ConnectionStatus::Connected, renderer);
            }
            Err(err) => {
                CHAT_CONNECT_FAILURES.click();
                tracing::error!(error = %err, "failed to initialize model client");
                renderer.print_error(&format!("Connection failed: {err}"));
                self.set_status(ConnectionStatus::Error, renderer);
            }
        }
        self.status
    }

    /// Reconnects unless already connected or streaming.
    pub async fn retry_connection(&mut self, renderer: &mut dyn Renderer) -> ConnectionStatus {
        if self.status.is_connected() || self.is_streaming {
            return self.status;
        }
        self.connect(renderer).await
    }

    /// Sends `text` and streams the reply into a new bot message.
    ///
    /// Rejected sends leave the message list untouched.  Failures are
    /// recorded on the bot message rather than returned, and never change
    /// the connection status.
    pub async fn send_message(&mut self, text: &str, renderer: &mut dyn Renderer) -> SendOutcome {
        if let Err(reason) = self.check_send(text) {
            CHAT_SENDS_REJECTED.click();
            tracing::debug!(%reason, "send rejected");
            return SendOutcome::Rejected(reason);
        }
        CHAT_SENDS.click();

        let now = now_millis();
        let user_id = self.ids.next(now);
        let bot_id = self.ids.next(now);
        self.messages.push(Message::user(user_id, text, now));
        self.messages.push(Message::placeholder(bot_id.clone(), now));
        self.is_streaming = true;
        self.changed(renderer);
        renderer.start_response();

        let result = self.stream_reply(&bot_id, text, renderer).await;

        let outcome = match &result {
            Ok(()) => SendOutcome::Completed,
            Err(err) => {
                CHAT_SEND_FAILURES.click();
                tracing::warn!(error = %err, "response failed");
                if let Some(bot) = self.message_mut(&bot_id) {
                    bot.content.push_str(ERROR_SUFFIX);
                    bot.is_error = true;
                }
                SendOutcome::Failed
            }
        };
        if let Some(bot) = self.message_mut(&bot_id) {
            bot.is_streaming = false;
        }
        self.is_streaming = false;
        self.changed(renderer);
        renderer.finish_response();
        if let Err(err) = result {
            renderer.print_error(&err.to_string());
        }
        outcome
    }

    /// Empties the conversation, its persisted copy, and the model session.
    pub fn clear_chat(&mut self, renderer: &mut dyn Renderer) {
        self.messages.clear();
        if let Err(err) = store::clear_history(&mut self.store) {
            tracing::warn!(error = %err, "failed to erase chat history");
        }
        self.adapter.reset_session();
        renderer.messages_changed(&self.messages);
    }

    fn check_send(&self, text: &str) -> std::result::Result<(), RejectReason> {
        if text.trim().is_empty() {
            Err(RejectReason::EmptyMessage)
        } else if !self.status.is_connected() {
            Err(RejectReason::NotConnected(self.status))
        } else if self.is_streaming {
            Err(RejectReason::AlreadyStreaming)
        } else {
            Ok(())
        }
    }

    async fn stream_reply(
        &mut self,
        bot_id: &str,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        let mut fragments = self.adapter.send_stream(text).await?;
        let mut accumulated = String::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            accumulated.push_str(&fragment.text);
            renderer.print_text(&fragment.text);
            if let Some(bot) = self.message_mut(bot_id) {
                bot.content.clone_from(&accumulated);
            }
            self.changed(renderer);
        }
        Ok(())
    }

    fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().rev().find(|m| m.id == id)
    }

    fn set_status(&mut self, status: ConnectionStatus, renderer: &mut dyn Renderer) {
        if self.status != status {
            self.status = status;
            renderer.print_status(status);
        }
    }

    fn changed(&mut self, renderer: &mut dyn Renderer) {
        self.persist();
        renderer.messages_changed(&self.messages);
    }

    fn persist(&mut self) {
        if let Err(err) = store::save_history(&mut self.store, &self.messages) {
            tracing::warn!(error = %err, "failed to persist chat history");
        }
    }
}
