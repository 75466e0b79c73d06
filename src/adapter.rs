//! Model client adapter.
//!
//! The adapter owns exactly one conversation context at a time and hands out
//! lazily-evaluated fragment streams for new turns.  [`ModelAdapter`] is the
//! seam the chat controller depends on; [`GeminiAdapter`] implements it over
//! the Gemini REST API.
//!
//! Gemini's REST endpoint is stateless, so a [`ChatSession`] replays its
//! recorded turns with every request.  A turn is recorded only after its
//! stream finishes cleanly with some text, which keeps the history a strict
//! alternation of user and model turns.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::stream::{self, Stream, StreamExt};

use crate::client::Gemini;
use crate::error::{Error, Result};
use crate::observability::{SESSION_RESETS, STREAM_DURATION};
use crate::types::{Content, Fragment, GenerateContentRequest, GenerateContentResponse, Model};

/// The system instruction every session is created with.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful, witty, and precise AI assistant. \
You answer questions clearly using Markdown formatting. You can use emojis to make your responses \
more engaging but at appropriate times.
If the user asks for code, provide it in code blocks with language tags.
Keep your responses concise but helpful.";

/// A lazy, single-pass stream of response fragments.
///
/// The stream ends after the server signals completion or after the first
/// `Err` item.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// Behavior the chat controller expects from a model backend.
#[async_trait::async_trait]
pub trait ModelAdapter: Send {
    /// Construct the client and a fresh session, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the credential is missing or malformed.
    async fn initialize(&mut self) -> Result<()>;

    /// Discard the current session and start an empty one with the same
    /// configuration.  Does nothing if the adapter was never initialized.
    fn reset_session(&mut self);

    /// Submit `text` as the next user turn and stream the reply.
    ///
    /// # Errors
    ///
    /// Returns a session error if no session can be created, or a transport
    /// error if the request cannot be sent.
    async fn send_stream(&mut self, text: &str) -> Result<FragmentStream>;
}

/// Model and instruction a session is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// The model that answers every turn.
    pub model: Model,

    /// Instruction applied to the whole conversation.
    pub system_instruction: String,
}

impl SessionConfig {
    /// Creates a session configuration.
    pub fn new(model: Model, system_instruction: impl Into<String>) -> Self {
        Self {
            model,
            system_instruction: system_instruction.into(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(Model::default(), DEFAULT_SYSTEM_INSTRUCTION)
    }
}

/// A conversation context: fixed configuration plus the turns so far.
#[derive(Debug)]
pub struct ChatSession {
    config: SessionConfig,
    history: Arc<Mutex<Vec<Content>>>,
}

impl ChatSession {
    /// Creates an empty session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the session's model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Returns the session's system instruction.
    pub fn system_instruction(&self) -> &str {
        &self.config.system_instruction
    }

    /// Returns a snapshot of the recorded turns.
    pub fn history(&self) -> Vec<Content> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds the request that sends `text` after the recorded turns.
    pub fn request_for(&self, text: &str) -> GenerateContentRequest {
        let mut contents = self.history();
        contents.push(Content::user(text));
        GenerateContentRequest::new(contents)
            .with_system_instruction(self.config.system_instruction.clone())
    }

    /// Sends `text` as the next turn and returns the reply as fragments.
    pub async fn send_message_stream(&self, client: &Gemini, text: &str) -> Result<FragmentStream> {
        let request = self.request_for(text);
        let events = client
            .stream_generate_content(&self.config.model, &request)
            .await?;
        Ok(fragments(
            events,
            Arc::clone(&self.history),
            Content::user(text),
        ))
    }
}

struct FragmentState<S> {
    events: S,
    history: Arc<Mutex<Vec<Content>>>,
    user_turn: Option<Content>,
    reply: String,
    started: Instant,
    done: bool,
}

/// Map response chunks to fragments, recording the turn on clean completion.
pub(crate) fn fragments<S>(
    events: S,
    history: Arc<Mutex<Vec<Content>>>,
    user_turn: Content,
) -> FragmentStream
where
    S: Stream<Item = Result<GenerateContentResponse>> + Send + Unpin + 'static,
{
    let state = FragmentState {
        events,
        history,
        user_turn: Some(user_turn),
        reply: String::new(),
        started: Instant::now(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        match state.events.next().await {
            Some(Ok(chunk)) => {
                let text = chunk.text();
                state.reply.push_str(&text);
                Some((Ok(Fragment::new(text)), state))
            }
            Some(Err(err)) => {
                state.done = true;
                STREAM_DURATION.add(state.started.elapsed().as_secs_f64());
                tracing::warn!(error = %err, "response stream failed");
                Some((Err(err), state))
            }
            None => {
                state.done = true;
                STREAM_DURATION.add(state.started.elapsed().as_secs_f64());
                if let Some(user_turn) = state.user_turn.take()
                    && !state.reply.is_empty()
                {
                    let mut history = state
                        .history
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    history.push(user_turn);
                    history.push(Content::model(std::mem::take(&mut state.reply)));
                }
                tracing::debug!("response stream finished");
                None
            }
        }
    }))
}

/// [`ModelAdapter`] backed by the Gemini API.
#[derive(Debug)]
pub struct GeminiAdapter {
    config: SessionConfig,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    client: Option<Gemini>,
    session: Option<ChatSession>,
}

impl GeminiAdapter {
    /// Creates an adapter that reads its credential from the environment.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            api_key: None,
            base_url: None,
            timeout: None,
            client: None,
            session: None,
        }
    }

    /// Uses an explicit API key instead of the environment.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the live session, if one exists.
    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    /// Returns the live session, initializing the adapter first if needed.
    ///
    /// # Errors
    ///
    /// Returns a session error wrapping the initialization failure.
    pub fn get_session(&mut self) -> Result<&ChatSession> {
        if self.session.is_none() {
            self.connect().map_err(|err| {
                Error::session(
                    "chat session could not be initialized",
                    Some(Box::new(err)),
                )
            })?;
        }
        self.session
            .as_ref()
            .ok_or_else(|| Error::session("chat session could not be initialized", None))
    }

    fn connect(&mut self) -> Result<()> {
        let client = Gemini::with_options(self.api_key.clone(), self.base_url.clone(), self.timeout)?;
        self.client = Some(client);
        self.session = Some(ChatSession::new(self.config.clone()));
        tracing::info!(model = %self.config.model, "gemini client initialized");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ModelAdapter for GeminiAdapter {
    async fn initialize(&mut self) -> Result<()> {
        self.connect()
    }

    fn reset_session(&mut self) {
        if self.client.is_some() {
            self.session = Some(ChatSession::new(self.config.clone()));
            SESSION_RESETS.click();
            tracing::debug!("chat session reset");
        }
    }

    async fn send_stream(&mut self, text: &str) -> Result<FragmentStream> {
        self.get_session()?;
        match (&self.client, &self.session) {
            (Some(client), Some(session)) => session.send_message_stream(client, text).await,
            _ => Err(Error::session("no live chat session", None)),
        }
    }
}
