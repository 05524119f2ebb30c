// src/backend/mod.rs

pub mod error;
pub mod ollama;
pub mod openai;
pub mod stream;
pub mod transport;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use error::{BackendError, BackendResult};
pub use ollama::{OllamaBackend, OllamaEndpoints};
pub use openai::OpenAIBackend;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};

use crate::models;
use crate::settings::{BackendConfig, BackendKind};
use crate::transcript::context_window;
use crate::types::{Attachment, ChatMsg, ConversationContext};

/// Returned instead of an empty answer.
pub const NO_RESPONSE: &str = "No response received";

/// Everything a backend needs to build one request.
#[derive(Debug)]
pub struct Prompt<'a> {
    pub system: &'a str,
    /// Prior user/assistant turns, oldest first, already windowed.
    pub history: Vec<&'a ChatMsg>,
    pub message: &'a str,
    pub attachments: &'a [Attachment],
}

impl<'a> Prompt<'a> {
    pub fn build(
        transcript: &'a [ChatMsg],
        message: &'a str,
        attachments: &'a [Attachment],
        config: &'a BackendConfig,
    ) -> BackendResult<Self> {
        let message = if message.trim().is_empty() {
            if attachments.is_empty() {
                return Err(BackendError::EmptyMessage);
            }
            config.language.default_caption()
        } else {
            message
        };

        Ok(Self {
            system: config.system_prompt(),
            history: context_window(transcript, config.max_context_size),
            message,
            attachments,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Replacement context, when the backend returned one.
    pub context: Option<ConversationContext>,
}

/// One variant per wire protocol.
pub enum Backend<'a> {
    Ollama(OllamaBackend<'a>),
    OpenAI(OpenAIBackend<'a>),
}

impl<'a> Backend<'a> {
    pub fn for_config(transport: &'a dyn HttpTransport, config: &'a BackendConfig) -> Self {
        match config.kind {
            BackendKind::Ollama => Self::Ollama(OllamaBackend::new(transport, config)),
            BackendKind::OpenAICompatible => Self::OpenAI(OpenAIBackend::new(transport, config)),
        }
    }

    pub async fn ask(
        &self,
        prompt: &Prompt<'_>,
        context: Option<&ConversationContext>,
        on_delta: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> BackendResult<Answer> {
        match self {
            Self::Ollama(b) => b.ask(prompt, context, on_delta).await,
            Self::OpenAI(b) => b.ask(prompt, on_delta).await,
        }
    }
}

/// Releases the in-flight flag when dropped, including when the ask is abandoned mid-stream.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Long-lived adapter: owns the transport, the Ollama conversation context and
/// the single in-flight slot.
pub struct ChatAdapter {
    transport: Arc<dyn HttpTransport>,
    context: Mutex<Option<ConversationContext>>,
    in_flight: AtomicBool,
}

impl ChatAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_context(transport, None)
    }

    pub fn with_context(
        transport: Arc<dyn HttpTransport>,
        context: Option<ConversationContext>,
    ) -> Self {
        Self {
            transport,
            context: Mutex::new(context),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> Option<ConversationContext> {
        self.context_slot().clone()
    }

    pub fn set_context(&self, context: Option<ConversationContext>) {
        *self.context_slot() = context;
    }

    pub fn clear_context(&self) {
        self.set_context(None);
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Ask the configured backend for a reply to `message`.
    ///
    /// Streams when `on_delta` is given, otherwise issues one blocking request.
    /// Never fails: errors come back as a user-facing string in place of the answer.
    pub async fn converse(
        &self,
        transcript: &[ChatMsg],
        message: &str,
        attachments: &[Attachment],
        config: &BackendConfig,
        on_delta: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> String {
        match self
            .try_converse(transcript, message, attachments, config, on_delta)
            .await
        {
            Ok(text) if text.is_empty() => NO_RESPONSE.to_string(),
            Ok(text) => text,
            Err(e) => {
                log::error!("[chat] {} request failed: {}", config.kind.as_str(), e);
                e.to_reply()
            }
        }
    }

    /// Models available on the configured backend; empty on any failure.
    pub async fn list_models(&self, config: &BackendConfig) -> Vec<String> {
        models::list_models(self.transport.as_ref(), config).await
    }

    async fn try_converse(
        &self,
        transcript: &[ChatMsg],
        message: &str,
        attachments: &[Attachment],
        config: &BackendConfig,
        on_delta: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> BackendResult<String> {
        let _in_flight = self.begin().ok_or(BackendError::Busy)?;

        let prompt = Prompt::build(transcript, message, attachments, config)?;
        let context = self.context();
        let backend = Backend::for_config(self.transport.as_ref(), config);

        let answer = backend.ask(&prompt, context.as_ref(), on_delta).await?;

        // Replaced wholesale; a reply without context leaves the old one in place.
        if let Some(context) = answer.context {
            self.set_context(Some(context));
        }

        Ok(answer.text)
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    fn context_slot(&self) -> MutexGuard<'_, Option<ConversationContext>> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
