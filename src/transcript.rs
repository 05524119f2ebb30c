// src/transcript.rs

use std::collections::HashSet;

use thiserror::Error;

use crate::types::{ChatMsg, MessageKind, Role};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("message id {0} already exists")]
    DuplicateId(String),

    #[error("an assistant reply is already in progress")]
    ReplyInProgress,

    #[error("no assistant reply is in progress")]
    NoPendingReply,
}

/// The most recent `max` user/assistant chat messages, oldest first.
pub fn context_window(messages: &[ChatMsg], max: usize) -> Vec<&ChatMsg> {
    let eligible: Vec<&ChatMsg> = messages
        .iter()
        .filter(|m| m.kind == MessageKind::Chat && matches!(m.role, Role::User | Role::Assistant))
        .collect();
    let skip = eligible.len().saturating_sub(max);
    eligible.into_iter().skip(skip).collect()
}

/// Append-only message log with at most one assistant reply being streamed.
///
/// Finalized messages are never edited; only the pending reply grows.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMsg>,
    ids: HashSet<String>,
    pending: Option<ChatMsg>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted messages, dropping any repeated id.
    pub fn from_messages(messages: Vec<ChatMsg>) -> Self {
        let mut transcript = Self::new();
        for msg in messages {
            if let Err(e) = transcript.push(msg) {
                log::warn!("[transcript] Dropping stored message: {}", e);
            }
        }
        transcript
    }

    pub fn push(&mut self, msg: ChatMsg) -> Result<(), TranscriptError> {
        if !self.ids.insert(msg.id.clone()) {
            return Err(TranscriptError::DuplicateId(msg.id));
        }
        self.messages.push(msg);
        Ok(())
    }

    /// Open an empty assistant reply that deltas are appended to.
    pub fn begin_reply(&mut self) -> Result<(), TranscriptError> {
        if self.pending.is_some() {
            return Err(TranscriptError::ReplyInProgress);
        }
        self.pending = Some(ChatMsg::assistant(String::new()));
        Ok(())
    }

    pub fn extend_reply(&mut self, delta: &str) {
        if let Some(reply) = self.pending.as_mut() {
            reply.content.push_str(delta);
        }
    }

    /// Partial text of the reply being streamed, if any.
    pub fn pending_reply(&self) -> Option<&str> {
        self.pending.as_ref().map(|m| m.content.as_str())
    }

    /// Freeze the pending reply with its final text and append it.
    pub fn finish_reply(&mut self, text: &str) -> Result<&ChatMsg, TranscriptError> {
        let mut reply = self.pending.take().ok_or(TranscriptError::NoPendingReply)?;
        reply.content = text.to_string();
        self.push(reply)?;
        Ok(&self.messages[self.messages.len() - 1])
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
        self.pending = None;
    }

    /// Finalized messages only.
    pub fn messages(&self) -> &[ChatMsg] {
        &self.messages
    }

    pub fn window(&self, max: usize) -> Vec<&ChatMsg> {
        context_window(&self.messages, max)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
