// src/commands/chat.rs

use crate::state::AppState;
use crate::store::{CONTEXT_KEY, HISTORY_KEY};
use crate::types::{Attachment, ChatMsg, Role};

use super::CommandError;

#[derive(Debug, Clone, Default)]
pub struct SendMessageArgs {
    pub text: String,
    pub images: Vec<Attachment>,
}

/// Send one user message and record the reply.
///
/// With streaming enabled every delta reaches both the transcript's pending
/// reply and `on_delta`. The returned message is the frozen assistant reply,
/// which carries the formatted error text if the backend failed.
pub async fn send_message(
    args: SendMessageArgs,
    state: &AppState,
    mut on_delta: Option<&mut (dyn FnMut(&str) + Send)>,
) -> Result<ChatMsg, CommandError> {
    let SendMessageArgs { text, images } = args;
    let text = text.trim().to_string();
    if text.is_empty() && images.is_empty() {
        return Err(CommandError::EmptyMessage);
    }

    let settings = state.settings();
    let config = &settings.backend;

    // Window is taken before the new message is appended
    let history = {
        let mut transcript = state.transcript();
        if transcript.pending_reply().is_some() {
            return Err(CommandError::Busy);
        }

        let history: Vec<ChatMsg> = transcript
            .window(config.max_context_size)
            .into_iter()
            .cloned()
            .collect();

        let stored = if text.is_empty() {
            config.language.image_placeholder().to_string()
        } else {
            text.clone()
        };
        transcript.push(ChatMsg::new(Role::User, stored, images.clone()))?;
        transcript.begin_reply()?;
        history
    };

    log::info!(
        "[chat] Sending to {} ({}), {} images, {} prior messages",
        config.kind.as_str(),
        config.model,
        images.len(),
        history.len()
    );

    let mut forward = |delta: &str| {
        state.transcript().extend_reply(delta);
        if let Some(cb) = on_delta.as_mut() {
            cb(delta);
        }
    };
    let callback: Option<&mut (dyn FnMut(&str) + Send)> = if settings.behavior.streaming_enabled {
        Some(&mut forward)
    } else {
        None
    };

    let answer = state
        .adapter
        .converse(&history, &text, &images, config, callback)
        .await;

    let reply = state.transcript().finish_reply(&answer)?.clone();

    if let Err(e) = state.persist() {
        log::warn!("[chat] Failed to persist history: {}", e);
    }

    Ok(reply)
}

/// Drop every message and the conversation context, in memory and in the store.
/// Refused while a reply is still streaming.
pub fn clear_history(state: &AppState) -> Result<(), CommandError> {
    {
        let mut transcript = state.transcript();
        if state.adapter.is_busy() || transcript.pending_reply().is_some() {
            return Err(CommandError::Busy);
        }
        transcript.clear();
    }
    state.adapter.clear_context();
    state.store.remove(HISTORY_KEY)?;
    state.store.remove(CONTEXT_KEY)?;
    log::info!("[chat] History cleared");
    Ok(())
}

pub fn get_history(state: &AppState) -> Vec<ChatMsg> {
    state.transcript().messages().to_vec()
}

