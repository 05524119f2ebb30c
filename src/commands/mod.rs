// src/commands/mod.rs

pub mod chat;
pub mod model;

pub use chat::*;
pub use model::*;

use thiserror::Error;

use crate::settings::SettingsError;
use crate::store::StoreError;
use crate::transcript::TranscriptError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("model name is empty")]
    EmptyModelName,

    #[error("another request is already in progress")]
    Busy,

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
