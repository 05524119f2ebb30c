// src/state.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{ChatAdapter, HttpTransport, ReqwestTransport};
use crate::db::{resolve_db_path, SqliteStore};
use crate::settings::{self, AppSettings, SettingsError};
use crate::store::{self, KeyValueStore, MemoryStore, StoreError, CONTEXT_KEY, HISTORY_KEY};
use crate::transcript::Transcript;
use crate::types::{ChatMsg, ConversationContext};

/// Everything the commands operate on, built once at startup.
pub struct AppState {
    settings: Mutex<AppSettings>,
    settings_path: Option<PathBuf>,
    pub store: Arc<dyn KeyValueStore>,
    transcript: Mutex<Transcript>,
    pub adapter: ChatAdapter,
}

impl AppState {
    /// Restores the transcript and conversation context from `store`.
    pub fn new(
        settings: AppSettings,
        settings_path: Option<PathBuf>,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let transcript = if settings.behavior.save_history {
            let messages: Vec<ChatMsg> =
                store::load_json(store.as_ref(), HISTORY_KEY).unwrap_or_default();
            Transcript::from_messages(messages)
        } else {
            Transcript::new()
        };
        let context: Option<ConversationContext> = store::load_json(store.as_ref(), CONTEXT_KEY);

        log::info!(
            "[state] Restored {} messages, context {}",
            transcript.len(),
            if context.is_some() { "present" } else { "absent" }
        );

        Self {
            settings: Mutex::new(settings),
            settings_path,
            store,
            transcript: Mutex::new(transcript),
            adapter: ChatAdapter::with_context(transport, context),
        }
    }

    /// Load settings from the user's config dir and open the matching store.
    pub fn open() -> anyhow::Result<Self> {
        let path = settings::get_settings_path()?;
        let settings = settings::load_settings(&path)?;

        let store: Arc<dyn KeyValueStore> = match resolve_db_path() {
            Some(db_path) if settings.behavior.save_history => Arc::new(SqliteStore::open(&db_path)?),
            _ => {
                log::info!("[state] History is kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };
        let transport = Arc::new(ReqwestTransport::new()?);

        Ok(Self::new(settings, Some(path), store, transport))
    }

    pub fn settings(&self) -> AppSettings {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Apply `change`, then write the result to the settings file if there is one.
    pub fn update_settings(
        &self,
        change: impl FnOnce(&mut AppSettings),
    ) -> Result<AppSettings, SettingsError> {
        let updated = {
            let mut guard = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
            change(&mut guard);
            guard.clone()
        };
        if let Some(path) = &self.settings_path {
            settings::save_settings(path, &updated)?;
        }
        Ok(updated)
    }

    /// Back to defaults, overwriting the settings file if there is one.
    pub fn reset_settings(&self) -> Result<AppSettings, SettingsError> {
        let defaults = match &self.settings_path {
            Some(path) => settings::reset_settings(path)?,
            None => AppSettings::default(),
        };
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = defaults.clone();
        Ok(defaults)
    }

    pub fn transcript(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the transcript (when history is saved) and the adapter's context.
    pub fn persist(&self) -> Result<(), StoreError> {
        if self.settings().behavior.save_history {
            let messages = self.transcript().messages().to_vec();
            store::save_json(self.store.as_ref(), HISTORY_KEY, Some(&messages))?;
        }
        store::save_json(self.store.as_ref(), CONTEXT_KEY, self.adapter.context().as_ref())
    }
}
