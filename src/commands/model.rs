// src/commands/model.rs

use crate::settings::{AppSettings, BackendKind};
use crate::state::AppState;
use crate::store::CONTEXT_KEY;

use super::CommandError;

#[derive(Debug, Clone)]
pub struct SetBackendArgs {
    pub kind: BackendKind,
    pub endpoint: String,
}

pub async fn list_models(state: &AppState) -> Vec<String> {
    let config = state.settings().backend;
    state.adapter.list_models(&config).await
}

pub fn select_model(name: &str, state: &AppState) -> Result<AppSettings, CommandError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(CommandError::EmptyModelName);
    }
    log::info!("[model] Selecting {}", name);
    Ok(state.update_settings(|s| s.backend.model = name)?)
}

/// Point the adapter at another server. Changing kind or endpoint drops the stored context.
pub fn set_backend(args: SetBackendArgs, state: &AppState) -> Result<AppSettings, CommandError> {
    let current = state.settings().backend;
    let changed = current.kind != args.kind || current.endpoint != args.endpoint;

    log::info!(
        "[model] Backend set to {} at {}",
        args.kind.as_str(),
        args.endpoint
    );
    let updated = state.update_settings(|s| {
        s.backend.kind = args.kind;
        s.backend.endpoint = args.endpoint;
    })?;

    if changed {
        state.adapter.clear_context();
        state.store.remove(CONTEXT_KEY)?;
    }
    Ok(updated)
}

/// Restore default settings. The context is dropped if that moves the backend.
pub fn reset_settings(state: &AppState) -> Result<AppSettings, CommandError> {
    let current = state.settings().backend;
    let defaults = state.reset_settings()?;
    log::info!("[model] Settings reset to defaults");

    if current.kind != defaults.backend.kind || current.endpoint != defaults.backend.endpoint {
        state.adapter.clear_context();
        state.store.remove(CONTEXT_KEY)?;
    }
    Ok(defaults)
}
