// src/models/discovery.rs

use std::collections::BTreeSet;

use crate::backend::ollama::tags_url;
use crate::backend::openai::models_url;
use crate::backend::{BackendError, BackendResult, HttpTransport};
use crate::settings::{BackendConfig, BackendKind};
use crate::types::{OllamaTagList, OpenAIModelList};

/// Lists models currently available on the configured backend.
/// Returns an empty list on any failure.
pub async fn list_models(transport: &dyn HttpTransport, config: &BackendConfig) -> Vec<String> {
    let result = match config.kind {
        BackendKind::Ollama => list_ollama_models(transport, config).await,
        BackendKind::OpenAICompatible => list_openai_models(transport, config).await,
    };

    match result {
        Ok(names) => {
            log::info!("[models] Found {} {} models", names.len(), config.kind.as_str());
            names
        }
        Err(e) => {
            log::warn!(
                "[models] Failed to fetch models from {}: {}",
                config.kind.as_str(),
                e
            );
            Vec::new()
        }
    }
}

async fn list_ollama_models(
    transport: &dyn HttpTransport,
    config: &BackendConfig,
) -> BackendResult<Vec<String>> {
    let url = tags_url(&config.endpoint);
    log::debug!("[models] Fetching Ollama models from {}", url);

    let body = fetch(transport, &url, config.api_key.as_deref()).await?;
    let tags: OllamaTagList = serde_json::from_str(&body)?;

    // Prefer name, fall back to model
    Ok(unique_sorted(
        tags.models.into_iter().filter_map(|m| m.name.or(m.model)),
    ))
}

async fn list_openai_models(
    transport: &dyn HttpTransport,
    config: &BackendConfig,
) -> BackendResult<Vec<String>> {
    let url = models_url(&config.endpoint);
    log::debug!("[models] Fetching OpenAI-compatible models from {}", url);

    let body = fetch(transport, &url, config.api_key.as_deref()).await?;
    let list: OpenAIModelList = serde_json::from_str(&body)?;

    Ok(unique_sorted(
        list.data.into_iter().filter_map(|m| m.id.or(m.model)),
    ))
}

async fn fetch(
    transport: &dyn HttpTransport,
    url: &str,
    api_key: Option<&str>,
) -> BackendResult<String> {
    let response = transport.get(url, api_key).await?;
    if !response.is_success() {
        return Err(BackendError::Status {
            status: response.status,
        });
    }
    response.text().await
}

/// Drops empty names and duplicates, sorted lexicographically.
pub fn unique_sorted(names: impl IntoIterator<Item = String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|n| !n.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
