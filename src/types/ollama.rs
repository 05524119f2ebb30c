// src/types/ollama.rs

use serde::{Deserialize, Serialize};

/// Body for `/api/chat`.
#[derive(Serialize, Debug)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    pub think: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
    // Raw base64, no data-URL prefix
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// Body for `/api/generate`, used when `/api/chat` is missing.
#[derive(Serialize, Debug)]
pub struct OllamaGenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,
    pub stream: bool,
    pub think: bool,
}

/// Body for an endpoint that is neither `/api/chat` nor `/api/generate`.
#[derive(Serialize, Debug)]
pub struct OllamaCompletionRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub think: bool,
}

/// One NDJSON line from either endpoint, or the whole non-streaming body.
#[derive(Deserialize, Debug, Default)]
pub struct OllamaChunk {
    #[serde(default)]
    pub message: Option<OllamaChunkMessage>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub context: Option<Vec<i64>>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Deserialize, Debug)]
pub struct OllamaChunkMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl OllamaChunk {
    /// `message.content`, falling back to `response` when the former is empty.
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .filter(|s| !s.is_empty())
            .or_else(|| self.response.as_deref())
    }
}

// GET /api/tags
#[derive(Deserialize, Debug, Default)]
pub struct OllamaTagList {
    #[serde(default)]
    pub models: Vec<OllamaTag>,
}

#[derive(Deserialize, Debug)]
pub struct OllamaTag {
    pub name: Option<String>,
    pub model: Option<String>,
}
