// src/types/openai.rs

use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub include_reasoning: bool,
    // Serialized as an explicit null
    pub reasoning_effort: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: OpenAIContent,
}

#[derive(Serialize, Clone, Debug)]
#[serde(untagged)]
pub enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIContentPart>),
}

#[derive(Serialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum OpenAIContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrlData },
}

#[derive(Serialize, Clone, Debug)]
pub struct ImageUrlData {
    pub url: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct OpenAIStreamResponse {
    #[serde(default)]
    pub choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIStreamChoice {
    #[serde(default)]
    pub delta: Option<OpenAIDelta>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct OpenAIDelta {
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAINonStreamResponse {
    #[serde(default)]
    pub choices: Vec<OpenAINonStreamChoice>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAINonStreamChoice {
    pub message: Option<OpenAINonStreamMessage>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAINonStreamMessage {
    pub content: Option<String>,
}

// GET /v1/models
#[derive(Deserialize, Debug, Default)]
pub struct OpenAIModelList {
    #[serde(default)]
    pub data: Vec<OpenAIModelEntry>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIModelEntry {
    pub id: Option<String>,
    pub model: Option<String>,
}
