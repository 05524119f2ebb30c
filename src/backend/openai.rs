// src/backend/openai.rs

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use super::error::{BackendError, BackendResult};
use super::stream::{read_stream, Framing};
use super::transport::HttpTransport;
use super::{Answer, Prompt};
use crate::settings::BackendConfig;
use crate::types::{
    Attachment, ImageUrlData, OpenAIContent, OpenAIContentPart, OpenAIMessage,
    OpenAINonStreamResponse, OpenAIRequest, OpenAIStreamResponse,
};

static V1_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/v1/.*$").expect("valid regex"));

/// Models listing URL for a chat completions endpoint.
pub fn models_url(endpoint: &str) -> String {
    if endpoint.contains("/v1/") {
        return V1_SUFFIX.replace(endpoint, "/v1/models").into_owned();
    }

    match Url::parse(endpoint) {
        Ok(url) if url.origin().is_tuple() => {
            format!("{}/v1/models", url.origin().ascii_serialization())
        }
        _ => format!("{}/v1/models", endpoint.trim_end_matches('/')),
    }
}

fn message_content(text: &str, images: &[Attachment]) -> OpenAIContent {
    if images.is_empty() {
        return OpenAIContent::Text(text.to_string());
    }

    let mut parts: Vec<OpenAIContentPart> = vec![OpenAIContentPart::Text {
        text: text.to_string(),
    }];

    for image in images {
        parts.push(OpenAIContentPart::ImageUrl {
            image_url: ImageUrlData {
                url: image.data_url().to_string(),
            },
        });
    }

    OpenAIContent::Parts(parts)
}

pub struct OpenAIBackend<'a> {
    transport: &'a dyn HttpTransport,
    config: &'a BackendConfig,
}

impl<'a> OpenAIBackend<'a> {
    pub fn new(transport: &'a dyn HttpTransport, config: &'a BackendConfig) -> Self {
        Self { transport, config }
    }

    pub async fn ask(
        &self,
        prompt: &Prompt<'_>,
        on_delta: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> BackendResult<Answer> {
        let body = serde_json::to_value(self.request(prompt, on_delta.is_some()))?;
        let response = self
            .transport
            .post_json(&self.config.endpoint, &body, self.config.api_key.as_deref())
            .await?;

        if !response.is_success() {
            log::warn!("[openai] request failed with HTTP {}", response.status);
            return Err(BackendError::Status {
                status: response.status,
            });
        }

        let text = match on_delta {
            Some(sink) => {
                read_stream::<OpenAIStreamResponse>(response, Framing::Sse, sink)
                    .await?
                    .text
            }
            None => {
                let body = response.text().await?;
                let parsed: OpenAINonStreamResponse = serde_json::from_str(&body)?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message)
                    .and_then(|m| m.content)
                    .unwrap_or_default()
            }
        };

        Ok(Answer {
            text,
            context: None,
        })
    }

    pub fn request(&self, prompt: &Prompt<'_>, stream: bool) -> OpenAIRequest {
        let mut messages: Vec<OpenAIMessage> = vec![OpenAIMessage {
            role: "system".to_string(),
            content: OpenAIContent::Text(prompt.system.to_string()),
        }];

        for msg in &prompt.history {
            messages.push(OpenAIMessage {
                role: msg.role.as_str().to_string(),
                content: message_content(&msg.content, &msg.images),
            });
        }

        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: message_content(prompt.message, prompt.attachments),
        });

        OpenAIRequest {
            model: self.config.model.clone(),
            messages,
            stream,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            include_reasoning: false,
            reasoning_effort: None,
        }
    }
}
