// src/backend/ollama.rs

use reqwest::Url;

use super::error::{BackendError, BackendResult};
use super::stream::{read_stream, Framing};
use super::transport::HttpTransport;
use super::{Answer, Prompt};
use crate::settings::BackendConfig;
use crate::types::{
    ConversationContext, OllamaChatRequest, OllamaChunk, OllamaCompletionRequest,
    OllamaGenerateRequest, OllamaMessage,
};

const CHAT_PATH: &str = "/api/chat";
const GENERATE_PATH: &str = "/api/generate";
const TAGS_PATH: &str = "/api/tags";

/// Chat and generate URLs derived from whichever one was configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaEndpoints {
    pub chat: String,
    pub generate: String,
    /// False when the endpoint names neither API; it is then used as a plain completion URL.
    pub native: bool,
}

impl OllamaEndpoints {
    pub fn resolve(endpoint: &str) -> Self {
        let has_chat = endpoint.contains(CHAT_PATH);
        let has_generate = endpoint.contains(GENERATE_PATH);

        let chat = if has_chat {
            endpoint.to_string()
        } else if has_generate {
            endpoint.replacen(GENERATE_PATH, CHAT_PATH, 1)
        } else {
            endpoint.to_string()
        };

        let generate = if has_generate {
            endpoint.to_string()
        } else if has_chat {
            endpoint.replacen(CHAT_PATH, GENERATE_PATH, 1)
        } else {
            endpoint.to_string()
        };

        Self {
            chat,
            generate,
            native: has_chat || has_generate,
        }
    }
}

/// `<origin>/api/tags` for the configured endpoint.
pub fn tags_url(endpoint: &str) -> String {
    if let Ok(url) = Url::parse(endpoint) {
        let origin = url.origin();
        if origin.is_tuple() {
            return format!("{}{}", origin.ascii_serialization(), TAGS_PATH);
        }
    }

    if endpoint.contains(GENERATE_PATH) {
        return endpoint.replacen(GENERATE_PATH, TAGS_PATH, 1);
    }
    if endpoint.contains(CHAT_PATH) {
        return endpoint.replacen(CHAT_PATH, TAGS_PATH, 1);
    }

    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/api") {
        format!("{}/tags", base)
    } else {
        format!("{}{}", base, TAGS_PATH)
    }
}

pub struct OllamaBackend<'a> {
    transport: &'a dyn HttpTransport,
    config: &'a BackendConfig,
}

impl<'a> OllamaBackend<'a> {
    pub fn new(transport: &'a dyn HttpTransport, config: &'a BackendConfig) -> Self {
        Self { transport, config }
    }

    pub async fn ask(
        &self,
        prompt: &Prompt<'_>,
        context: Option<&ConversationContext>,
        on_delta: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> BackendResult<Answer> {
        let stream = on_delta.is_some();
        let api_key = self.config.api_key.as_deref();
        let endpoints = OllamaEndpoints::resolve(&self.config.endpoint);

        let response = if endpoints.native {
            let body = serde_json::to_value(self.chat_request(prompt, stream))?;
            let response = self.transport.post_json(&endpoints.chat, &body, api_key).await?;

            if response.status == 404 {
                log::info!(
                    "[ollama] {} not found, falling back to {}",
                    endpoints.chat,
                    endpoints.generate
                );
                drop(response);
                let body = serde_json::to_value(self.generate_request(prompt, context, stream))?;
                self.transport
                    .post_json(&endpoints.generate, &body, api_key)
                    .await?
            } else {
                response
            }
        } else {
            let body = serde_json::to_value(self.completion_request(prompt, stream))?;
            self.transport
                .post_json(&self.config.endpoint, &body, api_key)
                .await?
        };

        if !response.is_success() {
            log::warn!("[ollama] request failed with HTTP {}", response.status);
            return Err(BackendError::Status {
                status: response.status,
            });
        }

        match on_delta {
            Some(sink) => {
                let reduced = read_stream::<OllamaChunk>(response, Framing::Ndjson, sink).await?;
                Ok(Answer {
                    text: reduced.text,
                    context: reduced
                        .last
                        .and_then(|chunk| chunk.context)
                        .map(ConversationContext),
                })
            }
            None => {
                let body = response.text().await?;
                let chunk: OllamaChunk = serde_json::from_str(&body)?;
                Ok(Answer {
                    text: chunk.text().unwrap_or_default().to_string(),
                    context: chunk.context.map(ConversationContext),
                })
            }
        }
    }

    pub fn chat_request(&self, prompt: &Prompt<'_>, stream: bool) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(prompt.history.len() + 2);
        messages.push(OllamaMessage {
            role: "system".to_string(),
            content: prompt.system.to_string(),
            images: Vec::new(),
        });

        for msg in &prompt.history {
            messages.push(OllamaMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content.clone(),
                images: msg.images.iter().map(|i| i.raw_base64().to_string()).collect(),
            });
        }

        messages.push(OllamaMessage {
            role: "user".to_string(),
            content: prompt.message.to_string(),
            images: prompt
                .attachments
                .iter()
                .map(|i| i.raw_base64().to_string())
                .collect(),
        });

        OllamaChatRequest {
            model: self.config.model.clone(),
            messages,
            stream,
            think: false,
        }
    }

    pub fn generate_request(
        &self,
        prompt: &Prompt<'_>,
        context: Option<&ConversationContext>,
        stream: bool,
    ) -> OllamaGenerateRequest {
        OllamaGenerateRequest {
            model: self.config.model.clone(),
            system: prompt.system.to_string(),
            prompt: prompt.message.to_string(),
            context: context.map(|c| c.tokens().to_vec()),
            stream,
            think: false,
        }
    }

    pub fn completion_request(&self, prompt: &Prompt<'_>, stream: bool) -> OllamaCompletionRequest {
        OllamaCompletionRequest {
            model: self.config.model.clone(),
            prompt: format!("{}\n\nUser: {}", prompt.system, prompt.message),
            stream,
            think: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::transport::ReqwestTransport;
    use crate::settings::BackendConfig;
    use crate::types::{Attachment, ChatMsg};

    #[test]
    fn generate_endpoint_derives_chat() {
        let e = OllamaEndpoints::resolve("http://localhost:11434/api/generate");
        assert_eq!(e.chat, "http://localhost:11434/api/chat");
        assert_eq!(e.generate, "http://localhost:11434/api/generate");
        assert!(e.native);
    }

    #[test]
    fn chat_endpoint_derives_generate() {
        let e = OllamaEndpoints::resolve("http://gpu-box:11434/api/chat");
        assert_eq!(e.chat, "http://gpu-box:11434/api/chat");
        assert_eq!(e.generate, "http://gpu-box:11434/api/generate");
    }

    #[test]
    fn unknown_endpoint_is_not_native() {
        let e = OllamaEndpoints::resolve("http://localhost:5000/complete");
        assert!(!e.native);
        assert_eq!(e.chat, "http://localhost:5000/complete");
    }

    #[test]
    fn tags_url_uses_origin() {
        assert_eq!(
            tags_url("http://localhost:11434/api/generate"),
            "http://localhost:11434/api/tags"
        );
        assert_eq!(tags_url("https://ollama.lan/proxy/api/chat"), "https://ollama.lan/api/tags");
    }

    #[test]
    fn tags_url_without_scheme_rewrites_path() {
        assert_eq!(tags_url("localhost:11434/api/chat"), "localhost:11434/api/tags");
        assert_eq!(tags_url("/ollama/api"), "/ollama/api/tags");
    }

    #[test]
    fn chat_request_strips_data_url_prefix() {
        let transport = ReqwestTransport::new().unwrap();
        let config = BackendConfig::default();
        let backend = OllamaBackend::new(&transport, &config);

        let mut earlier = ChatMsg::user("a fox");
        earlier.images = vec![Attachment::from_data_url("data:image/png;base64,AAAA")];
        let current = [Attachment::from_data_url("data:image/jpeg;base64,BBBB")];
        let prompt = Prompt {
            system: "sys",
            history: vec![&earlier],
            message: "make it red",
            attachments: &current,
        };

        let body = serde_json::to_value(backend.chat_request(&prompt, true)).unwrap();
        assert_eq!(body["think"], false);
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][0].get("images").is_none());
        assert_eq!(body["messages"][1]["images"][0], "AAAA");
        assert_eq!(body["messages"][2]["content"], "make it red");
        assert_eq!(body["messages"][2]["images"][0], "BBBB");
    }

    #[test]
    fn generate_request_omits_absent_context() {
        let transport = ReqwestTransport::new().unwrap();
        let config = BackendConfig::default();
        let backend = OllamaBackend::new(&transport, &config);
        let prompt = Prompt {
            system: "sys",
            history: Vec::new(),
            message: "hi",
            attachments: &[],
        };

        let body = serde_json::to_value(backend.generate_request(&prompt, None, false)).unwrap();
        assert!(body.get("context").is_none());
        assert_eq!(body["system"], "sys");
        assert_eq!(body["prompt"], "hi");

        let ctx = ConversationContext(vec![7, 8]);
        let body = serde_json::to_value(backend.generate_request(&prompt, Some(&ctx), false)).unwrap();
        assert_eq!(body["context"], serde_json::json!([7, 8]));
    }
}
