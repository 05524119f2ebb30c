// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use prompt_assistant_lib::backend::BackendResult;
use prompt_assistant_lib::{BackendError, HttpResponse, HttpTransport};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
    pub api_key: Option<String>,
}

enum Scripted {
    Response(HttpResponse),
    Error(String),
}

/// Hands out queued responses in order and records every request it sees.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: HttpResponse) {
        self.script.lock().unwrap().push_back(Scripted::Response(response));
    }

    pub fn respond_with<I, B>(&self, status: u16, chunks: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<bytes::Bytes>,
    {
        self.respond(HttpResponse::from_chunks(status, chunks));
    }

    pub fn fail(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Error(message.to_string()));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, recorded: Recorded) -> BackendResult<HttpResponse> {
        self.requests.lock().unwrap().push(recorded);
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Error(message)) => Err(BackendError::Transport(message)),
            None => Err(BackendError::Transport("no scripted response".to_string())),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        api_key: Option<&str>,
    ) -> BackendResult<HttpResponse> {
        self.next(Recorded {
            method: "POST",
            url: url.to_string(),
            body: Some(body.clone()),
            api_key: api_key.map(str::to_string),
        })
    }

    async fn get(&self, url: &str, api_key: Option<&str>) -> BackendResult<HttpResponse> {
        self.next(Recorded {
            method: "GET",
            url: url.to_string(),
            body: None,
            api_key: api_key.map(str::to_string),
        })
    }
}

pub fn sse(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let chunk = serde_json::json!({ "choices": [{ "delta": { "content": delta } }] });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn ndjson(deltas: &[&str], context: Option<&[i64]>) -> String {
    let mut body = String::new();
    for (i, delta) in deltas.iter().enumerate() {
        let mut chunk = serde_json::json!({ "response": delta, "done": i + 1 == deltas.len() });
        if let (Some(ctx), true) = (context, i + 1 == deltas.len()) {
            chunk["context"] = serde_json::json!(ctx);
        }
        body.push_str(&format!("{}\n", chunk));
    }
    body
}
