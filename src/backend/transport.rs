// src/backend/transport.rs

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;

use super::error::{BackendError, BackendResult};

pub type ByteStream = Pin<Box<dyn Stream<Item = BackendResult<Bytes>> + Send>>;

/// Status plus a body that is read lazily, chunk by chunk.
pub struct HttpResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl HttpResponse {
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self { status, body }
    }

    /// Response whose body yields the given chunks in order.
    pub fn from_chunks<I, B>(status: u16, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<BackendResult<Bytes>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(status, Box::pin(futures::stream::iter(chunks)))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into one string.
    pub async fn text(self) -> BackendResult<String> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let bytes: Vec<u8> = chunks.concat();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST a JSON body (`Content-Type: application/json`).
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        api_key: Option<&str>,
    ) -> BackendResult<HttpResponse>;

    async fn get(&self, url: &str, api_key: Option<&str>) -> BackendResult<HttpResponse>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> BackendResult<Self> {
        // No overall timeout: a streamed answer can legitimately take minutes.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    fn into_response(response: reqwest::Response) -> HttpResponse {
        let status = response.status().as_u16();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(BackendError::from));
        HttpResponse::new(status, Box::pin(body))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        api_key: Option<&str>,
    ) -> BackendResult<HttpResponse> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);

        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        Ok(Self::into_response(response))
    }

    async fn get(&self, url: &str, api_key: Option<&str>) -> BackendResult<HttpResponse> {
        let mut request = self.client.get(url);

        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        Ok(Self::into_response(response))
    }
}
