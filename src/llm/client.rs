//! HTTP client for an OpenAI-compatible streaming chat-completions endpoint.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use tracing::{debug, info};

use super::sse::{SseDecoder, SseEvent};
use super::types::{ChatBackend, ChatRequest, LlmError};
use crate::config::{AppConfig, Timeouts};

pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl ChatClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeouts: Timeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, url: url.into(), api_key })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
        Self::new(config.api_url.clone(), config.api_key.clone(), config.timeouts)
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatClient {
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        on_fragment: &mut (dyn FnMut(String) + Send),
    ) -> Result<(), LlmError> {
        let mut builder = self
            .http
            .post(&self.url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        info!(
            url = %self.url,
            model = %request.model,
            messages = request.messages.len(),
            files = request.files.len(),
            "chat request sent"
        );
        let mut response = builder.send().await.map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiResponse { status: status.as_u16(), body });
        }

        let mut decoder = SseDecoder::new();
        let mut fragments = 0usize;
        while let Some(bytes) = response.chunk().await.map_err(|e| LlmError::StreamRead(e.to_string()))? {
            for event in decoder.push(&bytes) {
                match event {
                    SseEvent::Fragment(text) => {
                        fragments += 1;
                        on_fragment(text);
                    }
                    SseEvent::Done => {
                        debug!(fragments, "chat stream done");
                        return Ok(());
                    }
                }
            }
        }
        if let Some(SseEvent::Fragment(text)) = decoder.finish() {
            fragments += 1;
            on_fragment(text);
        }
        debug!(fragments, "chat stream closed without [DONE]");
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
