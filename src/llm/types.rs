//! Chat-completions wire types, errors, and the backend trait.

use canvas::chat::ChatRole;
use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by chat backend operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request could not be sent or the connection failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The endpoint returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The response body broke off mid-stream.
    #[error("stream read failed: {0}")]
    StreamRead(String),
}

// =============================================================================
// REQUEST
// =============================================================================

/// A single message in the request transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role: role.wire_name().into(), content: content.into() }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }
}

/// Inline file sent next to the messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub filename: String,
    pub mime_type: String,
    /// `data:<mime>;base64,...`
    pub file_data: String,
}

impl FileAttachment {
    #[must_use]
    pub fn png(filename: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self { filename: filename.into(), mime_type: "image/png".into(), file_data: data_url.into() }
    }
}

/// Streaming chat-completions request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub stream: bool,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileAttachment>,
}

impl ChatRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self { model: model.into(), stream: true, messages, files: Vec::new() }
    }

    #[must_use]
    pub fn with_file(mut self, file: FileAttachment) -> Self {
        self.files.push(file);
        self
    }
}

// =============================================================================
// STREAM CHUNKS
// =============================================================================

/// One `data:` payload of the event stream. Only the fields read are modelled.
#[derive(Debug, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamChunk {
    /// `choices[0].delta.content`, if present and non-empty.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        let text = self.choices.into_iter().next()?.delta.content?;
        if text.is_empty() { None } else { Some(text) }
    }
}

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// A streaming chat endpoint.
///
/// Implementations call `on_fragment` once per received text fragment, in
/// order, and return when the stream ends.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        on_fragment: &mut (dyn FnMut(String) + Send),
    ) -> Result<(), LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
