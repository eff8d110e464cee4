//! LLM: streaming chat-completions adapter for the chat bridge.
//!
//! DESIGN
//! ======
//! One endpoint shape only: an OpenAI-compatible `/v1/chat/completions`
//! that answers with a server-sent-event stream. [`ChatBackend`] is the seam
//! the bridge depends on; [`ChatClient`] is the reqwest implementation and
//! tests substitute scripted backends.

pub mod client;
pub mod sse;
pub mod types;

pub use client::ChatClient;
pub use types::{ChatBackend, ChatMessage, ChatRequest, FileAttachment, LlmError};
