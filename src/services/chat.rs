//! Chat bridge: sends prompts to the chat backend and feeds streamed replies
//! back into a [`CanvasSession`].
//!
//! DESIGN
//! ======
//! Every request is a spawned task bound to the assistant message it fills
//! and tagged with a generation number. Tasks never touch the session; they
//! push [`BridgeEvent`]s into a channel and the owner of the session applies
//! them with [`ChatBridge::apply`]. Starting a request never cancels another
//! one. Events whose message is no longer in flight (finished, cancelled, or
//! superseded by a newer generation) are dropped.
//!
//! With [`RemoteImages`] attached, a task that streamed an image reference
//! downloads it before reporting `Finished`, so the session can size and
//! render the generated image as soon as it is placed. A failed download is
//! logged and the image is still placed.

use std::collections::HashMap;
use std::sync::Arc;

use canvas::chat::{ChatRole, MessageId, extract_image_reference};
use canvas::engine::{Action, CanvasSession, SelectionRequest};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::images::RemoteImages;
use crate::llm::{ChatBackend, ChatMessage, ChatRequest, FileAttachment};

// =============================================================================
// PROMPTS
// =============================================================================

/// Wrap a selection instruction in the structured edit-task prompt.
#[must_use]
pub fn build_selection_prompt(instruction: &str) -> String {
    format!(
        "<selection_edit_task>\n\
         Follow the user instruction to edit/regenerate image content according to the visual annotation.\n\
         The cyan strokes/arrows in the image are guidance for changes.\n\
         You MUST generate a new result image, not return unchanged input.\n\
         </selection_edit_task>\n\n\
         <input_images count=\"1\">\n\
         <image index=\"1\" file_id=\"selection_preview\" />\n\
         </input_images>\n\n\
         <user_instruction>\n{instruction}\n</user_instruction>"
    )
}

/// Request for a plain chat message.
#[must_use]
pub fn build_chat_request(model: &str, text: &str) -> ChatRequest {
    ChatRequest::new(model, vec![ChatMessage::user(text)])
}

/// Request for an instruction over the canvas selection.
///
/// With an attachment: system prompt, structured user prompt, and the PNG as
/// `files[0]`. Without one: the raw instruction alone.
#[must_use]
pub fn build_selection_request(model: &str, system_prompt: &str, selection: &SelectionRequest) -> ChatRequest {
    match &selection.attachment {
        Some(attachment) => ChatRequest::new(
            model,
            vec![ChatMessage::system(system_prompt), ChatMessage::user(build_selection_prompt(&selection.instruction))],
        )
        .with_file(FileAttachment::png(attachment.filename.clone(), attachment.data_url.clone())),
        None => build_chat_request(model, &selection.instruction),
    }
}

// =============================================================================
// EVENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEventKind {
    Fragment(String),
    Finished,
    Failed(String),
}

/// Progress of one request, addressed to the message it fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEvent {
    pub message_id: MessageId,
    pub generation: u64,
    pub kind: BridgeEventKind,
}

struct InFlight {
    generation: u64,
    task: JoinHandle<()>,
}

// =============================================================================
// BRIDGE
// =============================================================================

pub struct ChatBridge {
    backend: Arc<dyn ChatBackend>,
    model: String,
    system_prompt: String,
    images: Option<RemoteImages>,
    next_generation: u64,
    in_flight: HashMap<MessageId, InFlight>,
    events_tx: mpsc::UnboundedSender<BridgeEvent>,
    events_rx: mpsc::UnboundedReceiver<BridgeEvent>,
}

impl ChatBridge {
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            model: model.into(),
            system_prompt: system_prompt.into(),
            images: None,
            next_generation: 0,
            in_flight: HashMap::new(),
            events_tx,
            events_rx,
        }
    }

    /// Download generated images into `images` before finishing a reply.
    #[must_use]
    pub fn with_remote_images(mut self, images: RemoteImages) -> Self {
        self.images = Some(images);
        self
    }

    /// Number of requests still streaming.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Add a user message and request a reply. Blank text does nothing.
    pub fn send_chat(&mut self, session: &mut CanvasSession, text: &str) -> Option<(MessageId, Vec<Action>)> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let (_, mut actions) = session.add_message(ChatRole::User, text, None);
        let request = build_chat_request(&self.model, text);
        let id = self.start(session, request, &mut actions);
        Some((id, actions))
    }

    /// Send an instruction about the current selection. Blank text does nothing.
    pub fn send_selection(&mut self, session: &mut CanvasSession, instruction: &str) -> Option<(MessageId, Vec<Action>)> {
        let (selection, mut actions) = session.prepare_selection_request(instruction)?;
        let request = build_selection_request(&self.model, &self.system_prompt, &selection);
        let id = self.start(session, request, &mut actions);
        Some((id, actions))
    }

    /// Add the empty assistant message and spawn the streaming task for it.
    fn start(&mut self, session: &mut CanvasSession, request: ChatRequest, actions: &mut Vec<Action>) -> MessageId {
        let message_id = session.begin_assistant_message();
        actions.push(Action::ChatChanged(message_id));
        let generation = self.next_generation;
        self.next_generation += 1;

        info!(%message_id, generation, files = request.files.len(), "chat request started");
        let backend = Arc::clone(&self.backend);
        let images = self.images.clone();
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let send = |kind| {
                if tx.send(BridgeEvent { message_id, generation, kind }).is_err() {
                    debug!(%message_id, "bridge closed; dropping event");
                }
            };
            let mut reply = String::new();
            let mut on_fragment = |text: String| {
                reply.push_str(&text);
                send(BridgeEventKind::Fragment(text));
            };
            let result = backend.stream_chat(&request, &mut on_fragment).await;
            match result {
                Ok(()) => {
                    if let (Some(images), Some(reference)) = (&images, extract_image_reference(&reply)) {
                        if let Err(e) = images.fetch(&reference.url).await {
                            warn!(%message_id, error = %e, "generated image not downloaded");
                        }
                    }
                    send(BridgeEventKind::Finished);
                }
                Err(e) => send(BridgeEventKind::Failed(e.to_string())),
            }
        });
        self.in_flight.insert(message_id, InFlight { generation, task });
        message_id
    }

    /// Abort the request filling `message_id`. Its queued events are dropped.
    pub fn cancel(&mut self, message_id: &MessageId) -> bool {
        match self.in_flight.remove(message_id) {
            Some(flight) => {
                flight.task.abort();
                info!(%message_id, generation = flight.generation, "chat request cancelled");
                true
            }
            None => false,
        }
    }

    /// Abort every request.
    pub fn cancel_all(&mut self) {
        for (message_id, flight) in self.in_flight.drain() {
            flight.task.abort();
            debug!(%message_id, "chat request cancelled");
        }
    }

    /// Wait for the next event from any request.
    pub async fn next_event(&mut self) -> Option<BridgeEvent> {
        self.events_rx.recv().await
    }

    /// Apply one event to the session.
    pub fn apply(&mut self, session: &mut CanvasSession, event: BridgeEvent) -> Vec<Action> {
        let current = self.in_flight.get(&event.message_id).map(|f| f.generation);
        if current != Some(event.generation) {
            debug!(message_id = %event.message_id, generation = event.generation, "stale chat event dropped");
            return Vec::new();
        }
        match event.kind {
            BridgeEventKind::Fragment(text) => session.append_assistant_chunk(&event.message_id, &text),
            BridgeEventKind::Finished => {
                self.in_flight.remove(&event.message_id);
                info!(message_id = %event.message_id, "chat reply finished");
                session.finish_assistant_message(&event.message_id)
            }
            BridgeEventKind::Failed(error) => {
                self.in_flight.remove(&event.message_id);
                warn!(message_id = %event.message_id, %error, "chat request failed");
                session.fail_assistant_message(&event.message_id, &error)
            }
        }
    }

    /// Apply events until no request is in flight.
    pub async fn run_until_idle(&mut self, session: &mut CanvasSession) -> Vec<Action> {
        let mut actions = Vec::new();
        while !self.is_idle() {
            let Some(event) = self.next_event().await else {
                break;
            };
            actions.extend(self.apply(session, event));
        }
        actions
    }
}

impl Drop for ChatBridge {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
