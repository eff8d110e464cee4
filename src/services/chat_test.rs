use std::path::PathBuf;
use std::sync::Mutex;

use canvas::camera::Point;
use canvas::capability::FsImageProvider;
use canvas::chat::IMAGE_ONLY_REPLY;
use canvas::engine::SelectionAttachment;
use canvas::input::{Button, Modifiers, Tool};

use super::*;
use crate::llm::LlmError;

// =========================================================================
// Mock backends
// =========================================================================

/// Replies `"re: "` + the last message, in two fragments. A last message of
/// `fail` produces a request error instead.
#[derive(Default)]
struct Echo {
    requests: Mutex<Vec<ChatRequest>>,
}

#[async_trait::async_trait]
impl ChatBackend for Echo {
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        on_fragment: &mut (dyn FnMut(String) + Send),
    ) -> Result<(), LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if last == "fail" {
            return Err(LlmError::ApiRequest("boom".into()));
        }
        on_fragment("re: ".into());
        tokio::task::yield_now().await;
        on_fragment(last);
        Ok(())
    }
}

/// Never finishes.
struct Stalled;

#[async_trait::async_trait]
impl ChatBackend for Stalled {
    async fn stream_chat(
        &self,
        _request: &ChatRequest,
        _on_fragment: &mut (dyn FnMut(String) + Send),
    ) -> Result<(), LlmError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("inkchat-bridge-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn session() -> CanvasSession {
    CanvasSession::new(Box::new(FsImageProvider)).with_preview_dir(temp_dir())
}

fn echo_bridge() -> (Arc<Echo>, ChatBridge) {
    let backend = Arc::new(Echo::default());
    let bridge = ChatBridge::new(backend.clone(), "test-model", "system prompt");
    (backend, bridge)
}

fn content(session: &CanvasSession, id: &MessageId) -> String {
    session.chat().get(id).unwrap().content.clone()
}

/// Draw a short stroke with the ink tool and click it to select it.
fn select_stroke(session: &mut CanvasSession) {
    let mods = Modifiers::default();
    session.set_tool(Tool::Ink);
    session.on_pointer_down(Point::new(10.0, 10.0), Button::Primary, mods);
    session.on_pointer_move(Point::new(60.0, 40.0), mods);
    session.on_pointer_up(Point::new(60.0, 40.0), Button::Primary, mods);
    session.set_tool(Tool::Select);
    session.on_pointer_down(Point::new(35.0, 25.0), Button::Primary, mods);
    assert_eq!(session.selection().len(), 1);
}

// =========================================================================
// Prompt building
// =========================================================================

#[test]
fn selection_prompt_wraps_instruction() {
    let prompt = build_selection_prompt("make it blue");
    assert!(prompt.starts_with(
        "<selection_edit_task>\nFollow the user instruction to edit/regenerate image content according to the visual annotation.\n"
    ));
    assert!(prompt.contains("The cyan strokes/arrows in the image are guidance for changes.\n"));
    assert!(prompt.contains(
        "</selection_edit_task>\n\n<input_images count=\"1\">\n<image index=\"1\" file_id=\"selection_preview\" />\n</input_images>\n\n"
    ));
    assert!(prompt.ends_with("<user_instruction>\nmake it blue\n</user_instruction>"));
}

#[test]
fn selection_request_with_attachment_has_system_prompt_and_file() {
    let selection = SelectionRequest {
        user_message: uuid::Uuid::new_v4(),
        instruction: "make it blue".into(),
        attachment: Some(SelectionAttachment {
            filename: "selection_1.png".into(),
            data_url: "data:image/png;base64,AAAA".into(),
            preview_path: None,
        }),
    };
    let req = build_selection_request("m", "sys", &selection);
    assert_eq!(req.messages, vec![ChatMessage::system("sys"), ChatMessage::user(build_selection_prompt("make it blue"))]);
    assert_eq!(req.files, vec![FileAttachment::png("selection_1.png", "data:image/png;base64,AAAA")]);
    assert!(req.stream);
}

#[test]
fn selection_request_without_attachment_sends_raw_instruction() {
    let selection =
        SelectionRequest { user_message: uuid::Uuid::new_v4(), instruction: "draw a cat".into(), attachment: None };
    let req = build_selection_request("m", "sys", &selection);
    assert_eq!(req.messages, vec![ChatMessage::user("draw a cat")]);
    assert!(req.files.is_empty());
}

// =========================================================================
// Streaming into the session
// =========================================================================

#[tokio::test]
async fn chat_reply_streams_into_its_message() {
    let (backend, mut bridge) = echo_bridge();
    let mut session = session();

    let (id, actions) = bridge.send_chat(&mut session, "  hello ").unwrap();
    assert!(actions.contains(&Action::ChatChanged(id)));
    assert_eq!(bridge.pending(), 1);
    assert_eq!(content(&session, &id), "");

    bridge.run_until_idle(&mut session).await;
    assert!(bridge.is_idle());
    let entries = session.chat().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!((entries[0].role, entries[0].content.as_str()), (ChatRole::User, "hello"));
    assert_eq!(content(&session, &id), "re: hello");

    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests[0].model, "test-model");
    assert_eq!(requests[0].messages, vec![ChatMessage::user("hello")]);
}

#[tokio::test]
async fn blank_chat_does_nothing() {
    let (_, mut bridge) = echo_bridge();
    let mut session = session();
    assert!(bridge.send_chat(&mut session, "   ").is_none());
    assert!(bridge.send_selection(&mut session, "").is_none());
    assert!(session.chat().is_empty());
    assert!(bridge.is_idle());
}

#[tokio::test]
async fn image_reply_is_placed_on_canvas() {
    let (_, mut bridge) = echo_bridge();
    let mut session = session();
    let (id, _) = bridge.send_chat(&mut session, "![out](https://cdn.test/out.png)").unwrap();
    bridge.run_until_idle(&mut session).await;

    let entry = session.chat().get(&id).unwrap();
    assert_eq!(entry.content, "re:");
    assert_eq!(entry.image_url.as_deref(), Some("https://cdn.test/out.png"));
    let img = session.scene().images().next().unwrap();
    assert_eq!(img.source, "https://cdn.test/out.png");
}

#[tokio::test]
async fn image_only_reply_gets_placeholder_text() {
    struct ImageOnly;

    #[async_trait::async_trait]
    impl ChatBackend for ImageOnly {
        async fn stream_chat(
            &self,
            _request: &ChatRequest,
            on_fragment: &mut (dyn FnMut(String) + Send),
        ) -> Result<(), LlmError> {
            on_fragment("![r](http://cdn.test/r.png)".into());
            Ok(())
        }
    }

    let mut bridge = ChatBridge::new(Arc::new(ImageOnly), "m", "s");
    let mut session = session();
    let (id, _) = bridge.send_chat(&mut session, "go").unwrap();
    bridge.run_until_idle(&mut session).await;
    assert_eq!(content(&session, &id), IMAGE_ONLY_REPLY);
}

#[tokio::test]
async fn request_failure_becomes_visible_error() {
    let (_, mut bridge) = echo_bridge();
    let mut session = session();
    let (id, _) = bridge.send_chat(&mut session, "fail").unwrap();
    bridge.run_until_idle(&mut session).await;
    assert_eq!(content(&session, &id), "Error: API request failed: boom");
    assert!(session.scene().is_empty());
}

#[tokio::test]
async fn concurrent_requests_fill_their_own_messages() {
    let (_, mut bridge) = echo_bridge();
    let mut session = session();
    let (first, _) = bridge.send_chat(&mut session, "first").unwrap();
    let (second, _) = bridge.send_chat(&mut session, "second").unwrap();
    assert_eq!(bridge.pending(), 2);

    bridge.run_until_idle(&mut session).await;
    assert_eq!(content(&session, &first), "re: first");
    assert_eq!(content(&session, &second), "re: second");
}

#[tokio::test]
async fn selection_request_sends_render_and_logs_message() {
    let (backend, mut bridge) = echo_bridge();
    let mut session = session();
    select_stroke(&mut session);

    let (id, _) = bridge.send_selection(&mut session, "make it blue").unwrap();
    bridge.run_until_idle(&mut session).await;

    let user = &session.chat().entries()[0];
    assert_eq!(user.content, "[Selection] make it blue");
    assert!(user.image_url.as_deref().is_some_and(|p| p.ends_with(".png")));
    assert!(content(&session, &id).contains("<user_instruction>\nmake it blue\n</user_instruction>"));

    let requests = backend.requests.lock().unwrap();
    let req = &requests[0];
    assert_eq!(req.messages[0], ChatMessage::system("system prompt"));
    assert_eq!(req.messages[1].content, build_selection_prompt("make it blue"));
    assert_eq!(req.files.len(), 1);
    assert!(req.files[0].filename.starts_with("selection_"));
    assert_eq!(req.files[0].mime_type, "image/png");
    assert!(req.files[0].file_data.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn selection_request_without_selection_falls_back_to_text() {
    let (backend, mut bridge) = echo_bridge();
    let mut session = session();
    let (id, _) = bridge.send_selection(&mut session, "draw a cat").unwrap();
    bridge.run_until_idle(&mut session).await;

    assert_eq!(session.chat().entries()[0].content, "[Selection] draw a cat");
    assert_eq!(content(&session, &id), "re: draw a cat");
    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests[0].messages, vec![ChatMessage::user("draw a cat")]);
    assert!(requests[0].files.is_empty());
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn cancel_stops_request_and_leaves_message() {
    let mut bridge = ChatBridge::new(Arc::new(Stalled), "m", "s");
    let mut session = session();
    let (id, _) = bridge.send_chat(&mut session, "hello").unwrap();

    assert!(bridge.cancel(&id));
    assert!(!bridge.cancel(&id));
    assert!(bridge.is_idle());
    assert!(bridge.run_until_idle(&mut session).await.is_empty());
    assert_eq!(content(&session, &id), "");
}

#[tokio::test]
async fn events_for_settled_requests_are_dropped() {
    let (_, mut bridge) = echo_bridge();
    let mut session = session();
    let (id, _) = bridge.send_chat(&mut session, "hello").unwrap();
    bridge.run_until_idle(&mut session).await;

    let late = BridgeEvent { message_id: id, generation: 0, kind: BridgeEventKind::Fragment("late".into()) };
    assert!(bridge.apply(&mut session, late).is_empty());
    assert_eq!(content(&session, &id), "re: hello");
}

#[tokio::test]
async fn wrong_generation_is_dropped() {
    let mut bridge = ChatBridge::new(Arc::new(Stalled), "m", "s");
    let mut session = session();
    let (id, _) = bridge.send_chat(&mut session, "hello").unwrap();

    let stale = BridgeEvent { message_id: id, generation: 99, kind: BridgeEventKind::Fragment("x".into()) };
    assert!(bridge.apply(&mut session, stale).is_empty());
    let current = BridgeEvent { message_id: id, generation: 0, kind: BridgeEventKind::Fragment("x".into()) };
    assert_eq!(bridge.apply(&mut session, current), vec![Action::ChatChanged(id)]);
}

#[tokio::test]
async fn deleted_message_swallows_its_reply() {
    let (_, mut bridge) = echo_bridge();
    let mut session = session();
    let (id, _) = bridge.send_chat(&mut session, "hello").unwrap();
    session.delete_message(&id);

    bridge.run_until_idle(&mut session).await;
    assert!(session.chat().get(&id).is_none());
    assert_eq!(session.chat().len(), 1);
}
