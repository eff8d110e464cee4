use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use canvas::camera::Point;
use canvas::consts::BACKGROUND_COLOR;
use canvas::engine::CanvasSession;
use canvas::input::{Button, Modifiers};
use image::{ImageFormat, Rgba};

use super::*;
use crate::llm::{ChatBackend, ChatRequest, LlmError};
use crate::services::chat::ChatBridge;

const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);

// =========================================================================
// In-process image host
// =========================================================================

fn wide_png() -> Vec<u8> {
    let mut png = Vec::new();
    RgbaImage::from_pixel(40, 20, RED).write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
    png
}

async fn wide(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/png")], wide_png())
}

/// Serves `/wide.png` (40x20, red) and a 404 at `/missing.png`.
async fn serve() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/wide.png", get(wide))
        .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }))
        .with_state(Arc::clone(&hits));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), hits)
}

fn cache() -> RemoteImages {
    let dir = std::env::temp_dir().join(format!("inkchat-images-{}", uuid::Uuid::new_v4()));
    RemoteImages::new(dir, Timeouts { request_secs: 5, connect_secs: 2 }).unwrap()
}

// =========================================================================
// Cache
// =========================================================================

#[tokio::test]
async fn fetch_caches_once_and_provider_reads_it() {
    let (base, hits) = serve().await;
    let images = cache();
    let url = format!("{base}/wide.png");
    assert_eq!(images.dimensions(&url), None);

    let path = images.fetch(&url).await.unwrap();
    assert_eq!(path, images.cache_path(&url));
    assert_eq!(images.fetch(&url).await.unwrap(), path);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    assert_eq!(images.dimensions(&url), Some((40, 20)));
    assert_eq!(images.load(&url).unwrap().get_pixel(5, 5), &RED);
}

#[tokio::test]
async fn failed_download_caches_nothing() {
    let (base, _) = serve().await;
    let images = cache();
    let url = format!("{base}/missing.png");

    let err = images.fetch(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert!(!images.cache_path(&url).exists());
    match images.load(&url) {
        Err(CapabilityError::ImageLoad { source_ref, .. }) => assert_eq!(source_ref, url),
        other => panic!("expected ImageLoad error, got {other:?}"),
    }
}

#[tokio::test]
async fn local_sources_are_not_fetched() {
    let images = cache();
    assert!(matches!(images.fetch("/tmp/a.png").await, Err(FetchError::NotRemote(_))));
    assert_eq!(images.dimensions("/definitely/missing.png"), None);
}

#[test]
fn cache_path_is_stable_per_url() {
    let images = cache();
    assert_eq!(images.cache_path("https://cdn.test/a.png"), images.cache_path("https://cdn.test/a.png"));
    assert_ne!(images.cache_path("https://cdn.test/a.png"), images.cache_path("https://cdn.test/b.png"));
}

// =========================================================================
// Generated replies on the canvas
// =========================================================================

struct Replies(String);

#[async_trait::async_trait]
impl ChatBackend for Replies {
    async fn stream_chat(
        &self,
        _request: &ChatRequest,
        on_fragment: &mut (dyn FnMut(String) + Send),
    ) -> Result<(), LlmError> {
        on_fragment("here: ".into());
        on_fragment(self.0.clone());
        Ok(())
    }
}

#[tokio::test]
async fn generated_image_keeps_aspect_and_renders() {
    let (base, _) = serve().await;
    let images = cache();
    let reply = format!("![out]({base}/wide.png)");
    let mut bridge = ChatBridge::new(Arc::new(Replies(reply)), "m", "s").with_remote_images(images.clone());
    let mut session = CanvasSession::new(Box::new(images));

    bridge.send_chat(&mut session, "draw something wide").unwrap();
    bridge.run_until_idle(&mut session).await;

    let img = session.scene().images().next().unwrap();
    assert_eq!((img.left, img.top, img.width, img.height), (50.0, 100.0, 400.0, 200.0));

    let mods = Modifiers::default();
    session.on_pointer_down(Point::new(250.0, 200.0), Button::Primary, mods);
    session.on_pointer_up(Point::new(250.0, 200.0), Button::Primary, mods);
    assert_eq!(session.selection().len(), 1);

    let render = session.render_selection().unwrap();
    assert_eq!((render.width, render.height), (420, 220));
    let pixels = image::load_from_memory(&render.png).unwrap().to_rgba8();
    assert_eq!(pixels.get_pixel(2, 2), &Rgba(BACKGROUND_COLOR));
    assert_eq!(pixels.get_pixel(210, 110), &RED);
}

#[tokio::test]
async fn failed_download_still_places_the_image() {
    let (base, _) = serve().await;
    let images = cache();
    let reply = format!("![out]({base}/missing.png)");
    let mut bridge = ChatBridge::new(Arc::new(Replies(reply)), "m", "s").with_remote_images(images.clone());
    let mut session = CanvasSession::new(Box::new(images));

    let (id, _) = bridge.send_chat(&mut session, "go").unwrap();
    bridge.run_until_idle(&mut session).await;

    assert_eq!(session.chat().get(&id).unwrap().content, "here:");
    let img = session.scene().images().next().unwrap();
    assert_eq!((img.width, img.height), (400.0, 400.0));
}
