//! inkchat: headless driver for the annotation canvas and its chat bridge.
//!
//! Each invocation opens the canvas snapshot, performs one command the way
//! the toolbar or chat box would, and lets the session persist the result.

mod config;
mod llm;
mod services;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use canvas::camera::Point;
use canvas::capability::FilePicker;
use canvas::chat::MessageId;
use canvas::consts::RESIZE_HANDLE_RADIUS;
use canvas::engine::CanvasSession;
use canvas::input::{Button, Modifiers};
use canvas::persist::SnapshotStore;
use canvas::render::RenderError;
use canvas::scene::SceneError;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use config::AppConfig;
use llm::ChatClient;
use services::chat::ChatBridge;
use services::images::{FetchError, RemoteImages};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("chat client: {0}")]
    Llm(#[from] llm::LlmError),
    #[error("image cache: {0}")]
    Images(#[from] FetchError),
    #[error("cannot place image: {0}")]
    Scene(#[from] SceneError),
    #[error("export failed: {0}")]
    Render(#[from] RenderError),
    #[error("nothing to {0}")]
    Nothing(&'static str),
}

#[derive(Parser, Debug)]
#[command(name = "inkchat", about = "Annotation canvas with an AI chat bridge")]
struct Cli {
    /// Snapshot file to open and update.
    #[arg(long, env = "INKCHAT_SNAPSHOT_PATH")]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canvas images and the chat transcript.
    Status,
    /// Place a PNG or JPEG file on the canvas.
    AddImage { path: PathBuf },
    /// Send a chat message and wait for the reply.
    Ask { text: String },
    /// Select the whole canvas and send an edit instruction with its render.
    Edit { instruction: String },
    /// Remove the most recently added object.
    Undo,
    /// Remove every object from the canvas.
    Clear,
    /// Render the whole canvas to a PNG file.
    Export { output: PathBuf },
    /// Delete a chat message by its index in `status`.
    DeleteMessage { index: usize },
}

/// Answers every dialog with the path given on the command line.
struct ArgPicker(PathBuf);

impl FilePicker for ArgPicker {
    fn pick_image(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }

    fn pick_save_path(&self, _suggested_name: &str) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    init_tracing(&config);
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, ".env not loaded"),
    }

    let snapshot_path = cli.snapshot.unwrap_or_else(|| config.snapshot_path.clone());
    let images = RemoteImages::new(&config.image_cache_dir, config.timeouts)?;
    let mut session = CanvasSession::open(SnapshotStore::new(&snapshot_path), Box::new(images.clone()));

    match cli.command {
        Command::Status => print_status(&session),
        Command::AddImage { path } => {
            let (id, _) = session.place_upload(&path.to_string_lossy())?;
            if let Some(img) = session.scene().image(&id) {
                println!("placed {} at ({}, {}) {}x{}", img.source, img.left, img.top, img.width, img.height);
            }
        }
        Command::Ask { text } => {
            let mut bridge = chat_bridge(&config, images)?;
            let (id, _) = bridge.send_chat(&mut session, &text).ok_or(CliError::Nothing("send"))?;
            wait_for_reply(&mut bridge, &mut session, id).await;
            print_message(&session, &id);
        }
        Command::Edit { instruction } => {
            let selected = select_everything(&mut session);
            info!(selected, "canvas selected for edit");
            let mut bridge = chat_bridge(&config, images)?;
            let (id, _) = bridge.send_selection(&mut session, &instruction).ok_or(CliError::Nothing("send"))?;
            wait_for_reply(&mut bridge, &mut session, id).await;
            print_message(&session, &id);
        }
        Command::Undo => {
            if session.undo().is_empty() {
                return Err(CliError::Nothing("undo"));
            }
            println!("removed the most recent object");
        }
        Command::Clear => {
            session.clear_canvas();
            println!("canvas cleared");
        }
        Command::Export { output } => {
            if select_everything(&mut session) == 0 {
                return Err(CliError::Nothing("export"));
            }
            if let Some(path) = session.try_export_selection(&ArgPicker(output))? {
                println!("exported {}", path.display());
            }
        }
        Command::DeleteMessage { index } => {
            let id = session.chat().entries().get(index).map(|e| e.id).ok_or(CliError::Nothing("delete"))?;
            session.delete_message(&id);
            println!("deleted message {index}");
        }
    }
    Ok(())
}

/// Route logs to `INKCHAT_LOG_FILE` in append mode, or stderr.
fn init_tracing(config: &AppConfig) {
    let builder = tracing_subscriber::fmt().with_max_level(config.log_level).with_target(false);
    let Some(path) = &config.log_file else {
        builder.with_writer(std::io::stderr).init();
        return;
    };
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        Err(e) => {
            builder.with_writer(std::io::stderr).init();
            warn!(path = %path.display(), error = %e, "log file unavailable; logging to stderr");
        }
    }
}

fn chat_bridge(config: &AppConfig, images: RemoteImages) -> Result<ChatBridge, CliError> {
    let client = ChatClient::from_config(config)?;
    info!(url = %config.api_url, model = %config.model, "chat client initialized");
    let bridge = ChatBridge::new(Arc::new(client), config.model.clone(), config.selection_system_prompt.clone());
    Ok(bridge.with_remote_images(images))
}

/// Drive the bridge until the reply lands. Ctrl-C cancels it.
async fn wait_for_reply(bridge: &mut ChatBridge, session: &mut CanvasSession, id: MessageId) {
    info!(pending = bridge.pending(), "waiting for reply");
    let interrupted = tokio::select! {
        _ = bridge.run_until_idle(session) => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        bridge.cancel(&id);
        session.fail_assistant_message(&id, "cancelled");
    }
}

/// Marquee-drag across the whole world extent. Returns the selection size.
fn select_everything(session: &mut CanvasSession) -> usize {
    let world = session.world();
    let camera = session.camera();
    session.set_viewport(world.width * camera.zoom, world.height * camera.zoom);

    // Start outside the handle radius of anything touching the origin.
    let margin = RESIZE_HANDLE_RADIUS + 1.0;
    let from = camera.world_to_screen(Point::new(-margin, -margin));
    let to = camera.world_to_screen(Point::new(world.width, world.height));
    let mods = Modifiers::default();
    session.on_pointer_down(from, Button::Primary, mods);
    session.on_pointer_move(to, mods);
    session.on_pointer_up(to, Button::Primary, mods);
    session.selection().len()
}

fn print_status(session: &CanvasSession) {
    let world = session.world();
    let images: Vec<_> = session.scene().images().collect();
    println!(
        "canvas: {} image(s), world {}x{}, zoom {}%",
        images.len(),
        world.width,
        world.height,
        session.zoom_percent()
    );
    for (i, img) in images.iter().enumerate() {
        let (sx, sy) = img.scale();
        println!(
            "  [{i}] {} at ({}, {}) {}x{} scale {sx}x{sy} rotation {}",
            img.source,
            img.left,
            img.top,
            img.width,
            img.height,
            img.rotation_normalized()
        );
    }
    println!("chat: {} message(s)", session.chat().len());
    for (i, entry) in session.chat().entries().iter().enumerate() {
        match &entry.image_url {
            Some(url) => println!("  [{i}] {}: {} [{url}]", entry.role.label(), entry.content),
            None => println!("  [{i}] {}: {}", entry.role.label(), entry.content),
        }
    }
}

fn print_message(session: &CanvasSession, id: &MessageId) {
    match session.chat().get(id) {
        Some(entry) => {
            println!("{}", entry.content);
            if let Some(url) = &entry.image_url {
                println!("[image] {url}");
            }
        }
        None => println!("(reply discarded)"),
    }
}
