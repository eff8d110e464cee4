//! Canvas session, the single owner of all per-window canvas state.
//!
//! DESIGN
//! ======
//! Every input handler takes the session mutably, updates scene, camera,
//! world extent and selection together, and returns a list of [`Action`]s
//! for the host to act on (redraw, move the popup, change the cursor,
//! capture the pointer). Nothing here blocks or touches a GUI toolkit.
//!
//! Pointer gestures run through [`InputState`]: pointer-down picks exactly
//! one state, moves update it, and pointer-up always returns to `Idle`.
//! Wheel gestures and keyboard shortcuts act immediately and never change
//! the gesture state.
//!
//! Every meaningful mutation ends in `request_save`, which writes the
//! snapshot through the attached [`SnapshotStore`] unless a restore is in
//! progress.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::camera::{Camera, Point, Rect};
use crate::capability::{ClipboardSink, FilePicker, FsImageProvider, ImageProvider};
use crate::chat::{ChatLog, ChatRole, IMAGE_ONLY_REPLY, MessageId, WELCOME_MESSAGE, extract_image_reference};
use crate::consts::{
    DEFAULT_IMAGE_WIDTH, ERASER_RADIUS, IMAGE_PLACEMENT_TOP, MIN_IMAGE_WIDTH, MIN_MARQUEE_PX, ROTATION_STEP_DEG,
    SCALE_STEP, ZOOM_STEP,
};
use crate::hit::{HitKind, HitPart, pick_top_object_at, stroke_hits_point};
use crate::input::{Button, Cursor, InputState, Key, Modifiers, Tool, WheelDelta};
use crate::persist::{PersistedChatEntry, PersistedImage, PersistedSnapshot, SnapshotStore};
use crate::render::{RenderError, SelectionRender, render_selection, timestamp_millis};
use crate::scene::{ImageObject, ImageOrigin, ObjectId, Scene, SceneError, SceneObject, StrokeObject, StrokePoint, is_image_path};
use crate::selection::{Selection, marquee_select};
use crate::world::WorldExtent;

/// Side effects the host should perform after an input call.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RenderNeeded,
    /// Selection membership or its on-screen position changed.
    SelectionChanged { count: usize, anchor: Option<Point> },
    ZoomChanged { percent: u32 },
    WorldResized { width: f64, height: f64 },
    /// A snapshot was written (or would have been, without a store).
    SaveRequested,
    SetCursor(Cursor),
    ToolChanged(Tool),
    CapturePointer,
    ReleasePointer,
    ObjectAdded(ObjectId),
    ObjectRemoved(ObjectId),
    ChatChanged(MessageId),
}

/// Attachment produced by rasterizing the selection for a chat request.
#[derive(Debug, Clone)]
pub struct SelectionAttachment {
    /// `selection_<timestamp>.png`
    pub filename: String,
    pub data_url: String,
    /// Preview file referenced by the user message, when it could be written.
    pub preview_path: Option<PathBuf>,
}

/// What the chat bridge needs to send an instruction about the selection.
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub user_message: MessageId,
    pub instruction: String,
    /// `None` when rasterization failed; send the raw instruction instead.
    pub attachment: Option<SelectionAttachment>,
}

/// All state for one canvas window.
pub struct CanvasSession {
    scene: Scene,
    camera: Camera,
    world: WorldExtent,
    selection: Selection,
    chat: ChatLog,
    tool: Tool,
    input: InputState,
    cursor: Cursor,
    viewport_width: f64,
    viewport_height: f64,
    restoring: bool,
    store: Option<SnapshotStore>,
    images: Box<dyn ImageProvider>,
    preview_dir: PathBuf,
}

impl Default for CanvasSession {
    fn default() -> Self {
        Self::new(Box::new(FsImageProvider))
    }
}

impl CanvasSession {
    /// A fresh, empty session with no snapshot store.
    #[must_use]
    pub fn new(images: Box<dyn ImageProvider>) -> Self {
        Self {
            scene: Scene::new(),
            camera: Camera::default(),
            world: WorldExtent::default(),
            selection: Selection::new(),
            chat: ChatLog::new(),
            tool: Tool::default(),
            input: InputState::default(),
            cursor: Cursor::default(),
            viewport_width: 0.0,
            viewport_height: 0.0,
            restoring: false,
            store: None,
            images,
            preview_dir: std::env::temp_dir(),
        }
    }

    /// Load the store's snapshot, replay it, and greet when no chat was restored.
    #[must_use]
    pub fn open(store: SnapshotStore, images: Box<dyn ImageProvider>) -> Self {
        let snapshot = store.load();
        let mut session = Self::new(images).with_store(store);
        session.restore(snapshot);
        if session.chat.is_empty() {
            session.chat.push(ChatRole::Assistant, WELCOME_MESSAGE, None);
        }
        info!(
            images = session.scene.images().count(),
            messages = session.chat.len(),
            "canvas session opened"
        );
        session
    }

    #[must_use]
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_preview_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preview_dir = dir.into();
        self
    }

    // --- Queries ---

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn world(&self) -> WorldExtent {
        self.world
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    #[must_use]
    pub fn input_state(&self) -> &InputState {
        &self.input
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn zoom_percent(&self) -> u32 {
        self.camera.zoom_percent()
    }

    #[must_use]
    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Screen position for the instruction popup, if anything is selected.
    #[must_use]
    pub fn popup_anchor(&self) -> Option<Point> {
        self.selection.popup_anchor(&self.scene, &self.camera, self.viewport_width, self.viewport_height)
    }

    /// The live marquee in screen space while one is being dragged.
    #[must_use]
    pub fn marquee_rect(&self) -> Option<Rect> {
        match &self.input {
            InputState::MarqueeSelecting { start_screen, current_screen } => {
                Some(Rect::from_corners(*start_screen, *current_screen))
            }
            _ => None,
        }
    }

    // --- Viewport ---

    pub fn set_viewport(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.viewport_width = width.max(0.0);
        self.viewport_height = height.max(0.0);
        let mut actions = vec![Action::RenderNeeded];
        self.push_selection_moved(&mut actions);
        actions
    }

    // --- Tools ---

    /// Activate `tool`. Activating the current non-Select tool toggles back to Select.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let next = if tool == self.tool && tool != Tool::Select { Tool::Select } else { tool };
        let mut actions = Vec::new();
        if !self.input.is_idle() {
            self.input = InputState::Idle;
            actions.push(Action::ReleasePointer);
        }
        if next != self.tool {
            debug!(from = self.tool.name(), to = next.name(), "tool changed");
            self.tool = next;
            actions.push(Action::ToolChanged(next));
        }
        let cursor = self.idle_cursor();
        self.set_cursor(cursor, &mut actions);
        actions
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        if button != Button::Primary || !self.input.is_idle() {
            return actions;
        }
        let world_pt = self.camera.screen_to_world(screen_pt);

        match self.tool {
            Tool::Hand => {
                self.input = InputState::Panning {
                    start_screen: screen_pt,
                    start_pan_x: self.camera.pan_x,
                    start_pan_y: self.camera.pan_y,
                };
                debug!(x = screen_pt.x, y = screen_pt.y, pan_x = self.camera.pan_x, pan_y = self.camera.pan_y, "pan start");
                self.set_cursor(Cursor::Hand, &mut actions);
                actions.push(Action::CapturePointer);
            }
            Tool::Ink => {
                self.input = InputState::Inking { points: vec![StrokePoint::at(world_pt)] };
                actions.push(Action::CapturePointer);
                actions.push(Action::RenderNeeded);
            }
            Tool::Eraser => {
                let mut erased = Vec::new();
                self.erase_at(world_pt, &mut erased, &mut actions);
                self.input = InputState::Erasing { erased };
                actions.push(Action::CapturePointer);
            }
            Tool::Select => self.select_pointer_down(screen_pt, world_pt, &mut actions),
        }
        actions
    }

    fn select_pointer_down(&mut self, screen_pt: Point, world_pt: Point, actions: &mut Vec<Action>) {
        match pick_top_object_at(&self.scene, world_pt) {
            Some(hit) if hit.kind == HitKind::Image => {
                let Some(img) = self.scene.image(&hit.object_id) else {
                    return;
                };
                let (id, left, top, w, h) = (img.id, img.left, img.top, img.width, img.height);
                if !self.selection.contains(&id) && self.selection.select_only(id) {
                    self.push_selection_moved(actions);
                }
                match hit.part {
                    HitPart::ResizeHandle(handle) => {
                        debug!(handle = ?handle, left, top, width = w, "image resize start");
                        self.input = InputState::ResizingImage {
                            id,
                            handle,
                            start_world: world_pt,
                            orig_left: left,
                            orig_top: top,
                            orig_w: w,
                            orig_h: h,
                        };
                        self.set_cursor(Cursor::for_corner(handle), actions);
                    }
                    HitPart::Body => {
                        debug!(left, top, "image drag start");
                        self.input = InputState::DraggingImage {
                            id,
                            start_world: world_pt,
                            orig_left: left,
                            orig_top: top,
                            orig_w: w,
                            orig_h: h,
                        };
                        self.set_cursor(Cursor::Move, actions);
                    }
                }
                actions.push(Action::CapturePointer);
                actions.push(Action::RenderNeeded);
            }
            Some(hit) => {
                if !self.selection.contains(&hit.object_id) && self.selection.select_only(hit.object_id) {
                    self.push_selection_moved(actions);
                    actions.push(Action::RenderNeeded);
                }
            }
            None => {
                if self.selection.clear() {
                    self.push_selection_moved(actions);
                }
                self.input = InputState::MarqueeSelecting { start_screen: screen_pt, current_screen: screen_pt };
                actions.push(Action::CapturePointer);
                actions.push(Action::RenderNeeded);
            }
        }
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        let world_pt = self.camera.screen_to_world(screen_pt);

        match &mut self.input {
            InputState::Idle => {
                let cursor = self.hover_cursor(world_pt);
                self.set_cursor(cursor, &mut actions);
            }
            InputState::Panning { start_screen, start_pan_x, start_pan_y } => {
                self.camera.pan_x = *start_pan_x + (screen_pt.x - start_screen.x);
                self.camera.pan_y = *start_pan_y + (screen_pt.y - start_screen.y);
                actions.push(Action::RenderNeeded);
                self.push_selection_moved(&mut actions);
            }
            InputState::MarqueeSelecting { current_screen, .. } => {
                *current_screen = screen_pt;
                actions.push(Action::RenderNeeded);
            }
            InputState::DraggingImage { id, start_world, orig_left, orig_top, .. } => {
                let id = *id;
                let left = *orig_left + (world_pt.x - start_world.x);
                let top = *orig_top + (world_pt.y - start_world.y);
                if let Some(img) = self.scene.image_mut(&id) {
                    img.left = left;
                    img.top = top;
                    let rect = img.bounds();
                    self.ensure_object_bounds(rect, &mut actions);
                    actions.push(Action::RenderNeeded);
                    self.push_selection_moved(&mut actions);
                }
            }
            InputState::ResizingImage { id, handle, start_world, orig_left, orig_w, orig_h, .. } => {
                let id = *id;
                let dx = world_pt.x - start_world.x;
                let signed = if handle.is_left() { -dx } else { dx };
                let aspect = if *orig_h > 0.0 { *orig_w / *orig_h } else { 1.0 };
                let width = (*orig_w + signed).max(MIN_IMAGE_WIDTH);
                let height = (width / aspect.max(1e-4)).max(1.0);
                let left = if handle.is_left() { *orig_left + *orig_w - width } else { *orig_left };
                if let Some(img) = self.scene.image_mut(&id) {
                    img.left = left;
                    img.width = width;
                    img.height = height;
                    let rect = img.bounds();
                    self.ensure_object_bounds(rect, &mut actions);
                    actions.push(Action::RenderNeeded);
                    self.push_selection_moved(&mut actions);
                }
            }
            InputState::Inking { points } => {
                points.push(StrokePoint::at(world_pt));
                actions.push(Action::RenderNeeded);
            }
            InputState::Erasing { erased } => {
                let mut erased = std::mem::take(erased);
                self.erase_at(world_pt, &mut erased, &mut actions);
                self.input = InputState::Erasing { erased };
            }
        }
        actions
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        let state = std::mem::take(&mut self.input);

        match state {
            InputState::Idle => return actions,
            InputState::Panning { .. } => {
                debug!(pan_x = self.camera.pan_x, pan_y = self.camera.pan_y, "pan end");
            }
            InputState::MarqueeSelecting { start_screen, .. } => {
                let rect = Rect::from_corners(start_screen, screen_pt);
                if rect.width >= MIN_MARQUEE_PX && rect.height >= MIN_MARQUEE_PX {
                    let ids = marquee_select(&self.scene, &self.camera, &rect);
                    debug!(count = ids.len(), "marquee select");
                    if self.selection.replace(ids) {
                        self.push_selection_moved(&mut actions);
                    }
                }
                actions.push(Action::RenderNeeded);
            }
            InputState::DraggingImage { .. } | InputState::ResizingImage { .. } => {
                debug!("image transform end");
                self.request_save(&mut actions);
            }
            InputState::Inking { points } => {
                let stroke = StrokeObject::new(points);
                let rect = stroke.bounds();
                let id = self.scene.insert(SceneObject::Stroke(stroke));
                self.ensure_object_bounds(rect, &mut actions);
                actions.push(Action::ObjectAdded(id));
                actions.push(Action::RenderNeeded);
                self.request_save(&mut actions);
            }
            InputState::Erasing { erased } => {
                if !erased.is_empty() {
                    debug!(count = erased.len(), "strokes erased");
                    self.request_save(&mut actions);
                }
            }
        }

        actions.push(Action::ReleasePointer);
        let cursor = self.idle_cursor();
        self.set_cursor(cursor, &mut actions);
        actions
    }

    /// Modifier-gated wheel gestures: Ctrl zooms, Shift scales and Alt rotates
    /// the selected images. Each event is one fixed step in the direction of `dy`.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        let direction = delta.direction();
        if direction == 0.0 {
            return actions;
        }

        if modifiers.command() {
            if self.camera.zoom_at(screen_pt, direction * ZOOM_STEP) {
                actions.push(Action::ZoomChanged { percent: self.camera.zoom_percent() });
                actions.push(Action::RenderNeeded);
                self.push_selection_moved(&mut actions);
            }
        } else if modifiers.shift {
            self.transform_selected_images(&mut actions, |img| img.adjust_scale(direction * SCALE_STEP));
        } else if modifiers.alt {
            self.transform_selected_images(&mut actions, |img| img.adjust_rotation(direction * ROTATION_STEP_DEG));
        }
        actions
    }

    fn transform_selected_images(&mut self, actions: &mut Vec<Action>, mut apply: impl FnMut(&mut ImageObject)) {
        let ids = self.selection.image_ids(&self.scene);
        if ids.is_empty() {
            return;
        }
        for id in &ids {
            if let Some(img) = self.scene.image_mut(id) {
                apply(img);
                let rect = img.visual_bounds();
                self.ensure_object_bounds(rect, actions);
            }
        }
        actions.push(Action::RenderNeeded);
        self.push_selection_moved(actions);
        self.request_save(actions);
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() && key.is("z") {
            return self.undo();
        }
        Vec::new()
    }

    // --- Scene commands ---

    /// Remove the most recent stroke, or the most recent image when no strokes remain.
    pub fn undo(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        let removed = match self.scene.pop_last_stroke() {
            Some(stroke) => Some(stroke.id),
            None => self.scene.pop_last_image().map(|img| img.id),
        };
        let Some(id) = removed else {
            return actions;
        };
        debug!(%id, "undo");
        actions.push(Action::ObjectRemoved(id));
        if self.selection.prune(&self.scene) {
            self.push_selection_moved(&mut actions);
        }
        actions.push(Action::RenderNeeded);
        self.request_save(&mut actions);
        actions
    }

    /// Place an image to the right of every existing image and select the Select tool.
    pub fn add_image(&mut self, source: &str, origin: ImageOrigin) -> Result<(ObjectId, Vec<Action>), SceneError> {
        let width = DEFAULT_IMAGE_WIDTH;
        let height = self.natural_height(source, width);
        let left = self.scene.next_image_left();
        let img = ImageObject::new(source, origin, left, IMAGE_PLACEMENT_TOP, width, height)?;
        let rect = img.bounds();
        let id = self.scene.insert(SceneObject::Image(img));
        info!(%id, source, left, "image added");

        let mut actions = vec![Action::ObjectAdded(id)];
        self.ensure_object_bounds(rect, &mut actions);
        if self.tool != Tool::Select {
            actions.extend(self.set_tool(Tool::Select));
        }
        actions.push(Action::RenderNeeded);
        self.request_save(&mut actions);
        Ok((id, actions))
    }

    /// Ask the picker for a PNG/JPEG and place it. Cancellation is a no-op.
    pub fn upload_image(&mut self, picker: &dyn FilePicker) -> Vec<Action> {
        let Some(path) = picker.pick_image() else {
            return Vec::new();
        };
        let source = path.to_string_lossy();
        match self.place_upload(&source) {
            Ok((_, actions)) => actions,
            Err(e) => {
                warn!(error = %e, "upload rejected");
                Vec::new()
            }
        }
    }

    /// Place a local PNG/JPEG file.
    pub fn place_upload(&mut self, path: &str) -> Result<(ObjectId, Vec<Action>), SceneError> {
        if !is_image_path(path) {
            return Err(SceneError::UnsupportedImagePath(path.to_owned()));
        }
        self.add_image(path, ImageOrigin::Upload)
    }

    /// Remove every stroke and image and return the world to its initial extent.
    pub fn clear_canvas(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.input.is_idle() {
            self.input = InputState::Idle;
            actions.push(Action::ReleasePointer);
        }
        self.scene.clear();
        if self.selection.clear() {
            self.push_selection_moved(&mut actions);
        }
        self.world.reset();
        info!("canvas cleared");
        actions.push(Action::WorldResized { width: self.world.width, height: self.world.height });
        actions.push(Action::RenderNeeded);
        self.request_save(&mut actions);
        actions
    }

    /// Height for a `width`-wide image keeping its natural aspect ratio, or square.
    fn natural_height(&self, source: &str, width: f64) -> f64 {
        match self.images.dimensions(source) {
            Some((w, h)) if w > 0 && h > 0 => width * f64::from(h) / f64::from(w),
            _ => width,
        }
    }

    fn erase_at(&mut self, world_pt: Point, erased: &mut Vec<ObjectId>, actions: &mut Vec<Action>) {
        let tolerance = self.camera.screen_dist_to_world(ERASER_RADIUS);
        let removed = self.scene.remove_strokes_where(|s| stroke_hits_point(s, world_pt, tolerance));
        if removed.is_empty() {
            return;
        }
        actions.extend(removed.iter().copied().map(Action::ObjectRemoved));
        erased.extend(removed);
        if self.selection.prune(&self.scene) {
            self.push_selection_moved(actions);
        }
        actions.push(Action::RenderNeeded);
    }

    // --- Chat ---

    pub fn add_message(&mut self, role: ChatRole, content: &str, image_url: Option<String>) -> (MessageId, Vec<Action>) {
        let id = self.chat.push(role, content, image_url);
        let mut actions = vec![Action::ChatChanged(id)];
        self.request_save(&mut actions);
        (id, actions)
    }

    pub fn delete_message(&mut self, id: &MessageId) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.chat.remove(id).is_some() {
            actions.push(Action::ChatChanged(*id));
            self.request_save(&mut actions);
        }
        actions
    }

    /// Add the empty assistant message a streamed reply will fill.
    pub fn begin_assistant_message(&mut self) -> MessageId {
        self.chat.push(ChatRole::Assistant, "", None)
    }

    /// Append a streamed fragment. Fragments for deleted messages are dropped.
    pub fn append_assistant_chunk(&mut self, id: &MessageId, fragment: &str) -> Vec<Action> {
        if self.chat.append(id, fragment) { vec![Action::ChatChanged(*id)] } else { Vec::new() }
    }

    /// Finish a reply: move a markdown image reference onto the canvas.
    pub fn finish_assistant_message(&mut self, id: &MessageId) -> Vec<Action> {
        let Some(entry) = self.chat.get(id) else {
            return Vec::new();
        };
        let mut actions = vec![Action::ChatChanged(*id)];
        if let Some(reference) = extract_image_reference(&entry.content) {
            let content = if reference.cleaned.is_empty() { IMAGE_ONLY_REPLY.to_owned() } else { reference.cleaned };
            self.chat.set_content(id, content);
            self.chat.set_image_url(id, reference.url.clone());
            match self.add_image(&reference.url, ImageOrigin::Generated) {
                Ok((_, added)) => actions.extend(added),
                Err(e) => warn!(error = %e, url = %reference.url, "generated image not placed"),
            }
        }
        self.request_save(&mut actions);
        actions
    }

    /// Replace a reply with a visible error.
    pub fn fail_assistant_message(&mut self, id: &MessageId, error: &str) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.chat.set_content(id, format!("Error: {error}")) {
            actions.push(Action::ChatChanged(*id));
            self.request_save(&mut actions);
        }
        actions
    }

    /// Rasterize the selection and log a `[Selection]` user message for `instruction`.
    ///
    /// Returns `None` for a blank instruction. Rasterization failures are
    /// logged and yield a request without attachment.
    pub fn prepare_selection_request(&mut self, instruction: &str) -> Option<(SelectionRequest, Vec<Action>)> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return None;
        }
        let label = format!("[Selection] {instruction}");

        let attachment = match self.render_selection() {
            Ok(render) => {
                let preview_path = match render.write_temp_preview(&self.preview_dir) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!(error = %e, "selection preview not written");
                        None
                    }
                };
                Some(SelectionAttachment {
                    filename: format!("selection_{}.png", timestamp_millis()),
                    data_url: render.data_url(),
                    preview_path,
                })
            }
            Err(e) => {
                warn!(error = %e, "selection render failed; sending instruction without image");
                None
            }
        };

        let preview = attachment
            .as_ref()
            .and_then(|a| a.preview_path.as_ref())
            .map(|p| p.to_string_lossy().into_owned());
        let (user_message, actions) = self.add_message(ChatRole::User, &label, preview);
        Some((SelectionRequest { user_message, instruction: instruction.to_owned(), attachment }, actions))
    }

    // --- Selection output ---

    pub fn render_selection(&self) -> Result<SelectionRender, RenderError> {
        render_selection(&self.scene, self.selection.ids(), self.images.as_ref())
    }

    /// Render the selection and write it to a path chosen through `picker`.
    pub fn try_export_selection(&self, picker: &dyn FilePicker) -> Result<Option<PathBuf>, RenderError> {
        let render = self.render_selection()?;
        let suggested = format!("selection_{}.png", timestamp_millis());
        let Some(path) = picker.pick_save_path(&suggested) else {
            return Ok(None);
        };
        render.write_to(&path)?;
        info!(path = %path.display(), "selection exported");
        Ok(Some(path))
    }

    /// Export, logging failures. Returns the written path.
    pub fn export_selection(&self, picker: &dyn FilePicker) -> Option<PathBuf> {
        match self.try_export_selection(picker) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "selection export failed");
                None
            }
        }
    }

    /// Put the rendered selection on the clipboard. Returns whether it worked.
    pub fn copy_selection(&self, clipboard: &dyn ClipboardSink) -> bool {
        let render = match self.render_selection() {
            Ok(render) => render,
            Err(e) => {
                warn!(error = %e, "selection copy failed");
                return false;
            }
        };
        match clipboard.put_png(&render.png) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "selection copy failed");
                false
            }
        }
    }

    // --- Persistence ---

    /// Current chat and images in snapshot form. Strokes are not included.
    #[must_use]
    pub fn snapshot(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            chat_history: self
                .chat
                .entries()
                .iter()
                .map(|e| PersistedChatEntry {
                    role: e.role.label().to_owned(),
                    content: e.content.clone(),
                    image_url: e.image_url.clone(),
                })
                .collect(),
            canvas_images: self
                .scene
                .images()
                .map(|img| {
                    let (scale_x, scale_y) = img.scale();
                    PersistedImage {
                        path: img.source.clone(),
                        left: img.left,
                        top: img.top,
                        width: img.width,
                        scale_x,
                        scale_y,
                        rotation: img.rotation(),
                    }
                })
                .collect(),
        }
    }

    /// Replace chat and scene wholesale. Saves are suppressed while replaying.
    pub fn restore(&mut self, snapshot: PersistedSnapshot) -> Vec<Action> {
        self.restoring = true;
        let mut actions = Vec::new();

        self.input = InputState::Idle;
        self.scene.clear();
        self.selection.clear();
        self.chat.clear();
        self.world.reset();

        for entry in snapshot.chat_history {
            self.chat.push(ChatRole::from_label_lossy(&entry.role), entry.content, entry.image_url);
        }
        for placed in snapshot.canvas_images {
            if !placed.has_sane_geometry() {
                warn!(
                    path = %placed.path,
                    left = placed.left,
                    top = placed.top,
                    width = placed.width,
                    "skipping image with out-of-range geometry"
                );
                continue;
            }
            let height = self.natural_height(&placed.path, placed.width);
            let mut img =
                match ImageObject::new(placed.path, ImageOrigin::Restored, placed.left, placed.top, placed.width, height) {
                    Ok(img) => img,
                    Err(e) => {
                        warn!(error = %e, "skipping unrestorable image");
                        continue;
                    }
                };
            img.set_scale(placed.scale_x, placed.scale_y);
            img.set_rotation(placed.rotation);
            let rect = img.bounds();
            self.scene.insert(SceneObject::Image(img));
            self.ensure_object_bounds(rect, &mut actions);
        }

        self.restoring = false;
        actions.push(Action::WorldResized { width: self.world.width, height: self.world.height });
        actions.push(Action::SelectionChanged { count: 0, anchor: None });
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Internals ---

    fn request_save(&mut self, actions: &mut Vec<Action>) {
        if self.restoring {
            return;
        }
        if let Some(store) = &self.store {
            store.save(&self.snapshot());
        }
        actions.push(Action::SaveRequested);
    }

    fn ensure_object_bounds(&mut self, rect: Rect, actions: &mut Vec<Action>) {
        let adj = self.world.ensure_bounds(rect, &mut self.scene, &mut self.camera);
        if adj.shifted() {
            self.input.shift(adj.shift_x, adj.shift_y);
        }
        if adj.grew {
            actions.push(Action::WorldResized { width: self.world.width, height: self.world.height });
        }
    }

    fn push_selection_moved(&self, actions: &mut Vec<Action>) {
        actions.push(Action::SelectionChanged { count: self.selection.len(), anchor: self.popup_anchor() });
    }

    fn set_cursor(&mut self, cursor: Cursor, actions: &mut Vec<Action>) {
        if cursor != self.cursor {
            self.cursor = cursor;
            actions.push(Action::SetCursor(cursor));
        }
    }

    fn idle_cursor(&self) -> Cursor {
        match self.tool {
            Tool::Select => Cursor::Arrow,
            Tool::Hand => Cursor::Hand,
            Tool::Ink | Tool::Eraser => Cursor::Crosshair,
        }
    }

    fn hover_cursor(&self, world_pt: Point) -> Cursor {
        if self.tool != Tool::Select {
            return self.idle_cursor();
        }
        match pick_top_object_at(&self.scene, world_pt) {
            Some(hit) if hit.kind == HitKind::Image => match hit.part {
                HitPart::ResizeHandle(corner) => Cursor::for_corner(corner),
                HitPart::Body => Cursor::Move,
            },
            _ => Cursor::Arrow,
        }
    }
}
