//! Input model: tools, modifier keys, mouse buttons, cursors, and the gesture
//! state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is the gesture tracked between pointer-down and
//! pointer-up. Each active variant carries the world-space start of the
//! gesture plus the original geometry of the target, so every move can be
//! computed as an absolute delta from the start rather than accumulated.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::hit::Corner;
use crate::scene::{ObjectId, StrokePoint};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Primary drag pans the viewport.
    Hand,
    /// Primary drag draws freehand ink.
    Ink,
    /// Primary drag erases whole strokes it touches.
    Eraser,
}

impl Tool {
    /// Stable lowercase name, used for CLI parsing and logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Hand => "hand",
            Self::Ink => "ink",
            Self::Eraser => "eraser",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "select" => Some(Self::Select),
            "hand" => Some(Self::Hand),
            "ink" | "pen" => Some(Self::Ink),
            "eraser" => Some(Self::Eraser),
            _ => None,
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key. Treated like Ctrl for zoom and undo.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the host (e.g. `"z"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    /// Case-insensitive comparison against a key name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

impl WheelDelta {
    /// `+1.0` for scrolling up, `-1.0` for down, `0.0` for no vertical motion.
    ///
    /// Wheel gestures step by a fixed amount per event, so only the sign of
    /// `dy` matters.
    #[must_use]
    pub fn direction(&self) -> f64 {
        if self.dy < 0.0 {
            1.0
        } else if self.dy > 0.0 {
            -1.0
        } else {
            0.0
        }
    }
}

/// Pointer cursor the host should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Arrow,
    Hand,
    Move,
    Crosshair,
    /// Diagonal resize for top-left / bottom-right handles.
    ResizeNwse,
    /// Diagonal resize for top-right / bottom-left handles.
    ResizeNesw,
}

impl Cursor {
    #[must_use]
    pub fn for_corner(corner: Corner) -> Self {
        if corner.is_nwse() { Self::ResizeNwse } else { Self::ResizeNesw }
    }
}

/// Active gesture between pointer-down and pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Dragging the viewport. Pan is recomputed from the start on every move.
    Panning {
        start_screen: Point,
        start_pan_x: f64,
        start_pan_y: f64,
    },
    /// Rubber-band selection in screen space.
    MarqueeSelecting { start_screen: Point, current_screen: Point },
    /// Moving an image.
    DraggingImage {
        id: ObjectId,
        start_world: Point,
        orig_left: f64,
        orig_top: f64,
        orig_w: f64,
        orig_h: f64,
    },
    /// Resizing an image from one corner, keeping its aspect ratio.
    ResizingImage {
        id: ObjectId,
        handle: Corner,
        start_world: Point,
        orig_left: f64,
        orig_top: f64,
        orig_w: f64,
        orig_h: f64,
    },
    /// Drawing a stroke; points are committed as one object on release.
    Inking { points: Vec<StrokePoint> },
    /// Erasing; ids of strokes removed so far in this gesture.
    Erasing { erased: Vec<ObjectId> },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Move every world-space anchor by `(dx, dy)`.
    ///
    /// Called when the world recenters mid-gesture so the next move's delta is
    /// measured against the shifted scene.
    pub fn shift(&mut self, dx: f64, dy: f64) {
        match self {
            Self::DraggingImage { start_world, orig_left, orig_top, .. }
            | Self::ResizingImage { start_world, orig_left, orig_top, .. } => {
                start_world.x += dx;
                start_world.y += dy;
                *orig_left += dx;
                *orig_top += dy;
            }
            Self::Inking { points } => {
                for p in points {
                    p.x += dx;
                    p.y += dy;
                }
            }
            Self::Idle | Self::Panning { .. } | Self::MarqueeSelecting { .. } | Self::Erasing { .. } => {}
        }
    }
}
