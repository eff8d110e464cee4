//! World bounds: the finite backing extent behind the "infinite" canvas.
//!
//! Content may never sit at negative coordinates and must keep a padding
//! margin from the far edges. When an object violates either rule the
//! manager either recenters (shifts every object and compensates the camera
//! pan so nothing moves on screen) or grows the extent in fixed steps.

#[cfg(test)]
#[path = "world_test.rs"]
mod world_test;

use tracing::debug;

use crate::camera::{Camera, Rect};
use crate::consts::{
    WORLD_EXPANSION_STEP, WORLD_INITIAL_HEIGHT, WORLD_INITIAL_WIDTH, WORLD_PADDING, WORLD_RECOVER_PADDING,
};
use crate::scene::Scene;

/// Current size of the world and the rules used to keep content inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldExtent {
    pub width: f64,
    pub height: f64,
    /// Empty margin required beyond the right/bottom of every object.
    pub padding: f64,
    /// Distance from the origin that recentered content lands at.
    pub recover_padding: f64,
    /// Growth applied per expansion.
    pub expansion_step: f64,
}

impl Default for WorldExtent {
    fn default() -> Self {
        Self {
            width: WORLD_INITIAL_WIDTH,
            height: WORLD_INITIAL_HEIGHT,
            padding: WORLD_PADDING,
            recover_padding: WORLD_RECOVER_PADDING,
            expansion_step: WORLD_EXPANSION_STEP,
        }
    }
}

/// What `ensure_bounds` had to do.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundsAdjustment {
    /// Offset applied to every object (zero when no recentering happened).
    pub shift_x: f64,
    pub shift_y: f64,
    /// Whether the world extent grew.
    pub grew: bool,
}

impl BoundsAdjustment {
    #[must_use]
    pub fn shifted(&self) -> bool {
        self.shift_x != 0.0 || self.shift_y != 0.0
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.shifted() && !self.grew
    }
}

impl WorldExtent {
    /// Keep `rect` (an object's world bounds) inside the world.
    ///
    /// Negative left/top recenters the whole scene so the rect starts at
    /// `recover_padding`, compensating `camera` by `-shift * zoom`. Then the
    /// extent grows until `padding` fits past the rect's right/bottom.
    /// Degenerate rects are ignored.
    pub fn ensure_bounds(&mut self, rect: Rect, scene: &mut Scene, camera: &mut Camera) -> BoundsAdjustment {
        let mut adj = BoundsAdjustment::default();
        if rect.is_degenerate() || !rect.right().is_finite() || !rect.bottom().is_finite() {
            return adj;
        }

        if rect.left < 0.0 {
            adj.shift_x = self.recover_padding - rect.left;
        }
        if rect.top < 0.0 {
            adj.shift_y = self.recover_padding - rect.top;
        }
        if adj.shifted() {
            scene.translate_all(adj.shift_x, adj.shift_y);
            camera.pan_by(-adj.shift_x * camera.zoom, -adj.shift_y * camera.zoom);
            debug!(dx = adj.shift_x, dy = adj.shift_y, "world recentered");
        }

        let rect = rect.translate(adj.shift_x, adj.shift_y);
        let step = self.expansion_step.max(1.0);
        if let Some(width) = grown_extent(self.width, rect.right() + self.padding, step) {
            self.width = width;
            adj.grew = true;
        }
        if let Some(height) = grown_extent(self.height, rect.bottom() + self.padding, step) {
            self.height = height;
            adj.grew = true;
        }
        if adj.grew {
            debug!(width = self.width, height = self.height, "world extent grew");
        }
        adj
    }

    /// Return to the initial extent, keeping the configured margins.
    pub fn reset(&mut self) {
        self.width = WORLD_INITIAL_WIDTH;
        self.height = WORLD_INITIAL_HEIGHT;
    }
}

/// Smallest `current + n * step` (n >= 1) that reaches `needed`, or `None` if it already fits.
fn grown_extent(current: f64, needed: f64, step: f64) -> Option<f64> {
    if needed <= current {
        return None;
    }
    let steps = ((needed - current) / step).ceil().max(1.0);
    Some(current + steps * step)
}
