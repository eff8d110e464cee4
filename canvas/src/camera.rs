//! Viewport transform: pan/zoom camera, points, and rectangles.
//!
//! Screen space is the pixel grid of the visible viewport. World space is the
//! logical coordinate system objects live in. The two are related by
//! `screen = world * zoom + pan`, with `pan` expressed in screen pixels.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::consts::{MAX_ZOOM, MIN_ZOOM, ZOOM_EPSILON};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Normalized rectangle spanning two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    #[must_use]
    pub fn bottom_left(&self) -> Point {
        Point::new(self.left, self.bottom())
    }

    /// True when either dimension is zero, negative, or not finite.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite())
    }

    /// Edge-inclusive containment.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }

    /// Edge-inclusive overlap test; touching rectangles intersect.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left <= other.right() && other.left <= self.right() && self.top <= other.bottom() && other.top <= self.bottom()
    }

    /// Grow the rectangle by `d` on every side.
    #[must_use]
    pub fn inflate(&self, d: f64) -> Self {
        Self { left: self.left - d, top: self.top - d, width: self.width + 2.0 * d, height: self.height + 2.0 * d }
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Self {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self { left, top, width: right - left, height: bottom - top }
    }

    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self { left: self.left + dx, top: self.top + dy, ..*self }
    }
}

/// Camera state for pan/zoom on the infinite canvas.
///
/// `pan_x` / `pan_y` are in screen pixels.
/// `zoom` is a scale factor (1.0 = no zoom), kept within `[MIN_ZOOM, MAX_ZOOM]`.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Convert a screen-space point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Convert a screen rectangle to world space, mapping each corner on its own.
    #[must_use]
    pub fn screen_rect_to_world(&self, rect: &Rect) -> Rect {
        let a = self.screen_to_world(Point::new(rect.left, rect.top));
        let b = self.screen_to_world(Point::new(rect.right(), rect.bottom()));
        Rect::from_corners(a, b)
    }

    /// Shift the pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Change zoom by `delta`, keeping the world point under `anchor` fixed on screen.
    ///
    /// Returns `false` when clamping leaves the zoom effectively unchanged.
    pub fn zoom_at(&mut self, anchor: Point, delta: f64) -> bool {
        let target = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        if (target - self.zoom).abs() < ZOOM_EPSILON {
            return false;
        }

        let world = self.screen_to_world(anchor);
        self.zoom = target;
        let moved = self.world_to_screen(world);
        self.pan_x += anchor.x - moved.x;
        self.pan_y += anchor.y - moved.y;
        true
    }

    /// Zoom as a whole-number percentage for display.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0 + 1e-9).floor() as u32
    }
}
