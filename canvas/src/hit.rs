//! Geometry-based hit-testing against scene objects.
//!
//! Everything here works in world coordinates and reads the [`Scene`]
//! directly, so picks are testable without any rendering surface.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Point, Rect};
use crate::consts::{RESIZE_HANDLE_RADIUS, STROKE_POINT_TOLERANCE, STROKE_WIDTH};
use crate::scene::{ImageObject, ObjectId, Scene, StrokeObject};

/// Which part of an object was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(Corner),
}

/// Image corner used as a resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Handles on the left edge move the image's left edge while resizing.
    #[must_use]
    pub fn is_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft)
    }

    /// True for the corners on the NW-SE diagonal.
    #[must_use]
    pub fn is_nwse(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomRight)
    }
}

/// What kind of object a hit landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Image,
    Stroke,
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub object_id: ObjectId,
    pub kind: HitKind,
    pub part: HitPart,
}

/// Find the object under `world_pt`.
///
/// Images are checked first, topmost first, against their handle-inflated
/// rectangle (or their rendered quad when scaled or rotated). Strokes are
/// only considered when no image qualifies, so annotations drawn over an
/// image never block grabbing it.
#[must_use]
pub fn pick_top_object_at(scene: &Scene, world_pt: Point) -> Option<Hit> {
    if let Some(img) = scene.images().rev().find(|img| image_contains(img, world_pt, RESIZE_HANDLE_RADIUS)) {
        let part = hit_test_resize_handle(img, world_pt, RESIZE_HANDLE_RADIUS).map_or(HitPart::Body, HitPart::ResizeHandle);
        return Some(Hit { object_id: img.id, kind: HitKind::Image, part });
    }

    scene
        .strokes()
        .rev()
        .find(|s| stroke_hits_point(s, world_pt, STROKE_POINT_TOLERANCE))
        .map(|s| Hit { object_id: s.id, kind: HitKind::Stroke, part: HitPart::Body })
}

/// Whether `world_pt` lands on the image, allowing `slop` around its edges.
#[must_use]
pub fn image_contains(img: &ImageObject, world_pt: Point, slop: f64) -> bool {
    let bounds = img.bounds();
    if bounds.is_degenerate() {
        return false;
    }
    if bounds.inflate(slop).contains(world_pt) {
        return true;
    }
    if !img.is_transformed() {
        return false;
    }
    let (sx, sy) = img.scale();
    let local_slop = slop / sx.min(sy);
    bounds.inflate(local_slop).contains(img.to_local(world_pt))
}

/// Which corner of the image's unrotated box is within `radius` of `world_pt`.
///
/// Ties resolve top-left, top-right, bottom-left, bottom-right.
#[must_use]
pub fn hit_test_resize_handle(img: &ImageObject, world_pt: Point, radius: f64) -> Option<Corner> {
    let b = img.bounds();
    if b.is_degenerate() {
        return None;
    }
    [
        (Corner::TopLeft, Point::new(b.left, b.top)),
        (Corner::TopRight, Point::new(b.right(), b.top)),
        (Corner::BottomLeft, Point::new(b.left, b.bottom())),
        (Corner::BottomRight, Point::new(b.right(), b.bottom())),
    ]
    .into_iter()
    .find(|(_, corner)| world_pt.distance(*corner) <= radius)
    .map(|(c, _)| c)
}

// =============================================================
// Stroke geometry
// =============================================================

/// Shortest distance from `p` to the segment `a`-`b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Whether the stroke passes within `tolerance` of `p`, counting its thickness.
#[must_use]
pub fn stroke_hits_point(stroke: &StrokeObject, p: Point, tolerance: f64) -> bool {
    let reach = tolerance + STROKE_WIDTH / 2.0;
    match stroke.points.as_slice() {
        [] => false,
        [only] => only.point().distance(p) <= reach,
        pts => pts.windows(2).any(|w| distance_to_segment(p, w[0].point(), w[1].point()) <= reach),
    }
}

/// Whether any part of the stroke touches `rect` grown by `tolerance`.
#[must_use]
pub fn stroke_intersects_rect(stroke: &StrokeObject, rect: &Rect, tolerance: f64) -> bool {
    let area = rect.inflate(tolerance + STROKE_WIDTH / 2.0);
    match stroke.points.as_slice() {
        [] => false,
        [only] => area.contains(only.point()),
        pts => pts.windows(2).any(|w| segment_intersects_rect(w[0].point(), w[1].point(), &area)),
    }
}

/// Whether the segment `a`-`b` touches `rect` (edges inclusive).
#[must_use]
pub fn segment_intersects_rect(a: Point, b: Point, rect: &Rect) -> bool {
    if rect.contains(a) || rect.contains(b) {
        return true;
    }
    let tl = Point::new(rect.left, rect.top);
    let tr = Point::new(rect.right(), rect.top);
    let bl = Point::new(rect.left, rect.bottom());
    let br = Point::new(rect.right(), rect.bottom());
    [(tl, tr), (tr, br), (br, bl), (bl, tl)]
        .into_iter()
        .any(|(c, d)| segments_intersect(a, b, c, d))
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0)) && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0)) {
        return true;
    }
    (d1 == 0.0 && on_segment(p1, p3, p4))
        || (d2 == 0.0 && on_segment(p2, p3, p4))
        || (d3 == 0.0 && on_segment(p3, p1, p2))
        || (d4 == 0.0 && on_segment(p4, p1, p2))
}
