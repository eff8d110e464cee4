//! Scene model: placed images, ink strokes, and the ordered store holding them.
//!
//! Objects are kept in a single vector whose order is the z-order: later
//! entries are drawn above and hit-tested before earlier ones. Images carry a
//! logical rectangle plus an independent scale/rotation applied about their
//! own center; strokes are polylines in world space.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{Point, Rect};
use crate::consts::{
    DEFAULT_PRESSURE, IMAGE_PLACEMENT_GAP, IMAGE_PLACEMENT_LEFT, MAX_IMAGE_SCALE, MIN_IMAGE_SCALE, STROKE_WIDTH,
};

/// Unique identifier for a scene object.
pub type ObjectId = Uuid;

/// Errors produced when building scene objects.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// Images must have a strictly positive, finite size.
    #[error("image size must be positive, got {width}x{height}")]
    DegenerateImage { width: f64, height: f64 },

    /// Only PNG and JPEG files can be placed from disk.
    #[error("unsupported image path: {0}")]
    UnsupportedImagePath(String),
}

/// Where an image on the canvas came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageOrigin {
    /// Picked by the user from disk.
    #[default]
    Upload,
    /// Inserted from an assistant reply.
    Generated,
    /// Replayed from a persisted snapshot.
    Restored,
}

/// Whether `path` names a file type the canvas accepts for upload.
#[must_use]
pub fn is_image_path(path: &str) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg")
}

// =============================================================
// Images
// =============================================================

/// A placed image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageObject {
    pub id: ObjectId,
    /// File path or URL of the bitmap.
    pub source: String,
    pub origin: ImageOrigin,
    /// Left edge of the logical rectangle in world coordinates.
    pub left: f64,
    /// Top edge of the logical rectangle in world coordinates.
    pub top: f64,
    /// Logical width, always positive.
    pub width: f64,
    /// Logical height, always positive.
    pub height: f64,
    scale_x: f64,
    scale_y: f64,
    rotation: f64,
}

impl ImageObject {
    /// Create an untransformed image.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::DegenerateImage`] if either dimension is not positive.
    pub fn new(
        source: impl Into<String>,
        origin: ImageOrigin,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    ) -> Result<Self, SceneError> {
        if Rect::new(left, top, width, height).is_degenerate() {
            return Err(SceneError::DegenerateImage { width, height });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            source: source.into(),
            origin,
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        })
    }

    /// The logical (untransformed) rectangle.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    #[must_use]
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    /// Raw accumulated rotation in degrees.
    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Rotation folded into `[0, 360)`.
    #[must_use]
    pub fn rotation_normalized(&self) -> f64 {
        self.rotation.rem_euclid(360.0)
    }

    /// Set both scale factors, clamped to the allowed range.
    pub fn set_scale(&mut self, scale_x: f64, scale_y: f64) {
        self.scale_x = scale_x.clamp(MIN_IMAGE_SCALE, MAX_IMAGE_SCALE);
        self.scale_y = scale_y.clamp(MIN_IMAGE_SCALE, MAX_IMAGE_SCALE);
    }

    /// Add `delta` to both scale factors.
    pub fn adjust_scale(&mut self, delta: f64) {
        self.set_scale(self.scale_x + delta, self.scale_y + delta);
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees;
    }

    pub fn adjust_rotation(&mut self, delta: f64) {
        self.rotation += delta;
    }

    /// Whether scale or rotation differ from identity.
    #[must_use]
    pub fn is_transformed(&self) -> bool {
        (self.scale_x - 1.0).abs() > f64::EPSILON
            || (self.scale_y - 1.0).abs() > f64::EPSILON
            || self.rotation_normalized().abs() > f64::EPSILON
    }

    /// Corners of the rendered quad (scale then rotate about the center).
    #[must_use]
    pub fn visual_corners(&self) -> [Point; 4] {
        let c = self.bounds().center();
        let hw = self.width * self.scale_x / 2.0;
        let hh = self.height * self.scale_y / 2.0;
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        [(-hw, -hh), (hw, -hh), (-hw, hh), (hw, hh)].map(|(x, y)| Point::new(c.x + x * cos - y * sin, c.y + x * sin + y * cos))
    }

    /// Axis-aligned box around the rendered quad.
    #[must_use]
    pub fn visual_bounds(&self) -> Rect {
        let corners = self.visual_corners();
        let mut left = f64::INFINITY;
        let mut top = f64::INFINITY;
        let mut right = f64::NEG_INFINITY;
        let mut bottom = f64::NEG_INFINITY;
        for p in corners {
            left = left.min(p.x);
            top = top.min(p.y);
            right = right.max(p.x);
            bottom = bottom.max(p.y);
        }
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Map a world point into the image's unscaled, unrotated frame.
    #[must_use]
    pub fn to_local(&self, p: Point) -> Point {
        let c = self.bounds().center();
        let (sin, cos) = (-self.rotation).to_radians().sin_cos();
        let dx = p.x - c.x;
        let dy = p.y - c.y;
        let rx = dx * cos - dy * sin;
        let ry = dx * sin + dy * cos;
        Point::new(c.x + rx / self.scale_x, c.y + ry / self.scale_y)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.left += dx;
        self.top += dy;
    }
}

// =============================================================
// Strokes
// =============================================================

/// One sampled ink point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    /// Pen pressure in `[0, 1]`.
    pub pressure: f32,
}

impl StrokePoint {
    #[must_use]
    pub fn new(x: f64, y: f64, pressure: f32) -> Self {
        Self { x, y, pressure: pressure.clamp(0.0, 1.0) }
    }

    #[must_use]
    pub fn at(p: Point) -> Self {
        Self::new(p.x, p.y, DEFAULT_PRESSURE)
    }

    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A freehand ink stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeObject {
    pub id: ObjectId,
    pub points: Vec<StrokePoint>,
}

impl StrokeObject {
    #[must_use]
    pub fn new(points: Vec<StrokePoint>) -> Self {
        Self { id: Uuid::new_v4(), points }
    }

    /// Box around every point, widened by half the ink thickness.
    ///
    /// Degenerate when the stroke has no points.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let mut iter = self.points.iter();
        let Some(first) = iter.next() else {
            return Rect::new(0.0, 0.0, 0.0, 0.0);
        };
        let seed = Rect::new(first.x, first.y, 0.0, 0.0);
        iter.fold(seed, |acc, p| acc.union(&Rect::new(p.x, p.y, 0.0, 0.0)))
            .inflate(STROKE_WIDTH / 2.0)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }
}

// =============================================================
// SceneObject
// =============================================================

/// Anything that can sit on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneObject {
    Image(ImageObject),
    Stroke(StrokeObject),
}

impl SceneObject {
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Image(img) => img.id,
            Self::Stroke(s) => s.id,
        }
    }

    /// World-space box used for selection geometry.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Image(img) => img.bounds(),
            Self::Stroke(s) => s.bounds(),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Image(img) => img.translate(dx, dy),
            Self::Stroke(s) => s.translate(dx, dy),
        }
    }

    #[must_use]
    pub fn as_image(&self) -> Option<&ImageObject> {
        match self {
            Self::Image(img) => Some(img),
            Self::Stroke(_) => None,
        }
    }

    #[must_use]
    pub fn as_stroke(&self) -> Option<&StrokeObject> {
        match self {
            Self::Stroke(s) => Some(s),
            Self::Image(_) => None,
        }
    }
}

// =============================================================
// Scene
// =============================================================

/// Ordered store of scene objects; index order is z-order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self { objects: Vec::new() }
    }

    /// Append an object on top of everything else.
    pub fn insert(&mut self, obj: SceneObject) -> ObjectId {
        let id = obj.id();
        self.objects.push(obj);
        id
    }

    /// Remove an object by id, returning it if it was present.
    pub fn remove(&mut self, id: &ObjectId) -> Option<SceneObject> {
        let idx = self.objects.iter().position(|o| o.id() == *id)?;
        Some(self.objects.remove(idx))
    }

    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id() == *id)
    }

    #[must_use]
    pub fn image(&self, id: &ObjectId) -> Option<&ImageObject> {
        self.get(id).and_then(SceneObject::as_image)
    }

    pub fn image_mut(&mut self, id: &ObjectId) -> Option<&mut ImageObject> {
        self.objects.iter_mut().find_map(|o| match o {
            SceneObject::Image(img) if img.id == *id => Some(img),
            _ => None,
        })
    }

    /// All objects, bottom-most first.
    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn images(&self) -> impl DoubleEndedIterator<Item = &ImageObject> {
        self.objects.iter().filter_map(SceneObject::as_image)
    }

    pub fn strokes(&self) -> impl DoubleEndedIterator<Item = &StrokeObject> {
        self.objects.iter().filter_map(SceneObject::as_stroke)
    }

    /// Move every object and every stroke point by the same offset.
    pub fn translate_all(&mut self, dx: f64, dy: f64) {
        for obj in &mut self.objects {
            obj.translate(dx, dy);
        }
    }

    /// Remove the most recently added stroke.
    pub fn pop_last_stroke(&mut self) -> Option<StrokeObject> {
        let idx = self.objects.iter().rposition(|o| matches!(o, SceneObject::Stroke(_)))?;
        match self.objects.remove(idx) {
            SceneObject::Stroke(s) => Some(s),
            SceneObject::Image(_) => None,
        }
    }

    /// Remove the most recently added image.
    pub fn pop_last_image(&mut self) -> Option<ImageObject> {
        let idx = self.objects.iter().rposition(|o| matches!(o, SceneObject::Image(_)))?;
        match self.objects.remove(idx) {
            SceneObject::Image(img) => Some(img),
            SceneObject::Stroke(_) => None,
        }
    }

    /// Remove every stroke matching `pred`, returning their ids.
    pub fn remove_strokes_where(&mut self, mut pred: impl FnMut(&StrokeObject) -> bool) -> Vec<ObjectId> {
        let mut removed = Vec::new();
        self.objects.retain(|o| match o {
            SceneObject::Stroke(s) if pred(s) => {
                removed.push(s.id);
                false
            }
            _ => true,
        });
        removed
    }

    /// Left edge for the next auto-placed image, to the right of every existing one.
    #[must_use]
    pub fn next_image_left(&self) -> f64 {
        self.images()
            .map(|img| img.left + img.width + IMAGE_PLACEMENT_GAP)
            .fold(IMAGE_PLACEMENT_LEFT, f64::max)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Number of objects currently in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the scene contains no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
