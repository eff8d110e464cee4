//! Selection rasterizer: draws selected images and strokes to a PNG.
//!
//! This module never mutates the scene. It receives a read-only scene, the
//! ids to draw, and an [`ImageProvider`] for pixel data, and produces an
//! encoded bitmap in world units (one pixel per world unit).
//!
//! Layering matches the canvas: background first, then every selected image
//! in z-order, then every selected stroke on top so annotations stay
//! visible over the content they mark up.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Pixel, Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::camera::{Point, Rect};
use crate::capability::ImageProvider;
use crate::consts::{BACKGROUND_COLOR, INK_COLOR, MAX_RENDER_SIDE, RENDER_PADDING, STROKE_WIDTH};
use crate::scene::{ImageObject, ObjectId, Scene, SceneObject, StrokeObject};

/// Why a selection could not be rasterized.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("selection is empty or has no area")]
    EmptySelection,
    #[error("selection raster {width}x{height} exceeds the size limit")]
    TooLarge { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An encoded selection raster.
#[derive(Debug, Clone)]
pub struct SelectionRender {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// World position of the raster's top-left pixel.
    pub origin: Point,
}

impl SelectionRender {
    #[must_use]
    pub fn base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    /// `data:image/png;base64,...` form used for chat attachments.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.base64())
    }

    /// Write the PNG to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), RenderError> {
        std::fs::write(path, &self.png).map_err(|source| RenderError::Io { path: path.to_path_buf(), source })
    }

    /// Write the PNG into `dir` under a timestamped name and return the path.
    pub fn write_temp_preview(&self, dir: &Path) -> Result<PathBuf, RenderError> {
        let path = dir.join(format!("inkchat_selection_{}.png", timestamp_millis()));
        self.write_to(&path)?;
        debug!(path = %path.display(), "selection preview written");
        Ok(path)
    }
}

/// Milliseconds since the Unix epoch, or zero if the clock is before it.
#[must_use]
pub fn timestamp_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis())
}

/// Union of the rendered extents of `ids`. Images use their transformed quad.
#[must_use]
pub fn selection_extent(scene: &Scene, ids: &[ObjectId]) -> Option<Rect> {
    scene
        .objects()
        .iter()
        .filter(|obj| ids.contains(&obj.id()))
        .map(|obj| match obj {
            SceneObject::Image(img) => img.visual_bounds(),
            SceneObject::Stroke(s) => s.bounds(),
        })
        .filter(|r| !r.is_degenerate())
        .reduce(|acc, r| acc.union(&r))
}

/// Rasterize the objects in `ids` to a padded PNG.
///
/// Images whose pixels cannot be loaded are skipped with a warning; the
/// rest of the selection still renders.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn render_selection(
    scene: &Scene,
    ids: &[ObjectId],
    images: &dyn ImageProvider,
) -> Result<SelectionRender, RenderError> {
    let extent = selection_extent(scene, ids).ok_or(RenderError::EmptySelection)?;
    let frame = extent.inflate(RENDER_PADDING);
    let width = frame.width.ceil().max(1.0) as u32;
    let height = frame.height.ceil().max(1.0) as u32;
    if width > MAX_RENDER_SIDE || height > MAX_RENDER_SIDE {
        return Err(RenderError::TooLarge { width, height });
    }

    let origin = Point::new(frame.left, frame.top);
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba(BACKGROUND_COLOR));

    let selected = || scene.objects().iter().filter(|obj| ids.contains(&obj.id()));
    for img in selected().filter_map(SceneObject::as_image) {
        match images.load(&img.source) {
            Ok(pixels) => draw_image(&mut canvas, origin, img, &pixels),
            Err(e) => warn!(error = %e, id = %img.id, "skipping image in selection render"),
        }
    }
    for stroke in selected().filter_map(SceneObject::as_stroke) {
        draw_stroke(&mut canvas, origin, stroke);
    }

    let mut png = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    debug!(width, height, bytes = png.len(), "selection rendered");
    Ok(SelectionRender { png, width, height, origin })
}

/// Inverse-map every pixel of the image's rendered quad back into source
/// pixels (nearest neighbour) and blend over the canvas.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_image(canvas: &mut RgbaImage, origin: Point, img: &ImageObject, pixels: &RgbaImage) {
    let (src_w, src_h) = pixels.dimensions();
    if src_w == 0 || src_h == 0 {
        return;
    }
    let quad = img.visual_bounds();
    let x0 = (quad.left - origin.x).floor().max(0.0) as u32;
    let y0 = (quad.top - origin.y).floor().max(0.0) as u32;
    let x1 = ((quad.right() - origin.x).ceil().max(0.0) as u32).min(canvas.width());
    let y1 = ((quad.bottom() - origin.y).ceil().max(0.0) as u32).min(canvas.height());

    for py in y0..y1 {
        for px in x0..x1 {
            let world = Point::new(origin.x + f64::from(px) + 0.5, origin.y + f64::from(py) + 0.5);
            let local = img.to_local(world);
            let u = (local.x - img.left) / img.width;
            let v = (local.y - img.top) / img.height;
            if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                continue;
            }
            let sx = ((u * f64::from(src_w)) as u32).min(src_w - 1);
            let sy = ((v * f64::from(src_h)) as u32).min(src_h - 1);
            canvas.get_pixel_mut(px, py).blend(pixels.get_pixel(sx, sy));
        }
    }
}

/// Stamp ink discs along every segment of the stroke.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_stroke(canvas: &mut RgbaImage, origin: Point, stroke: &StrokeObject) {
    let radius = (STROKE_WIDTH / 2.0).max(0.5);
    let ink = Rgba(INK_COLOR);
    let local = |p: Point| Point::new(p.x - origin.x, p.y - origin.y);

    let mut points = stroke.points.iter().map(|p| local(p.point()));
    let Some(mut prev) = points.next() else {
        return;
    };
    stamp_disc(canvas, prev, radius, ink);
    for next in points {
        let steps = (prev.distance(next) / (radius / 2.0)).ceil().max(1.0) as u32;
        for i in 1..=steps {
            let t = f64::from(i) / f64::from(steps);
            let p = Point::new(prev.x + (next.x - prev.x) * t, prev.y + (next.y - prev.y) * t);
            stamp_disc(canvas, p, radius, ink);
        }
        prev = next;
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn stamp_disc(canvas: &mut RgbaImage, center: Point, radius: f64, color: Rgba<u8>) {
    let (w, h) = canvas.dimensions();
    let x0 = (center.x - radius).floor().max(0.0) as u32;
    let y0 = (center.y - radius).floor().max(0.0) as u32;
    let x1 = ((center.x + radius).ceil().max(0.0) as u32).min(w);
    let y1 = ((center.y + radius).ceil().max(0.0) as u32).min(h);
    for py in y0..y1 {
        for px in x0..x1 {
            let c = Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
            if c.distance(center) <= radius {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}
