//! Selection set, marquee resolution, and popup placement.
//!
//! A [`Selection`] stores object ids only; it never owns objects. Ids whose
//! object has left the scene are skipped on every read and pruned whenever
//! the scene loses objects.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use crate::camera::{Camera, Point, Rect};
use crate::consts::{POPUP_GAP_PX, POPUP_HEIGHT_PX, POPUP_MARGIN_PX, POPUP_WIDTH_PX, STROKE_MARQUEE_TOLERANCE};
use crate::hit::stroke_intersects_rect;
use crate::scene::{ImageObject, ObjectId, Scene, SceneObject};

/// The currently selected objects, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<ObjectId>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Replace the selection wholesale. Returns whether it changed.
    pub fn replace(&mut self, ids: Vec<ObjectId>) -> bool {
        if self.ids == ids {
            return false;
        }
        self.ids = ids;
        true
    }

    /// Select exactly one object. Returns whether the selection changed.
    pub fn select_only(&mut self, id: ObjectId) -> bool {
        self.replace(vec![id])
    }

    /// Returns whether anything was deselected.
    pub fn clear(&mut self) -> bool {
        self.replace(Vec::new())
    }

    /// Drop ids that no longer resolve. Returns whether anything was removed.
    pub fn prune(&mut self, scene: &Scene) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| scene.get(id).is_some());
        before != self.ids.len()
    }

    /// Selected objects that still exist, in selection order.
    pub fn resolve<'a>(&'a self, scene: &'a Scene) -> impl Iterator<Item = &'a SceneObject> + 'a {
        self.ids.iter().filter_map(|id| scene.get(id))
    }

    /// Selected images that still exist.
    #[must_use]
    pub fn image_ids(&self, scene: &Scene) -> Vec<ObjectId> {
        self.resolve(scene).filter_map(SceneObject::as_image).map(|img| img.id).collect()
    }

    /// Union of every selected object's bounds, or `None` when nothing resolves.
    #[must_use]
    pub fn bounds(&self, scene: &Scene) -> Option<Rect> {
        self.resolve(scene)
            .map(SceneObject::bounds)
            .filter(|r| !r.is_degenerate())
            .reduce(|acc, r| acc.union(&r))
    }

    /// Screen position for the floating instruction popup.
    ///
    /// Anchored at the bottom-left of the selection bounds, then clamped so
    /// the popup keeps `POPUP_MARGIN_PX` from the viewport edges. A zero
    /// viewport size skips the far-edge clamp.
    #[must_use]
    pub fn popup_anchor(&self, scene: &Scene, camera: &Camera, viewport_w: f64, viewport_h: f64) -> Option<Point> {
        let bounds = self.bounds(scene)?;
        let corner = camera.world_to_screen(bounds.bottom_left());
        let mut x = corner.x;
        let mut y = corner.y + POPUP_GAP_PX;
        if viewport_w > 0.0 {
            x = x.min(viewport_w - POPUP_MARGIN_PX - POPUP_WIDTH_PX);
        }
        if viewport_h > 0.0 {
            y = y.min(viewport_h - POPUP_MARGIN_PX - POPUP_HEIGHT_PX);
        }
        Some(Point::new(x.max(POPUP_MARGIN_PX), y.max(POPUP_MARGIN_PX)))
    }
}

/// Resolve a screen-space marquee to the objects it touches.
///
/// The two corners are mapped to world space independently. Strokes are
/// matched with a small tolerance; images by their axis-aligned logical
/// bounds. Result order follows z-order.
#[must_use]
pub fn marquee_select(scene: &Scene, camera: &Camera, screen_rect: &Rect) -> Vec<ObjectId> {
    let world = camera.screen_rect_to_world(screen_rect);
    scene
        .objects()
        .iter()
        .filter(|obj| match obj {
            SceneObject::Stroke(s) => stroke_intersects_rect(s, &world, STROKE_MARQUEE_TOLERANCE),
            SceneObject::Image(img) => image_in_marquee(img, &world),
        })
        .map(SceneObject::id)
        .collect()
}

fn image_in_marquee(img: &ImageObject, world: &Rect) -> bool {
    let bounds = img.bounds();
    !bounds.is_degenerate() && world.intersects(&bounds)
}
