//! Shared numeric constants for the canvas crate.

// ── Viewport ────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 5.0;

/// Zoom change applied per Ctrl+wheel event.
pub const ZOOM_STEP: f64 = 0.1;

/// Zoom changes smaller than this are ignored.
pub const ZOOM_EPSILON: f64 = 1e-6;

// ── World extent ────────────────────────────────────────────────

/// Initial world width in world units.
pub const WORLD_INITIAL_WIDTH: f64 = 4000.0;

/// Initial world height in world units.
pub const WORLD_INITIAL_HEIGHT: f64 = 3000.0;

/// Margin that must stay empty between any object and the far world edges.
pub const WORLD_PADDING: f64 = 200.0;

/// Where content with negative coordinates lands after recentering.
pub const WORLD_RECOVER_PADDING: f64 = 200.0;

/// Amount a world dimension grows by per expansion step.
pub const WORLD_EXPANSION_STEP: f64 = 2000.0;

/// Largest coordinate or width accepted from a snapshot.
pub const MAX_WORLD_COORD: f64 = 1.0e7;

// ── Images ──────────────────────────────────────────────────────

/// Hit slop around image corners (world units).
pub const RESIZE_HANDLE_RADIUS: f64 = 14.0;

/// Images cannot be resized narrower than this.
pub const MIN_IMAGE_WIDTH: f64 = 60.0;

/// Logical width given to newly placed images.
pub const DEFAULT_IMAGE_WIDTH: f64 = 400.0;

/// Left edge of the first placed image.
pub const IMAGE_PLACEMENT_LEFT: f64 = 50.0;

/// Top edge of every newly placed image.
pub const IMAGE_PLACEMENT_TOP: f64 = 100.0;

/// Horizontal gap between sequentially placed images.
pub const IMAGE_PLACEMENT_GAP: f64 = 20.0;

/// Scale factor bounds for the per-image transform.
pub const MIN_IMAGE_SCALE: f64 = 0.1;
pub const MAX_IMAGE_SCALE: f64 = 10.0;

/// Scale change per Shift+wheel event.
pub const SCALE_STEP: f64 = 0.05;

/// Rotation change in degrees per Alt+wheel event.
pub const ROTATION_STEP_DEG: f64 = 2.0;

// ── Strokes ─────────────────────────────────────────────────────

/// Nominal ink thickness in world units.
pub const STROKE_WIDTH: f64 = 2.0;

/// Pressure assigned to points from devices that don't report it.
pub const DEFAULT_PRESSURE: f32 = 0.5;

/// Tolerance used when testing whether the pointer rests on a stroke.
pub const STROKE_POINT_TOLERANCE: f64 = 3.0;

/// Tolerance used when testing strokes against a marquee.
pub const STROKE_MARQUEE_TOLERANCE: f64 = 2.0;

/// Eraser reach around the pointer (world units).
pub const ERASER_RADIUS: f64 = 6.0;

/// Ink color, fixed for the session.
pub const INK_COLOR: [u8; 4] = [0, 255, 255, 255];

// ── Selection ───────────────────────────────────────────────────

/// Marquees smaller than this (screen pixels, either axis) select nothing.
pub const MIN_MARQUEE_PX: f64 = 3.0;

/// Minimum distance between the instruction popup and the viewport edges.
pub const POPUP_MARGIN_PX: f64 = 10.0;

/// Vertical gap between the selection's bottom edge and the popup.
pub const POPUP_GAP_PX: f64 = 10.0;

/// Nominal popup size used when clamping against the far viewport edges.
pub const POPUP_WIDTH_PX: f64 = 320.0;
pub const POPUP_HEIGHT_PX: f64 = 90.0;

// ── Rasterization ───────────────────────────────────────────────

/// Padding around the selection when rasterized.
pub const RENDER_PADDING: f64 = 10.0;

/// Canvas background color.
pub const BACKGROUND_COLOR: [u8; 4] = [15, 15, 15, 255];

/// Largest raster side, in pixels, a selection render may allocate.
pub const MAX_RENDER_SIDE: u32 = 16_384;
