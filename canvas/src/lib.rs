//! Annotation canvas engine for the image-and-chat workspace.
//!
//! This crate owns the full lifecycle of one canvas window: translating raw
//! pointer, wheel and key events into scene mutations, maintaining the
//! camera and the finite world extent behind the "infinite" canvas,
//! hit-testing, rasterizing selections, and snapshotting chat and images to
//! disk. The host is responsible only for drawing the scene and acting on
//! the returned [`engine::Action`]s. Network access lives in the parent
//! crate's chat bridge.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::CanvasSession`], the owner of all window state |
//! | [`scene`] | Image and stroke objects and the z-ordered scene |
//! | [`camera`] | Pan/zoom camera, points, rectangles |
//! | [`world`] | World extent growth and recentering |
//! | [`input`] | Tools, input event types, and the gesture state machine |
//! | [`hit`] | Hit-testing against images and strokes |
//! | [`selection`] | Selection set, marquee resolution, popup placement |
//! | [`chat`] | Chat transcript and image-reference extraction |
//! | [`render`] | Selection rasterizer (PNG, base64, data URL) |
//! | [`persist`] | JSON snapshot store |
//! | [`capability`] | Host traits: file picker, clipboard, image decoding |
//! | [`consts`] | Shared numeric constants (zoom limits, paddings, sizes) |

pub mod camera;
pub mod capability;
pub mod chat;
pub mod consts;
pub mod engine;
pub mod hit;
pub mod input;
pub mod persist;
pub mod render;
pub mod scene;
pub mod selection;
pub mod world;
