//! Services that sit between the canvas session and external systems.

pub mod chat;
pub mod images;
