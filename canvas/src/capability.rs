//! Host capabilities the engine calls into but never implements itself.
//!
//! File dialogs, the clipboard, and image decoding are platform concerns.
//! The session takes them as trait objects so tests can substitute
//! in-memory versions.

#[cfg(test)]
#[path = "capability_test.rs"]
mod capability_test;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbaImage};

/// Failures reported by a host capability.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
    #[error("cannot load image {source_ref}: {message}")]
    ImageLoad { source_ref: String, message: String },
    #[error("I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Open/save dialogs. `None` means the user cancelled.
pub trait FilePicker {
    fn pick_image(&self) -> Option<PathBuf>;
    fn pick_save_path(&self, suggested_name: &str) -> Option<PathBuf>;
}

/// Receives rendered PNG bytes for the system clipboard.
pub trait ClipboardSink {
    fn put_png(&self, png: &[u8]) -> Result<(), CapabilityError>;
}

/// Resolves an image source reference (path or URL) to pixels.
pub trait ImageProvider {
    /// Natural pixel size, if known without a full decode.
    fn dimensions(&self, source: &str) -> Option<(u32, u32)>;
    fn load(&self, source: &str) -> Result<RgbaImage, CapabilityError>;
}

/// Decodes images from the local filesystem. Remote URLs are not fetched.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageProvider;

impl FsImageProvider {
    fn local_path(source: &str) -> Option<&Path> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return None;
        }
        Some(Path::new(source.strip_prefix("file://").unwrap_or(source)))
    }
}

impl ImageProvider for FsImageProvider {
    fn dimensions(&self, source: &str) -> Option<(u32, u32)> {
        let path = Self::local_path(source)?;
        match open_guessed(path).and_then(|reader| reader.into_dimensions().map_err(|e| e.to_string())) {
            Ok(dims) => Some(dims),
            Err(message) => {
                tracing::debug!(source, error = %message, "image dimensions unavailable");
                None
            }
        }
    }

    fn load(&self, source: &str) -> Result<RgbaImage, CapabilityError> {
        let path = Self::local_path(source).ok_or_else(|| CapabilityError::ImageLoad {
            source_ref: source.to_owned(),
            message: "remote images are not fetched".into(),
        })?;
        let img = open_guessed(path)
            .and_then(|reader| reader.decode().map_err(|e| e.to_string()))
            .map_err(|message| CapabilityError::ImageLoad { source_ref: source.to_owned(), message })?;
        Ok(img.to_rgba8())
    }
}

/// Open `path` and sniff its format from the content, so extensionless
/// cache files decode too.
fn open_guessed(path: &Path) -> Result<ImageReader<BufReader<File>>, String> {
    ImageReader::open(path).and_then(ImageReader::with_guessed_format).map_err(|e| e.to_string())
}
