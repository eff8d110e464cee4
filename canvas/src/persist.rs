//! Persistence store: JSON snapshot of the chat transcript and placed images.
//!
//! DESIGN
//! ======
//! A snapshot is rebuilt from the live session on every save and replaces
//! the file wholesale. Writes go to a sibling temp file that is renamed over
//! the target so a crash mid-write never leaves a truncated snapshot behind.
//! Strokes are not persisted.
//!
//! `try_save` / `try_load` surface typed errors; `save` / `load` are the
//! interaction-facing wrappers that log and degrade instead.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::MAX_WORLD_COORD;

/// Errors from reading or writing a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("snapshot I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk snapshot layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSnapshot {
    pub chat_history: Vec<PersistedChatEntry>,
    pub canvas_images: Vec<PersistedImage>,
}

impl PersistedSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chat_history.is_empty() && self.canvas_images.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedChatEntry {
    /// `"User"`, `"Assistant"` or `"System"`.
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedImage {
    pub path: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    #[serde(default = "unit_scale")]
    pub scale_x: f64,
    #[serde(default = "unit_scale")]
    pub scale_y: f64,
    #[serde(default)]
    pub rotation: f64,
}

fn unit_scale() -> f64 {
    1.0
}

impl PersistedImage {
    /// Whether position and width are finite and within [`MAX_WORLD_COORD`].
    #[must_use]
    pub fn has_sane_geometry(&self) -> bool {
        [self.left, self.top, self.width].iter().all(|v| v.is_finite() && v.abs() <= MAX_WORLD_COORD)
    }
}

/// Snapshot file location plus save/load.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Serialize and atomically replace the snapshot file.
    pub fn try_save(&self, snapshot: &PersistedSnapshot) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PersistError::Io { path: parent.to_path_buf(), source })?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|source| PersistError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, &self.path).map_err(|source| PersistError::Io { path: self.path.clone(), source })?;
        Ok(())
    }

    /// Save, logging instead of failing. Returns whether the file was written.
    pub fn save(&self, snapshot: &PersistedSnapshot) -> bool {
        match self.try_save(snapshot) {
            Ok(()) => {
                debug!(
                    path = %self.path.display(),
                    messages = snapshot.chat_history.len(),
                    images = snapshot.canvas_images.len(),
                    "snapshot saved"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "snapshot save failed");
                false
            }
        }
    }

    /// Read the snapshot. A missing file is an empty snapshot, not an error.
    pub fn try_load(&self) -> Result<PersistedSnapshot, PersistError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PersistedSnapshot::default()),
            Err(source) => return Err(PersistError::Io { path: self.path.clone(), source }),
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// Load, falling back to an empty snapshot on any failure.
    #[must_use]
    pub fn load(&self) -> PersistedSnapshot {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "snapshot load failed; starting empty");
                PersistedSnapshot::default()
            }
        }
    }
}
