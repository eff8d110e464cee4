//! Remote image cache for generated replies.
//!
//! Assistant replies reference images by `http(s)` URL. The bridge downloads
//! each one into a cache directory before the reply is finished, and this
//! type doubles as the session's [`ImageProvider`]: remote sources resolve to
//! their cache file, so generated images keep their natural aspect ratio and
//! show up in selection renders. Local paths pass straight through.
//!
//! Cache files are named by the UUID v5 of the URL, so a later run finds the
//! file for a restored image without any index.

use std::path::{Path, PathBuf};
use std::time::Duration;

use canvas::capability::{CapabilityError, FsImageProvider, ImageProvider};
use image::RgbaImage;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Timeouts;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    #[error("not a remote image: {0}")]
    NotRemote(String),
    #[error("download of {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("download of {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[must_use]
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[derive(Debug, Clone)]
pub struct RemoteImages {
    dir: PathBuf,
    http: reqwest::Client,
}

impl RemoteImages {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(dir: impl Into<PathBuf>, timeouts: Timeouts) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| FetchError::HttpClientBuild(e.to_string()))?;
        Ok(Self { dir: dir.into(), http })
    }

    /// Cache file for `url`. Stable across runs.
    #[must_use]
    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.dir.join(Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).to_string())
    }

    /// Download `url` into the cache unless it is already there.
    ///
    /// # Errors
    ///
    /// Returns an error for non-remote sources, failed requests, non-success
    /// statuses, and cache write failures. Nothing is cached on error.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf, FetchError> {
        if !is_remote(url) {
            return Err(FetchError::NotRemote(url.to_owned()));
        }
        let path = self.cache_path(url);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(url, path = %path.display(), "generated image already cached");
            return Ok(path);
        }

        let request_failed = |e: reqwest::Error| FetchError::Request { url: url.to_owned(), message: e.to_string() };
        let response = self.http.get(url).send().await.map_err(request_failed)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_owned(), status: status.as_u16() });
        }
        let bytes = response.bytes().await.map_err(request_failed)?;

        write_atomically(&self.dir, &path, &bytes).await?;
        info!(url, path = %path.display(), bytes = bytes.len(), "generated image cached");
        Ok(path)
    }

    fn resolve(&self, source: &str) -> String {
        if is_remote(source) { self.cache_path(source).to_string_lossy().into_owned() } else { source.to_owned() }
    }
}

async fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;
    let tmp = path.with_extension("part");
    tokio::fs::write(&tmp, bytes).await.map_err(io_error(&tmp))?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error(path))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> FetchError {
    let path = path.to_path_buf();
    move |source| FetchError::Io { path, source }
}

impl ImageProvider for RemoteImages {
    fn dimensions(&self, source: &str) -> Option<(u32, u32)> {
        FsImageProvider.dimensions(&self.resolve(source))
    }

    fn load(&self, source: &str) -> Result<RgbaImage, CapabilityError> {
        FsImageProvider.load(&self.resolve(source)).map_err(|e| match e {
            CapabilityError::ImageLoad { message, .. } => {
                CapabilityError::ImageLoad { source_ref: source.to_owned(), message }
            }
            other => other,
        })
    }
}

#[cfg(test)]
#[path = "images_test.rs"]
mod tests;
