//! Application configuration parsed from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::Level;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:55557/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gemini-3-flash";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SNAPSHOT_PATH: &str = "canvas_snapshot.json";
pub const DEFAULT_IMAGE_CACHE_DIR: &str = "inkchat_images";
pub const DEFAULT_SELECTION_SYSTEM_PROMPT: &str = "You are an image editing agent for canvas workflows. \
When user provides an annotated reference image, you must generate a NEW edited result image based on the instruction and visual cues. \
Do not keep the input unchanged. Do not only describe. Output a generated image result.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeouts: Timeouts,
    pub snapshot_path: PathBuf,
    /// Where generated images are downloaded to.
    pub image_cache_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub log_level: Level,
    pub selection_system_prompt: String,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// All optional:
    /// - `INKCHAT_API_URL`: chat-completions endpoint
    /// - `INKCHAT_MODEL`: model name sent with every request
    /// - `INKCHAT_API_KEY`: bearer token, omitted when unset or empty
    /// - `INKCHAT_REQUEST_TIMEOUT_SECS`: default 300
    /// - `INKCHAT_CONNECT_TIMEOUT_SECS`: default 10
    /// - `INKCHAT_SNAPSHOT_PATH`: default `canvas_snapshot.json`
    /// - `INKCHAT_IMAGE_CACHE_DIR`: default `inkchat_images`
    /// - `INKCHAT_LOG_FILE`: append log output here instead of stderr
    /// - `INKCHAT_LOG_LEVEL`: default `info`
    /// - `INKCHAT_SELECTION_SYSTEM_PROMPT`
    ///
    /// # Errors
    ///
    /// Returns an error when a numeric or level variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: env_string("INKCHAT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            model: env_string("INKCHAT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            api_key: env_string("INKCHAT_API_KEY"),
            timeouts: Timeouts {
                request_secs: env_parse("INKCHAT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
                connect_secs: env_parse("INKCHAT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
            },
            snapshot_path: env_string("INKCHAT_SNAPSHOT_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH), PathBuf::from),
            image_cache_dir: env_string("INKCHAT_IMAGE_CACHE_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_IMAGE_CACHE_DIR), PathBuf::from),
            log_file: env_string("INKCHAT_LOG_FILE").map(PathBuf::from),
            log_level: env_parse("INKCHAT_LOG_LEVEL", Level::INFO)?,
            selection_system_prompt: env_string("INKCHAT_SELECTION_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SELECTION_SYSTEM_PROMPT.to_owned()),
        })
    }
}

/// Non-empty, trimmed value of `var`.
fn env_string(var: &str) -> Option<String> {
    let Ok(value) = std::env::var(var) else {
        return None;
    };
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_owned()) }
}

fn env_parse<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env_string(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
