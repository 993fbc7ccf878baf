//! Grader configuration from environment variables.
//!
//! All tunables live here with their defaults; `GEMINI_API_KEY` is the
//! only required key. Values are read once at startup and shared
//! read-only through `ApiContext`.

use std::env;

pub const APP_NAME: &str = "inkgrade";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest dimension (pixels) a normalized worksheet image may have.
/// Bounds the vision model's input budget without losing handwriting
/// legibility at worksheet scale.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// JPEG quality for the normalized image. High but not maximum —
/// handwriting survives 80 at a fraction of the payload size.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Sampling temperature for grading calls. Low: verdicts should be
/// reproducible, not creative.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BIND: &str = "127.0.0.1:8787";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default `RUST_LOG`-style filter when none is set in the environment.
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info,tower_http=info")
}

/// Runtime configuration for the grading service.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// API key for the inference boundary.
    pub api_key: String,
    /// Base URL of the inference service (overridable for tests/proxies).
    pub base_url: String,
    /// Model identifier, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// Max dimension for normalized images.
    pub max_dimension: u32,
    /// JPEG re-encode quality (1-100).
    pub jpeg_quality: u8,
    /// Sampling temperature for the grading call.
    pub temperature: f32,
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// HTTP client timeout for inference calls, in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingKey(&'static str),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl GraderConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingKey("GEMINI_API_KEY"))?;

        Ok(Self {
            api_key,
            base_url: env_or("GEMINI_BASE_URL", DEFAULT_BASE_URL),
            model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
            max_dimension: parse_env("INKGRADE_MAX_DIMENSION", DEFAULT_MAX_DIMENSION)?,
            jpeg_quality: parse_env("INKGRADE_JPEG_QUALITY", DEFAULT_JPEG_QUALITY)?,
            temperature: DEFAULT_TEMPERATURE,
            bind_addr: env_or("INKGRADE_BIND", DEFAULT_BIND),
            timeout_secs: parse_env("INKGRADE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Configuration for tests — no environment reads, no real key.
    pub fn for_tests() -> Self {
        Self {
            api_key: "test-key".into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            temperature: DEFAULT_TEMPERATURE,
            bind_addr: DEFAULT_BIND.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
