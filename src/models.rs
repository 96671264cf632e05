//! Data models and structures
//!
//! Defines the request-scoped values that flow through the generation
//! pipeline, the outcome contract handed back to callers, and the
//! environment-driven configuration.

use crate::echo::EchoComparison;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;
pub const DEFAULT_MAX_SIZE_KB: usize = 800;

/// Encoded image bytes plus their mime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn to_base64(&self) -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }

    /// File extension matching the mime type, used when saving results.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// Estimated decoded size in KB of a base64 string.
pub fn estimate_base64_size_kb(base64: &str) -> f64 {
    (base64.len() as f64 * 3.0) / 4.0 / 1024.0
}

mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    TextToImage,
    Edit,
    Combine,
}

impl OperationKind {
    /// Number of input images the operation requires.
    pub fn expected_images(self) -> usize {
        match self {
            OperationKind::TextToImage => 0,
            OperationKind::Edit => 1,
            OperationKind::Combine => 2,
        }
    }
}

/// One user action. Images are raw uploads; normalization happens in the facade.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: OperationKind,
    pub prompt: String,
    pub images: Vec<Vec<u8>>,
}

impl GenerationRequest {
    pub fn text_to_image(prompt: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::TextToImage,
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    pub fn edit(image: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Edit,
            prompt: prompt.into(),
            images: vec![image],
        }
    }

    pub fn combine(image_a: Vec<u8>, image_b: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Combine,
            prompt: prompt.into(),
            images: vec![image_a, image_b],
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_inputs(self.kind, &self.prompt, self.images.len())
    }
}

/// Rejects blank prompts and image counts the operation cannot take.
pub fn validate_inputs(kind: OperationKind, prompt: &str, image_count: usize) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(Error::InvalidInput("prompt must not be empty".to_string()));
    }
    let expected = kind.expected_images();
    if image_count != expected {
        return Err(Error::InvalidInput(format!(
            "{:?} requires {} image(s), got {}",
            kind, expected, image_count
        )));
    }
    Ok(())
}

/// One discrete output unit from a single remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Image(ImagePayload),
    Text(String),
    Empty,
}

/// Ordered candidates returned by one remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub candidates: Vec<Candidate>,
}

impl ModelResponse {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn image(payload: ImagePayload) -> Self {
        Self::new(vec![Candidate::Image(payload)])
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Candidate::Text(text.into())])
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    DecodeError,
    InvalidInput,
    RemoteError,
    NoContent,
    Timeout,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DecodeError => "DECODE_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::RemoteError => "REMOTE_ERROR",
            ErrorCode::NoContent => "NO_CONTENT",
            ErrorCode::Timeout => "TIMEOUT",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only value the facade hands back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Success {
        image: ImagePayload,
    },
    Description {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Failure {
        code: ErrorCode,
        message: String,
    },
}

impl GenerationOutcome {
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }
}

impl From<Error> for GenerationOutcome {
    fn from(err: Error) -> Self {
        Self::failure(err.code(), err.to_string())
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub app_password: String,
    pub gemini_model: String,
    pub request_timeout: Duration,
    pub max_image_dimension: u32,
    pub max_image_size_kb: usize,
    pub echo_comparison: EchoComparison,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; missing required keys fail fast.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{} not set", key)))
        };

        Ok(Self {
            gemini_api_key: required("GEMINI_API_KEY")?,
            app_password: required("APP_PASSWORD")?,
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout: Duration::from_secs(parse_positive_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            max_image_dimension: parse_positive_or(
                &lookup,
                "MAX_IMAGE_DIMENSION",
                DEFAULT_MAX_DIMENSION,
            )?,
            max_image_size_kb: parse_positive_or(
                &lookup,
                "MAX_IMAGE_SIZE_KB",
                DEFAULT_MAX_SIZE_KB,
            )?,
            echo_comparison: match lookup("ECHO_COMPARISON") {
                Some(value) => value.parse()?,
                None => EchoComparison::default(),
            },
        })
    }
}

/// Like [`parse_or`], but a zero bound is a startup error rather than a per-request failure.
fn parse_positive_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Default + PartialEq,
{
    let value = parse_or(lookup, key, default)?;
    if value == T::default() {
        return Err(Error::Config(format!("{} must be greater than zero", key)));
    }
    Ok(value)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}
