//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use crate::models::ErrorCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image normalization failed: {0}")]
    Normalize(String),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No usable content: {0}")]
    NoContent(String),

    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Stable code surfaced to callers through `GenerationOutcome::Failure`.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Decode(_) | Error::Normalize(_) => ErrorCode::DecodeError,
            Error::InvalidInput(_) => ErrorCode::InvalidInput,
            Error::NoContent(_) => ErrorCode::NoContent,
            Error::Timeout(_) => ErrorCode::Timeout,
            Error::Http(e) if e.is_timeout() => ErrorCode::Timeout,
            Error::Http(_)
            | Error::AiProvider(_)
            | Error::MissingCredential(_)
            | Error::Serialization(_) => ErrorCode::RemoteError,
            // No local stage of a request raises these; they come from startup or the CLI edge.
            Error::Io(_) | Error::Config(_) | Error::EnvVar(_) | Error::Invariant(_) => {
                ErrorCode::RemoteError
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
