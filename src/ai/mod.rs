//! Remote generation capability
//!
//! The model is treated as a black box: it receives a prompt and zero or
//! more images and answers with an ordered list of candidates. Provider
//! responses are converted into [`ModelResponse`] right at this boundary.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::GeminiClient;
pub use mock::MockGenerationClient;

use crate::models::{ImagePayload, ModelResponse};
use crate::Result;
use async_trait::async_trait;

/// Where the prompt text sits relative to the attached images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOrder {
    PromptFirst,
    ImagesFirst,
}

/// One fully-formed call to the remote model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub prompt: String,
    pub images: Vec<ImagePayload>,
    pub order: PartOrder,
}

impl ModelRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
            order: PartOrder::PromptFirst,
        }
    }

    pub fn with_images(
        prompt: impl Into<String>,
        images: Vec<ImagePayload>,
        order: PartOrder,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            images,
            order,
        }
    }
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse>;
}
