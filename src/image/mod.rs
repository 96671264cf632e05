//! Image normalization before submission
//!
//! Bounds pixel dimensions and encoded size of uploaded images so every
//! payload sent to the remote model stays under a fixed ceiling.

pub mod mock;
pub mod normalizer;

pub use mock::MockImageNormalizer;
pub use normalizer::{
    compress_for_upload, compress_upload, normalize, ImageNormalizer, NormalizeOptions, Normalized,
};

use crate::models::ImagePayload;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn normalize(&self, image_data: &[u8]) -> Result<ImagePayload>;
}
