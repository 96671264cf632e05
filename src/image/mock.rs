use super::ImageService;
use crate::models::ImagePayload;
use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Pass-through normalizer: wraps input bytes unchanged and counts calls.
#[derive(Clone)]
pub struct MockImageNormalizer {
    normalize_count: Arc<Mutex<usize>>,
    mime_type: String,
    should_fail: Arc<Mutex<bool>>,
}

impl MockImageNormalizer {
    pub fn new() -> Self {
        Self {
            normalize_count: Arc::new(Mutex::new(0)),
            mime_type: "image/jpeg".to_string(),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_mime_type(mut self, mime_type: String) -> Self {
        self.mime_type = mime_type;
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_normalize_count(&self) -> usize {
        *self.normalize_count.lock().unwrap()
    }
}

impl Default for MockImageNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageService for MockImageNormalizer {
    async fn normalize(&self, image_data: &[u8]) -> Result<ImagePayload> {
        *self.normalize_count.lock().unwrap() += 1;

        if *self.should_fail.lock().unwrap() {
            return Err(crate::Error::Decode(image::ImageError::IoError(
                std::io::Error::other("Mock failure"),
            )));
        }

        Ok(ImagePayload::new(image_data.to_vec(), self.mime_type.clone()))
    }
}
