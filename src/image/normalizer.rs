use super::ImageService;
use crate::models::{
    estimate_base64_size_kb, ImagePayload, DEFAULT_MAX_DIMENSION, DEFAULT_MAX_SIZE_KB,
};
use crate::{Error, Result};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};

pub const OUTPUT_MIME: &str = "image/jpeg";

/// Longest side used once the first upload pass is still over the ceiling.
pub const UPLOAD_RETRY_DIMENSION: u32 = 800;

/// Resize and recompression bounds for one normalization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub max_dimension: u32,
    pub max_size_kb: usize,
    pub initial_quality: u8,
    pub quality_step: u8,
    pub quality_floor: u8,
}

impl NormalizeOptions {
    /// High-fidelity path used before every model call.
    pub fn server() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_size_kb: DEFAULT_MAX_SIZE_KB,
            initial_quality: 85,
            quality_step: 5,
            quality_floor: 20,
        }
    }

    /// Fast path for upload-time compression.
    pub fn client() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_size_kb: DEFAULT_MAX_SIZE_KB,
            initial_quality: 80,
            quality_step: 10,
            quality_floor: 30,
        }
    }

    pub fn with_bounds(mut self, max_dimension: u32, max_size_kb: usize) -> Self {
        self.max_dimension = max_dimension;
        self.max_size_kb = max_size_kb;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 || self.quality_step == 0 {
            return Err(Error::InvalidInput(
                "max_dimension and quality_step must be positive".to_string(),
            ));
        }
        if self.quality_floor == 0 || self.quality_floor > self.initial_quality {
            return Err(Error::InvalidInput(format!(
                "quality floor {} must be within 1..={}",
                self.quality_floor, self.initial_quality
            )));
        }
        Ok(())
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::server()
    }
}

/// Normalization result with the encoder settings that produced it.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub payload: ImagePayload,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

/// Target dimensions with the longer side clamped to `max_dimension`; never upscales.
fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let scale = |side: u32, long: u32| {
        ((side as f64 * max_dimension as f64) / long as f64)
            .round()
            .max(1.0) as u32
    };
    if width >= height {
        (max_dimension, scale(height, width))
    } else {
        (scale(width, height), max_dimension)
    }
}

/// Downscale (never up) so the longer side fits `max_dimension`, flattened to RGB.
fn bounded_rgb(image: &DynamicImage, max_dimension: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let (target_w, target_h) = target_dimensions(width, height, max_dimension);

    if (target_w, target_h) == (width, height) {
        // JPEG has no alpha channel.
        return image.to_rgb8();
    }
    tracing::debug!(
        "Resizing image from {}x{} to {}x{}",
        width,
        height,
        target_w,
        target_h
    );
    image
        .resize_exact(target_w, target_h, FilterType::Lanczos3)
        .to_rgb8()
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(image)?;
    Ok(bytes)
}

/// Decode, downscale, and re-encode until the size ceiling or quality floor is hit.
///
/// When the floor is reached without meeting the ceiling, the smallest
/// encoding produced is returned rather than an error.
pub fn normalize_detailed(image_data: &[u8], options: &NormalizeOptions) -> Result<Normalized> {
    options.validate()?;

    let image = image::load_from_memory(image_data)?;
    let rgb = bounded_rgb(&image, options.max_dimension);

    let ceiling = options.max_size_kb * 1024;
    let mut quality = options.initial_quality;
    let mut best: Option<(Vec<u8>, u8)> = None;

    loop {
        let encoded = encode_jpeg(&rgb, quality)?;
        let size = encoded.len();
        tracing::debug!("Encoded at quality {}: {} bytes", quality, size);

        if best
            .as_ref()
            .map_or(true, |(smallest, _)| size < smallest.len())
        {
            best = Some((encoded, quality));
        }
        if size <= ceiling {
            break;
        }
        if quality <= options.quality_floor {
            tracing::warn!(
                "Image still {} KB at quality floor {}, keeping smallest encoding",
                size / 1024,
                options.quality_floor
            );
            break;
        }
        quality = quality
            .saturating_sub(options.quality_step)
            .max(options.quality_floor);
    }

    let (bytes, quality) =
        best.ok_or_else(|| Error::Invariant("No encoding produced".to_string()))?;

    Ok(Normalized {
        payload: ImagePayload::new(bytes, OUTPUT_MIME),
        width: rgb.width(),
        height: rgb.height(),
        quality,
    })
}

pub fn normalize(image_data: &[u8], options: &NormalizeOptions) -> Result<ImagePayload> {
    normalize_detailed(image_data, options).map(|n| n.payload)
}

fn join_error(e: tokio::task::JoinError) -> Error {
    Error::Normalize(format!("normalize task did not complete: {}", e))
}

/// Upload-time compression, run once per file before a request is built.
///
/// One pass at the preset's starting quality and bound; while the base64
/// estimate is still over `max_size_kb`, re-encode from the original at
/// [`UPLOAD_RETRY_DIMENSION`] with quality stepping down, stopping above the
/// floor. The last encoding is kept even if it never fit.
pub fn compress_for_upload(
    image_data: &[u8],
    options: &NormalizeOptions,
) -> Result<ImagePayload> {
    options.validate()?;

    let image = image::load_from_memory(image_data)?;
    let ceiling_kb = options.max_size_kb as f64;
    let retry_dimension = options.max_dimension.min(UPLOAD_RETRY_DIMENSION);

    let mut payload = ImagePayload::new(
        encode_jpeg(
            &bounded_rgb(&image, options.max_dimension),
            options.initial_quality,
        )?,
        OUTPUT_MIME,
    );
    let mut quality = options.initial_quality.saturating_sub(options.quality_step);

    while estimate_base64_size_kb(&payload.to_base64()) > ceiling_kb
        && quality > options.quality_floor
    {
        payload.bytes = encode_jpeg(&bounded_rgb(&image, retry_dimension), quality)?;
        quality = quality.saturating_sub(options.quality_step);
    }

    tracing::info!(
        "Upload compressed to {:.2} KB",
        estimate_base64_size_kb(&payload.to_base64())
    );
    Ok(payload)
}

/// [`compress_for_upload`] on the blocking pool.
pub async fn compress_upload(
    image_data: Vec<u8>,
    options: NormalizeOptions,
) -> Result<ImagePayload> {
    tokio::task::spawn_blocking(move || compress_for_upload(&image_data, &options))
        .await
        .map_err(join_error)?
}

/// Runs [`normalize`] on the blocking pool so encode work stays off the async executor.
pub struct ImageNormalizer {
    options: NormalizeOptions,
}

impl ImageNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::server())
    }
}

#[async_trait]
impl ImageService for ImageNormalizer {
    async fn normalize(&self, image_data: &[u8]) -> Result<ImagePayload> {
        let options = self.options;
        let data = image_data.to_vec();

        let normalized =
            tokio::task::spawn_blocking(move || normalize_detailed(&data, &options))
                .await
                .map_err(join_error)??;

        tracing::info!(
            "Normalized image to {}x{} at quality {} ({:.1} KB)",
            normalized.width,
            normalized.height,
            normalized.quality,
            normalized.payload.size_kb()
        );
        Ok(normalized.payload)
    }
}
