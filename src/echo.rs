//! Echo detection
//!
//! A model that cannot perform a multi-image edit sometimes hands one of
//! the inputs straight back. Such a result is a non-answer and must never
//! be surfaced as a generated image.

use crate::models::ImagePayload;
use crate::Error;
use std::str::FromStr;

/// How a returned image is compared against the submitted inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoComparison {
    /// Exact equality of encoded bytes.
    Bytes,
    /// Encoded bytes, or failing that identical decoded RGBA pixels.
    #[default]
    Pixels,
}

impl FromStr for EchoComparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bytes" => Ok(EchoComparison::Bytes),
            "pixels" => Ok(EchoComparison::Pixels),
            other => Err(Error::Config(format!(
                "ECHO_COMPARISON must be 'bytes' or 'pixels', got '{}'",
                other
            ))),
        }
    }
}

pub fn is_echo(candidate: &[u8], inputs: &[ImagePayload], comparison: EchoComparison) -> bool {
    if inputs.iter().any(|input| input.bytes == candidate) {
        return true;
    }
    match comparison {
        EchoComparison::Bytes => false,
        EchoComparison::Pixels => pixels_match_any(candidate, inputs),
    }
}

fn pixels_match_any(candidate: &[u8], inputs: &[ImagePayload]) -> bool {
    // Undecodable output cannot be shown as an image anyway; not an echo.
    let Ok(decoded) = image::load_from_memory(candidate) else {
        return false;
    };
    let candidate = decoded.to_rgba8();

    inputs.iter().any(|input| {
        image::load_from_memory(&input.bytes)
            .map(|img| {
                let input = img.to_rgba8();
                input.dimensions() == candidate.dimensions() && input.as_raw() == candidate.as_raw()
            })
            .unwrap_or(false)
    })
}
