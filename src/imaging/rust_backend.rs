//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` (format sniffed from magic bytes) |
//! | Identify | `image::ImageReader::into_dimensions` |
//! | Scale | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::RenderParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully decoded pixel surface.
///
/// Only [`decode`] produces one, so drawing always happens after decoding.
struct Surface(DynamicImage);

fn decode(source: &[u8]) -> Result<Surface, BackendError> {
    image::load_from_memory(source)
        .map(Surface)
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Stretch the surface onto a `width × height` canvas.
fn draw_scaled(surface: Surface, width: u32, height: u32) -> DynamicImage {
    surface.0.resize_exact(width, height, FilterType::Lanczos3)
}

/// Encode as baseline JPEG. Alpha is dropped, JPEG has none.
fn encode_jpeg(img: &DynamicImage, quality: u32) -> Result<Vec<u8>, BackendError> {
    let mut bytes = Vec::new();
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100) as u8);
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(bytes)
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn render(&self, params: &RenderParams<'_>) -> Result<Vec<u8>, BackendError> {
        let surface = decode(params.source)?;
        let canvas = draw_scaled(surface, params.width, params.height);
        encode_jpeg(&canvas, params.quality.value())
    }
}
