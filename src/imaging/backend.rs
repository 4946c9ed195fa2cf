//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations export needs:
//! identify and render. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::RenderParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
pub trait ImageBackend {
    /// Get image dimensions from encoded bytes.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode, scale to exact dimensions and encode as JPEG.
    fn render(&self, params: &RenderParams<'_>) -> Result<Vec<u8>, BackendError>;
}
