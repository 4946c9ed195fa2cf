//! Shared test utilities: synthetic images and recording collaborators.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let portrait = jpeg_image(60, 80);
//! let generator = MockGenerator::returning(png_image(60, 80));
//! ```

use crate::credentials::Credentials;
use crate::generation::{GenerationError, ImageGenerator};
use crate::types::{ColorChoice, EncodedImage};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::cell::{Cell, RefCell};
use std::io::Cursor;
use std::path::Path;

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A gradient JPEG wrapped as an upload.
pub fn jpeg_image(width: u32, height: u32) -> EncodedImage {
    EncodedImage::new("image/jpeg", encode(&gradient(width, height), ImageFormat::Jpeg))
}

/// A gradient PNG, the shape the generation API usually answers with.
pub fn png_image(width: u32, height: u32) -> EncodedImage {
    EncodedImage::new("image/png", encode(&gradient(width, height), ImageFormat::Png))
}

/// Write a gradient JPEG to disk.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, jpeg_image(width, height).bytes()).unwrap();
}

// =========================================================================
// Recording generator
// =========================================================================

/// Generator that answers from a script and counts calls.
///
/// Single-threaded by construction (`Cell`/`RefCell`), like the runtime it
/// is used on.
pub struct MockGenerator {
    response: RefCell<Option<Result<EncodedImage, GenerationError>>>,
    pub calls: Cell<usize>,
    pub last_color: Cell<Option<ColorChoice>>,
}

impl MockGenerator {
    pub fn returning(image: EncodedImage) -> Self {
        Self {
            response: RefCell::new(Some(Ok(image))),
            calls: Cell::new(0),
            last_color: Cell::new(None),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            response: RefCell::new(Some(Err(error))),
            calls: Cell::new(0),
            last_color: Cell::new(None),
        }
    }
}

impl ImageGenerator for MockGenerator {
    async fn generate(
        &self,
        image: &EncodedImage,
        color: ColorChoice,
        credentials: &Credentials,
    ) -> Result<EncodedImage, GenerationError> {
        credentials.resolve()?;
        assert!(!image.is_empty(), "generator received an empty image");
        self.calls.set(self.calls.get() + 1);
        self.last_color.set(Some(color));
        self.response
            .borrow_mut()
            .take()
            .unwrap_or(Err(GenerationError::NoImageInResponse))
    }
}
