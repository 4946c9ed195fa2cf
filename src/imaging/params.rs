//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [export renderer](crate::export) (which decides the
//! target size and quality) and the [`backend`](super::backend) (which does
//! the pixel work), so a mock backend can stand in during tests.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// 90 unless configured otherwise.
impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for a scale-to-exact-size render.
///
/// The source is stretched to `width × height` without cropping; the aspect
/// ratio is not preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams<'a> {
    pub source: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}
