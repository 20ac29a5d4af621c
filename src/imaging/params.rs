//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`variants`](crate::variants) store (which decides
//! which files must exist) and the [`backend`](super::backend) (which does the
//! actual pixel work). Keeping them separate lets tests swap in a mock backend
//! without touching the variant logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`ResizeParams`]: Full specification for a variant: source, output path,
//!   target dimensions, crop flag, quality.

use std::path::PathBuf;

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

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for producing one variant file.
///
/// With `crop = false` the source is scaled to exactly `width × height`; the
/// caller has already preserved the aspect ratio. With `crop = true` the
/// source is fill-resized and centre-cropped to those dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub crop: bool,
    pub quality: Quality,
}
