//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **SVG size** | `roxmltree` root `width`/`height`/`viewBox` |
//! | **Resize** | Lanczos3, exact target dimensions |
//! | **Crop** | `resize_to_fill` (centre crop) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **SVG**: intrinsic size of vector documents

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;
mod svg;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{matches_ratio, scale_to_height, scale_to_width};
pub use params::{Quality, ResizeParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
pub use svg::svg_dimensions;

use std::path::Path;

/// Whether a file is a vector image, judged by extension.
pub fn is_vector(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

/// MIME type for an image path, judged by extension.
pub fn mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        _ => return None,
    })
}
