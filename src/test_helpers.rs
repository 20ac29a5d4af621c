//! Shared fixtures for the unit tests.
//!
//! Synthetic images are encoded with the `image` crate so tests never depend
//! on binary fixtures checked into the repo.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let config = test_config(tmp.path());
//! create_test_jpeg(&config.library.uploads_dir.join("photo.jpg"), 1000, 500);
//! ```

use crate::config::MediaConfig;
use image::{ImageEncoder, RgbImage};
use std::path::Path;

// =========================================================================
// Configuration
// =========================================================================

/// Stock config with every directory rooted under `root`.
pub fn test_config(root: &Path) -> MediaConfig {
    MediaConfig::default().rebase(root)
}

// =========================================================================
// Image files
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    ensure_parent(path);
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a small valid PNG file with the given dimensions.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    ensure_parent(path);
    gradient(width, height).save(path).unwrap();
}

/// Write an SVG document declaring `width`/`height` on its root.
pub fn write_svg(path: &Path, width: u32, height: u32) {
    ensure_parent(path);
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><rect width="{width}" height="{height}"/></svg>"#
    );
    std::fs::write(path, svg).unwrap();
}
