//! End-to-end rendering through the public API with real image files.
//!
//! Everything runs against a temp directory laid out like a site:
//!
//! ```text
//! respimg.toml
//! uploads/2024/photo.jpg       attachment #1, 1000x500
//! theme/images/logo.svg        120x40
//! ```

use image::{ImageEncoder, RgbImage};
use respimg::imaging::{BackendError, ResizeParams};
use respimg::{
    Breakpoint, Dimensions, DiskVariantStore, FsLibrary, FsMedia, ImageBackend, ImageKind, Media,
    MediaConfig, RustBackend, SizeKey, SizeSpec, load_config,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Real backend that counts resizes.
#[derive(Default)]
struct CountingBackend {
    inner: RustBackend,
    resizes: AtomicUsize,
}

impl ImageBackend for CountingBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        self.inner.identify(path)
    }

    fn resize(&self, params: &ResizeParams) -> Result<Dimensions, BackendError> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        self.inner.resize(params)
    }
}

fn create_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    image::codecs::jpeg::JpegEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Lay out a site and return its config, loaded the way the CLI loads it.
fn site(tmp: &TempDir, config_toml: &str) -> MediaConfig {
    let root = tmp.path();
    std::fs::write(root.join("respimg.toml"), config_toml).unwrap();
    create_jpeg(&root.join("uploads/2024/photo.jpg"), 1000, 500);
    std::fs::create_dir_all(root.join("theme/images")).unwrap();
    std::fs::write(
        root.join("theme/images/logo.svg"),
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 120 40"><circle cx="20" cy="20" r="10"/></svg>"#,
    )
    .unwrap();

    let config = load_config(&root.join("respimg.toml")).unwrap();
    let library = FsLibrary::open(&config).unwrap();
    library.scan(&RustBackend).unwrap();
    config
}

fn counting_media(
    config: MediaConfig,
) -> Media<FsLibrary, DiskVariantStore<CountingBackend>, RustBackend> {
    let library = FsLibrary::open(&config).unwrap();
    let store = DiskVariantStore::from_config(CountingBackend::default(), &config);
    Media::new(config, library, store, RustBackend)
}

fn variant_path(tmp: &TempDir, name: &str) -> PathBuf {
    tmp.path().join("uploads/2024").join(name)
}

#[test]
fn dimensions_are_probed_before_sizing() {
    let tmp = TempDir::new().unwrap();
    let media = FsMedia::open(site(&tmp, "")).unwrap();

    let photo = media.image(1u64).unwrap();
    assert_eq!((photo.width(), photo.height()), (Some(1000), Some(500)));
    assert_eq!(photo.kind(), Some(ImageKind::Raster));

    let logo = media.image("logo.svg").unwrap();
    assert_eq!((logo.width(), logo.height()), (Some(120), Some(40)));
    assert_eq!(logo.kind(), Some(ImageKind::Vector));
}

#[test]
fn width_variant_is_written_once_and_reused() {
    let tmp = TempDir::new().unwrap();
    let media = counting_media(site(&tmp, ""));

    let mut image = media.image(1u64).unwrap();
    image.size(SizeSpec::Width(400)).unwrap();
    assert_eq!((image.width(), image.height()), (Some(400), Some(200)));
    assert_eq!(image.url(), "/uploads/2024/photo-resized-400x200.jpg");

    let written = variant_path(&tmp, "photo-resized-400x200.jpg");
    assert_eq!(image::image_dimensions(&written).unwrap(), (400, 200));

    let mut again = media.image(1u64).unwrap();
    again.size(SizeSpec::Width(400)).unwrap();
    assert_eq!(again.active_size(), &SizeKey::resized(400, 200));
    assert_eq!(media.store().backend().resizes.load(Ordering::SeqCst), 1);
}

#[test]
fn changed_source_regenerates_variant() {
    let tmp = TempDir::new().unwrap();
    let media = counting_media(site(&tmp, ""));

    media
        .image(1u64)
        .unwrap()
        .size(SizeSpec::Width(400))
        .unwrap();

    // Same dimensions, different pixels
    let source = tmp.path().join("uploads/2024/photo.jpg");
    let img = RgbImage::from_pixel(1000, 500, image::Rgb([10, 200, 30]));
    img.save(&source).unwrap();

    media
        .image(1u64)
        .unwrap()
        .size(SizeSpec::Width(400))
        .unwrap();
    assert_eq!(media.store().backend().resizes.load(Ordering::SeqCst), 2);
}

#[test]
fn inline_svg_has_no_size_attributes() {
    let tmp = TempDir::new().unwrap();
    let media = FsMedia::open(site(&tmp, "")).unwrap();

    let html = media
        .image("logo.svg")
        .unwrap()
        .inline(true)
        .class("brand")
        .render()
        .unwrap();

    assert!(html.starts_with(r#"<div class="svg brand"><svg"#));
    assert!(html.ends_with("</svg></div>"));
    assert!(!html.contains("width="));
    assert!(!html.contains("height="));
    assert!(!html.ends_with("/>"));
}

#[test]
fn lazy_class_appears_once_across_renders() {
    let tmp = TempDir::new().unwrap();
    let media = FsMedia::open(site(&tmp, "[lazy]\nenabled = true\nclass = \"js-lazy\"\n")).unwrap();

    let mut image = media.image(1u64).unwrap();
    image.class("hero");
    let first = image.render().unwrap();
    let second = image.render().unwrap();

    assert_eq!(first, second);
    assert!(first.contains(r#"data-src="/uploads/2024/photo.jpg""#));
    assert!(first.contains(r#"class="hero js-lazy""#));
    assert_eq!(first.matches("js-lazy").count(), 1);
    assert_eq!(image.classes(), ["hero"]);
}

#[test]
fn get_with_size_leaves_image_unchanged() {
    let tmp = TempDir::new().unwrap();
    let media = FsMedia::open(site(&tmp, "")).unwrap();
    let mut image = media.image(1u64).unwrap();

    let sized = image.get(Some(SizeSpec::Width(300))).unwrap();
    let plain = image.get(None).unwrap();

    assert!(sized.contains(r#"src="/uploads/2024/photo-resized-300x150.jpg""#));
    assert!(sized.contains(r#"width="300" height="150""#));
    assert!(plain.contains(r#"src="/uploads/2024/photo.jpg""#));
    assert!(plain.contains(r#"width="1000" height="500""#));
    assert!(image.active_size().is_full());
}

#[test]
fn breakpoints_render_responsive_attributes() {
    let tmp = TempDir::new().unwrap();
    let media = FsMedia::open(site(&tmp, "")).unwrap();

    let mut image = media.image(1u64).unwrap();
    image.srcset([Breakpoint::new(600, 300), Breakpoint::new(900, 600)]);
    let html = image.render().unwrap();

    assert!(html.contains(
        r#"srcset="/uploads/2024/photo-resized-300x150.jpg 300w, /uploads/2024/photo-resized-600x300.jpg 600w, /uploads/2024/photo.jpg 1000w""#
    ));
    assert!(html.contains("sizes=\"(max-width: 600px) 300px,\n(max-width: 900px) 600px,\n1000px\""));
    assert!(variant_path(&tmp, "photo-resized-300x150.jpg").exists());
    assert!(variant_path(&tmp, "photo-resized-600x300.jpg").exists());
}

#[test]
fn generated_sizes_feed_later_srcsets() {
    let tmp = TempDir::new().unwrap();
    let config = site(&tmp, "");
    {
        let media = FsMedia::open(config.clone()).unwrap();
        media
            .image(1u64)
            .unwrap()
            .size(SizeSpec::Width(500))
            .unwrap();
    }

    // A fresh process sees the recorded size in the default srcset
    let media = FsMedia::open(config).unwrap();
    let html = media.image(1u64).unwrap().render().unwrap();
    assert!(html.contains(
        r#"srcset="/uploads/2024/photo-resized-500x250.jpg 500w, /uploads/2024/photo.jpg 1000w""#
    ));
    assert!(html.contains(r#"sizes="(max-width: 1000px) 100vw, 1000px""#));
}

#[test]
fn alt_text_is_escaped() {
    let tmp = TempDir::new().unwrap();
    let media = FsMedia::open(site(&tmp, "")).unwrap();
    let html = media
        .image(1u64)
        .unwrap()
        .alt(r#"Fish & "Chips""#)
        .render()
        .unwrap();
    assert!(html.contains(r#"alt="Fish &amp; &quot;Chips&quot;""#));
}

#[test]
fn missing_theme_image_renders_without_dimensions() {
    let tmp = TempDir::new().unwrap();
    let media = FsMedia::open(site(&tmp, "")).unwrap();
    let image = media.image("missing.png").unwrap();
    assert_eq!(image.kind(), None);
    assert_eq!(
        image.render().unwrap(),
        r#"<img src="/theme/images/missing.png" width="" height="" />"#
    );
}
