//! The entry point tying configuration, library, variant store and backend
//! together.
//!
//! ```no_run
//! use respimg::{FsMedia, MediaConfig, SizeSpec};
//!
//! let media = FsMedia::open(MediaConfig::default())?;
//! let html = media
//!     .image(12u64)?
//!     .alt("Harbour at dawn")
//!     .size(SizeSpec::Width(800))?
//!     .render()?;
//! println!("{html}");
//! # Ok::<(), respimg::MediaError>(())
//! ```

use crate::config::MediaConfig;
use crate::fs_library::FsLibrary;
use crate::image::{Image, Source};
use crate::imaging::{ImageBackend, RustBackend};
use crate::library::{LibraryError, MediaLibrary};
use crate::urls::join_url;
use crate::variants::{DiskVariantStore, VariantStore};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media library error: {0}")]
    Library(#[from] LibraryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared context for building images.
pub struct Media<L, S, B> {
    config: MediaConfig,
    library: L,
    store: S,
    backend: B,
}

/// Media over the filesystem library with the pure-Rust backend.
pub type FsMedia = Media<FsLibrary, DiskVariantStore<RustBackend>, RustBackend>;

impl FsMedia {
    /// Open the uploads library and variant store described by `config`.
    pub fn open(config: MediaConfig) -> Result<Self, MediaError> {
        let library = FsLibrary::open(&config)?;
        let store = DiskVariantStore::from_config(RustBackend::new(), &config);
        Ok(Media::new(config, library, store, RustBackend::new()))
    }
}

impl<L, S, B> Media<L, S, B>
where
    L: MediaLibrary,
    S: VariantStore,
    B: ImageBackend,
{
    /// `backend` is only used to probe the dimensions of raster files;
    /// variants go through `store`.
    pub fn new(config: MediaConfig, library: L, store: S, backend: B) -> Self {
        Self {
            config,
            library,
            store,
            backend,
        }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve `source` into an image ready for configuration.
    pub fn image(&self, source: impl Into<Source>) -> Result<Image<'_, L, S, B>, MediaError> {
        Image::resolve(self, source.into())
    }

    /// File path and public URL of a theme-relative image.
    pub(crate) fn theme_file(&self, relative: &str) -> (PathBuf, String) {
        let theme = &self.config.theme;
        let relative = relative.trim_start_matches('/');
        let mut path = theme.dir.clone();
        for part in [theme.image_path.as_str(), relative] {
            let part = part.trim_matches('/');
            if !part.is_empty() {
                path.push(part);
            }
        }
        let url = join_url(&theme.url, &[&theme.image_path, relative]);
        (path, url)
    }
}
