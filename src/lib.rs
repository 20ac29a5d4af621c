//! # respimg
//!
//! Image markup for templates: `<img>` tags and inline SVG with lazy-loading,
//! responsive `srcset`/`sizes` attributes, and resized variants generated on
//! first use.
//!
//! ```no_run
//! use respimg::{Breakpoint, FsMedia, SizeSpec, load_config};
//!
//! let media = FsMedia::open(load_config("respimg.toml".as_ref())?)?;
//!
//! let mut hero = media.image(12u64)?;
//! hero.class("hero")
//!     .lazy(true)
//!     .srcset([Breakpoint::new(600, 300), Breakpoint::new(900, 600)]);
//! hero.size(SizeSpec::Width(1200))?;
//! println!("{}", hero.render()?);
//!
//! let logo = media.image("logo.svg")?.inline(true).render()?;
//! # let _ = logo;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! Source ──resolve──▶ Image ──size()──▶ VariantStore ──▶ ImageBackend
//!                       │                    │
//!                       │             record_size()
//!                       ▼                    ▼
//!                    render() ◀──srcset/sizes── MediaLibrary
//! ```
//!
//! Everything an image needs from its surroundings is an explicit seam:
//!
//! - **[`MediaLibrary`]**: attachment lookup, per-size URLs, metadata for
//!   generated sizes, and the `srcset`/`sizes` algorithms.
//!   [`FsLibrary`] keeps it in a JSON index beside the uploads.
//! - **[`VariantStore`]**: get-or-generate for resized files.
//!   [`DiskVariantStore`] writes them beside their sources.
//! - **[`ImageBackend`]**: probing and resizing. [`RustBackend`] is pure Rust.
//! - **[`MediaConfig`]**: lazy defaults and directory layout, loaded once.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`media`] | [`Media`] context and [`MediaError`] |
//! | [`image`] | The [`Image`] builder: resolution, size selection, rendering |
//! | [`size`] | [`SizeSpec`] requests and [`SizeKey`] identities |
//! | [`responsive`] | Breakpoints → variant candidates and the `sizes` descriptor |
//! | [`variants`] | Variant files and their staleness manifest |
//! | [`library`] | The [`MediaLibrary`] trait and its value types |
//! | [`fs_library`] | Filesystem implementation with default srcset/sizes |
//! | [`markup`] | Class sets, attribute lists, escaping, tag shapes |
//! | [`imaging`] | Backends, dimension math, SVG size parsing |
//! | [`config`] | `respimg.toml` loading, merging, validation |
//! | [`warm`] | Parallel variant pre-generation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Scoped srcset overrides
//!
//! Responsive output reuses the library's own `srcset` algorithm, fed with
//! the breakpoint variants instead of the stored sizes. The replacement is an
//! argument to that one call ([`SrcsetOverride`]), so there is no shared state
//! to install and remove around a render.
//!
//! ## Failed variants are not errors
//!
//! A variant that cannot be encoded leaves the image at its previous size
//! and logs a warning. A page still renders with a larger image; it does not
//! render at all with an error.
//!
//! ## Maud for escaping
//!
//! Attribute values go through [Maud](https://maud.lambda.xyz/)'s escaper.
//! Alt text and URLs come from users and uploads; nothing is interpolated raw
//! except the SVG document of an inline image.

pub mod config;
pub mod fs_library;
pub mod image;
pub mod imaging;
pub mod library;
pub mod markup;
pub mod media;
pub mod output;
pub mod responsive;
pub mod size;
pub mod urls;
pub mod variants;
pub mod warm;

pub use config::{MediaConfig, load_config};
pub use fs_library::FsLibrary;
pub use image::{Image, ImageKind, Source};
pub use imaging::{Dimensions, ImageBackend, RustBackend};
pub use library::{AttachmentId, MediaLibrary, SrcsetOverride};
pub use media::{FsMedia, Media, MediaError};
pub use responsive::Breakpoint;
pub use size::{SizeKey, SizeSpec};
pub use variants::{DiskVariantStore, VariantStore};

#[cfg(test)]
pub(crate) mod test_helpers;
