//! The image builder.
//!
//! An [`Image`] is created by [`Media::image`] from a [`Source`], configured
//! through chained `&mut self` setters and rendered to markup:
//!
//! ```text
//! media.image(12)?               attachment 12, probed at 1000×500
//!     .alt("Harbour")
//!     .class("hero wide")
//!     .size(SizeSpec::Width(400))?  → photo-resized-400x200.jpg, 400×200
//!     .render()?                 → <img src="…" alt="Harbour" class="hero wide" width="400" height="200" … />
//! ```
//!
//! # Resolution
//!
//! Construction never fails because a file is missing: an unknown attachment
//! or an absent file leaves kind and dimensions unset and the image renders
//! with empty `width`/`height`. Only library failures (a corrupt index) are
//! errors.
//!
//! # Selection
//!
//! The *selection* is the currently chosen size: its key, URL and
//! dimensions. [`Image::size`] replaces it; [`Image::get`] swaps it for one
//! render and restores it afterwards. Pixel sizes are always computed from
//! the full image's aspect ratio, never from the current selection.

use crate::imaging::{Dimensions, ImageBackend, is_vector, svg_dimensions};
use crate::library::{Attachment, AttachmentId, MediaLibrary, SrcsetCandidate};
use crate::markup::{Attributes, ClassList, img_tag, inline_svg, is_valid_attr_name};
use crate::media::{Media, MediaError};
use crate::responsive::{Breakpoint, Orientation, ResponsiveSet};
use crate::size::{SizeKey, SizeSpec};
use crate::variants::{SourceFile, VariantRequest, VariantStore};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What an image is created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// An attachment record the caller already holds. The file is looked up
    /// by id; URL and alt text are taken as given.
    Record {
        id: AttachmentId,
        url: String,
        alt: String,
    },
    /// An attachment id; everything is looked up.
    Id(AttachmentId),
    /// A path relative to the theme's image directory.
    Path(String),
}

impl From<AttachmentId> for Source {
    fn from(id: AttachmentId) -> Self {
        Source::Id(id)
    }
}

impl From<u64> for Source {
    fn from(id: u64) -> Self {
        Source::Id(AttachmentId(id))
    }
}

impl From<&str> for Source {
    /// A positive integer is an attachment id, anything else a theme path.
    fn from(value: &str) -> Self {
        match value.trim().parse::<u64>() {
            Ok(id) if id > 0 => Source::Id(AttachmentId(id)),
            _ => Source::Path(value.to_string()),
        }
    }
}

impl From<String> for Source {
    fn from(value: String) -> Self {
        Source::from(value.as_str())
    }
}

impl From<Attachment> for Source {
    fn from(attachment: Attachment) -> Self {
        Source::Record {
            id: attachment.id,
            url: attachment.url,
            alt: attachment.alt,
        }
    }
}

/// Raster or vector, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Raster,
    Vector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection {
    key: SizeKey,
    url: String,
    dims: Option<Dimensions>,
    orientation: Orientation,
}

/// An image being configured for output.
pub struct Image<'m, L, S, B> {
    media: &'m Media<L, S, B>,
    id: Option<AttachmentId>,
    path: Option<PathBuf>,
    full_url: String,
    alt: String,
    kind: Option<ImageKind>,
    full: Option<Dimensions>,
    selection: Selection,
    classes: ClassList,
    attrs: Attributes,
    lazy: Option<bool>,
    inline: bool,
    breakpoints: Vec<Breakpoint>,
}

impl<'m, L, S, B> Image<'m, L, S, B>
where
    L: MediaLibrary,
    S: VariantStore,
    B: ImageBackend,
{
    pub(crate) fn resolve(media: &'m Media<L, S, B>, source: Source) -> Result<Self, MediaError> {
        let (id, path, url, alt) = match source {
            Source::Record { id, url, alt } => {
                let path = media.library().attachment(id)?.map(|a| a.path);
                if path.is_none() {
                    debug!(%id, "attachment record has no file in the library");
                }
                (Some(id), path, url, alt)
            }
            Source::Id(id) => match media.library().attachment(id)? {
                Some(a) => (Some(id), Some(a.path), a.url, a.alt),
                None => {
                    debug!(%id, "unknown attachment");
                    (Some(id), None, String::new(), String::new())
                }
            },
            Source::Path(relative) => {
                let (path, url) = media.theme_file(&relative);
                (None, Some(path), url, String::new())
            }
        };

        let (kind, full) = match path.as_deref() {
            Some(path) => probe(path, media.backend()),
            None => (None, None),
        };

        Ok(Self {
            media,
            id,
            path,
            selection: Selection {
                key: SizeKey::Full,
                url: url.clone(),
                dims: full,
                orientation: Orientation::Width,
            },
            full_url: url,
            alt,
            kind,
            full,
            classes: ClassList::new(),
            attrs: Attributes::new(),
            lazy: None,
            inline: false,
            breakpoints: Vec::new(),
        })
    }

    // =========================================================================
    // Builder
    // =========================================================================

    pub fn alt(&mut self, alt: impl Into<String>) -> &mut Self {
        self.alt = alt.into();
        self
    }

    /// Add whitespace-separated class names. Duplicates are ignored.
    pub fn class(&mut self, tokens: &str) -> &mut Self {
        self.classes.add(tokens);
        self
    }

    /// Set an extra attribute. A later value for the same name replaces the
    /// earlier one.
    ///
    /// Unlike the other mutators this one validates its input. An empty name,
    /// or one containing whitespace, control characters, quotes, `>`, `/` or
    /// `=`, cannot appear in a tag: the attribute is not stored and a warning
    /// is logged. Values are never rejected; they are escaped on render.
    pub fn attr(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        if is_valid_attr_name(name) {
            self.attrs.set(name, value);
        } else {
            warn!(name, "ignoring invalid attribute name");
        }
        self
    }

    pub fn lazy(&mut self, lazy: bool) -> &mut Self {
        self.lazy = Some(lazy);
        self
    }

    /// Embed vector images as markup instead of referencing them. Raster
    /// images ignore this.
    pub fn inline(&mut self, inline: bool) -> &mut Self {
        self.inline = inline;
        self
    }

    /// Breakpoints for responsive `srcset`/`sizes` output.
    pub fn srcset(&mut self, breakpoints: impl IntoIterator<Item = Breakpoint>) -> &mut Self {
        self.breakpoints = breakpoints.into_iter().collect();
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> Option<AttachmentId> {
        self.id
    }

    /// URL of the current selection.
    pub fn url(&self) -> &str {
        &self.selection.url
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn alt_text(&self) -> &str {
        &self.alt
    }

    pub fn width(&self) -> Option<u32> {
        self.selection.dims.map(|d| d.width)
    }

    pub fn height(&self) -> Option<u32> {
        self.selection.dims.map(|d| d.height)
    }

    pub fn kind(&self) -> Option<ImageKind> {
        self.kind
    }

    pub fn active_size(&self) -> &SizeKey {
        &self.selection.key
    }

    pub fn classes(&self) -> &[String] {
        self.classes.as_slice()
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Whether the next render uses `data-src`.
    pub fn is_lazy(&self) -> bool {
        self.lazy.unwrap_or(self.media.config().lazy.enabled)
    }

    fn is_inline_vector(&self) -> bool {
        self.inline && self.kind == Some(ImageKind::Vector)
    }

    // =========================================================================
    // Size selection
    // =========================================================================

    /// Select a display size.
    ///
    /// Pixel sizes generate (or reuse) a variant file; if that fails the
    /// previous selection stays. Inputs that cannot produce a size (zero
    /// pixels, an image without known dimensions) are ignored with a warning.
    pub fn size(&mut self, spec: impl Into<SizeSpec>) -> Result<&mut Self, MediaError> {
        match spec.into() {
            SizeSpec::Full => {
                self.selection = Selection {
                    key: SizeKey::Full,
                    url: self.full_url.clone(),
                    dims: self.full,
                    orientation: Orientation::Width,
                };
            }
            SizeSpec::Named(name) => self.select_named(name)?,
            SizeSpec::Width(width) => self.select_scaled(Orientation::Width, width)?,
            SizeSpec::Height(height) => self.select_scaled(Orientation::Height, height)?,
            SizeSpec::Crop { width, height } => {
                if width == 0 || height == 0 {
                    warn!(width, height, "ignoring empty crop size");
                } else {
                    self.select_resized(VariantRequest::crop(width, height), Orientation::Width)?;
                }
            }
        }
        Ok(self)
    }

    fn select_named(&mut self, name: String) -> Result<(), MediaError> {
        let key = SizeKey::Named(name);
        if let Some(id) = self.id
            && let Some(src) = self.media.library().image_src(id, &key)?
        {
            self.selection.url = src.url;
            self.selection.dims = Some(Dimensions::new(src.width, src.height));
        }
        self.selection.key = key;
        self.selection.orientation = Orientation::Width;
        Ok(())
    }

    fn select_scaled(&mut self, orientation: Orientation, edge: u32) -> Result<(), MediaError> {
        let Some(full) = self.full.filter(|d| !d.is_degenerate()) else {
            warn!(url = %self.full_url, "image has no usable dimensions, keeping size");
            return Ok(());
        };
        let Some((width, height)) = orientation.scale(full, edge) else {
            warn!(url = %self.full_url, edge, "ignoring empty pixel size");
            return Ok(());
        };
        self.select_resized(VariantRequest::resize(width, height), orientation)
    }

    fn select_resized(
        &mut self,
        request: VariantRequest,
        orientation: Orientation,
    ) -> Result<(), MediaError> {
        let media = self.media;
        let selection = match (self.kind, self.path.as_deref()) {
            (Some(ImageKind::Vector), _) => Selection {
                key: request.key(),
                url: self.full_url.clone(),
                dims: Some(Dimensions::new(request.width, request.height)),
                orientation,
            },
            (Some(ImageKind::Raster), Some(path)) => {
                let source = SourceFile {
                    path,
                    url: &self.full_url,
                };
                let Some(variant) = media.store().get_or_generate(&source, request) else {
                    return Ok(());
                };
                if let Some(id) = self.id {
                    media
                        .library()
                        .record_size(id, &variant.key, variant.size_entry())?;
                }
                Selection {
                    dims: Some(Dimensions::new(variant.width, variant.height)),
                    key: variant.key,
                    url: variant.url,
                    orientation,
                }
            }
            _ => {
                debug!(url = %self.full_url, "no image file, keeping size");
                return Ok(());
            }
        };
        self.selection = selection;
        Ok(())
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Render with `size` selected for this call only. The previous selection
    /// is restored afterwards, also when rendering fails.
    pub fn get(&mut self, size: Option<SizeSpec>) -> Result<String, MediaError> {
        let Some(size) = size else {
            return self.render();
        };
        let snapshot = self.selection.clone();
        let result = match self.size(size) {
            Ok(image) => image.render(),
            Err(e) => Err(e),
        };
        self.selection = snapshot;
        result
    }

    /// Markup for the current selection.
    pub fn render(&self) -> Result<String, MediaError> {
        if self.is_inline_vector()
            && let Some(path) = self.path.as_deref()
        {
            return self.render_inline(path);
        }

        let mut classes = self.classes.clone();
        let mut attrs = Attributes::new();
        if self.is_lazy() {
            classes.add(&self.media.config().lazy.class);
            attrs.set_non_empty("data-src", &self.selection.url);
        } else {
            attrs.set_non_empty("src", &self.selection.url);
        }
        attrs.set_non_empty("alt", &self.alt);
        attrs.set_non_empty("class", &classes.joined());

        for (name, value) in self.attrs.iter() {
            attrs.set(name, value);
        }

        let dims = self.selection.dims;
        attrs.set_default("width", dims.map(|d| d.width.to_string()).unwrap_or_default());
        attrs.set_default("height", dims.map(|d| d.height.to_string()).unwrap_or_default());

        if self.kind != Some(ImageKind::Vector)
            && !(attrs.contains("srcset") && attrs.contains("sizes"))
        {
            let (srcset, sizes) = self.srcset_and_sizes()?;
            if let Some(srcset) = srcset {
                attrs.set_default("srcset", srcset);
            }
            if let Some(sizes) = sizes {
                attrs.set_default("sizes", sizes);
            }
        }

        Ok(img_tag(&attrs))
    }

    fn render_inline(&self, path: &Path) -> Result<String, MediaError> {
        let contents = std::fs::read_to_string(path)?;
        let mut classes = ClassList::new();
        classes.add("svg");
        classes.add(&self.classes.joined());

        let mut attrs = Attributes::new();
        attrs.set("class", classes.joined());
        for (name, value) in self.attrs.iter() {
            attrs.set(name, value);
        }
        Ok(inline_svg(&attrs, &contents))
    }

    fn srcset_and_sizes(&self) -> Result<(Option<String>, Option<String>), MediaError> {
        let Some(id) = self.id else {
            if !self.breakpoints.is_empty() {
                debug!(url = %self.full_url, "breakpoints need an attachment, ignoring");
            }
            return Ok((None, None));
        };
        let library = self.media.library();
        let key = &self.selection.key;

        if let Some(set) = self.responsive_set() {
            for variant in &set.variants {
                library.record_size(id, &variant.key, variant.size_entry())?;
            }
            let overrides = set.to_override();
            return Ok((
                library.srcset(id, key, Some(&overrides))?,
                library.sizes(id, key, Some(&overrides))?,
            ));
        }

        Ok((library.srcset(id, key, None)?, library.sizes(id, key, None)?))
    }

    fn responsive_set(&self) -> Option<ResponsiveSet> {
        if self.breakpoints.is_empty() || self.kind != Some(ImageKind::Raster) {
            return None;
        }
        let path = self.path.as_deref()?;
        let full = self.full.filter(|d| !d.is_degenerate())?;
        let current = self.selection.dims?;
        let default = SrcsetCandidate {
            key: self.selection.key.clone(),
            url: self.selection.url.clone(),
            width: current.width,
            height: current.height,
        };
        let source = SourceFile {
            path,
            url: &self.full_url,
        };
        Some(ResponsiveSet::build(
            full,
            self.selection.orientation,
            &self.breakpoints,
            default,
            &source,
            self.media.store(),
        ))
    }
}

/// Kind and intrinsic dimensions of a resolved file.
fn probe(path: &Path, backend: &impl ImageBackend) -> (Option<ImageKind>, Option<Dimensions>) {
    if !path.is_file() {
        debug!(path = %path.display(), "image file missing");
        return (None, None);
    }
    if is_vector(path) {
        let dims = match std::fs::read_to_string(path) {
            Ok(text) => svg_dimensions(&text),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read SVG");
                None
            }
        };
        if dims.is_none() {
            warn!(path = %path.display(), "SVG declares no usable size");
        }
        return (Some(ImageKind::Vector), dims);
    }
    match backend.identify(path) {
        Ok(dims) => (Some(ImageKind::Raster), Some(dims)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read image dimensions");
            (Some(ImageKind::Raster), None)
        }
    }
}
