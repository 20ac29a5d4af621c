//! Batch variant generation.
//!
//! Renders generate variants lazily, so the first page view after an upload
//! pays for the encodes. `warm` does that work ahead of time: every attachment
//! gets a width variant per requested width, recorded in the library exactly as
//! a render would record it.
//!
//! Attachments are processed in parallel with [rayon](https://docs.rs/rayon);
//! widths for one attachment run in order.

use crate::image::ImageKind;
use crate::imaging::ImageBackend;
use crate::library::{AttachmentId, MediaLibrary};
use crate::media::{Media, MediaError};
use crate::size::{SizeKey, SizeSpec};
use crate::variants::VariantStore;
use rayon::prelude::*;
use tracing::debug;

/// What happened for one requested width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmStatus {
    Ready { key: SizeKey, url: String },
    Failed,
    Skipped(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmedVariant {
    pub width: u32,
    pub status: WarmStatus,
}

/// Outcome for one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmReport {
    pub id: AttachmentId,
    pub url: String,
    pub variants: Vec<WarmedVariant>,
}

/// Generate a width variant of every attachment in `ids` for every width in
/// `widths`. Widths not smaller than the original are skipped.
pub fn warm<L, S, B>(
    media: &Media<L, S, B>,
    ids: &[AttachmentId],
    widths: &[u32],
) -> Result<Vec<WarmReport>, MediaError>
where
    L: MediaLibrary + Sync,
    S: VariantStore,
    B: ImageBackend,
{
    ids.par_iter()
        .map(|&id| warm_attachment(media, id, widths))
        .collect()
}

fn warm_attachment<L, S, B>(
    media: &Media<L, S, B>,
    id: AttachmentId,
    widths: &[u32],
) -> Result<WarmReport, MediaError>
where
    L: MediaLibrary,
    S: VariantStore,
    B: ImageBackend,
{
    let mut image = media.image(id)?;
    let url = image.url().to_string();
    let kind = image.kind();
    let full_width = image.width();

    let mut variants = Vec::with_capacity(widths.len());
    for &width in widths {
        let status = match (kind, full_width) {
            (None, _) => WarmStatus::Skipped("file missing"),
            (Some(ImageKind::Vector), _) => WarmStatus::Skipped("vector image"),
            (Some(ImageKind::Raster), None) => WarmStatus::Skipped("unknown dimensions"),
            (Some(ImageKind::Raster), Some(full)) if width == 0 || width >= full => {
                WarmStatus::Skipped("not smaller than the original")
            }
            (Some(ImageKind::Raster), Some(_)) => {
                image.size(SizeSpec::Full)?.size(SizeSpec::Width(width))?;
                if image.active_size().is_full() {
                    WarmStatus::Failed
                } else {
                    WarmStatus::Ready {
                        key: image.active_size().clone(),
                        url: image.url().to_string(),
                    }
                }
            }
        };
        debug!(%id, width, ?status, "warmed");
        variants.push(WarmedVariant { width, status });
    }

    Ok(WarmReport { id, url, variants })
}
