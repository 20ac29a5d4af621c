//! The media library seam.
//!
//! [`MediaLibrary`] is everything an [`Image`](crate::Image) needs from the
//! system that owns the uploads: attachment lookup, per-size URLs, metadata
//! writes for freshly generated variants, and the library's own `srcset` /
//! `sizes` algorithms.
//!
//! Responsive output reuses those algorithms rather than reimplementing them.
//! Instead of temporarily patching global state around the call, the caller
//! passes a [`SrcsetOverride`] that replaces the candidate list and `sizes`
//! string for that one call.
//!
//! The production implementation is [`FsLibrary`](crate::fs_library::FsLibrary).

use crate::size::SizeKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Attachment index error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Attachment index version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("Unknown attachment: {0}")]
    UnknownAttachment(AttachmentId),
    #[error("Cannot register {}: {}", .0.display(), .1)]
    Register(PathBuf, String),
}

/// Numeric attachment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved attachment: the file on disk and how the public refers to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub id: AttachmentId,
    pub path: PathBuf,
    pub url: String,
    pub alt: String,
}

/// URL and dimensions of one size of an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSrc {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Metadata entry for one stored size, relative to the attachment's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub file: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One image offered to the browser in a `srcset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetCandidate {
    pub key: SizeKey,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Replacement inputs for one `srcset`/`sizes` computation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SrcsetOverride {
    /// Used instead of the attachment's stored sizes.
    pub candidates: Vec<SrcsetCandidate>,
    /// Used verbatim as the `sizes` attribute.
    pub sizes: String,
}

/// Lookup and bookkeeping operations of a media library.
pub trait MediaLibrary {
    /// Resolve an attachment. `Ok(None)` when the id is unknown.
    fn attachment(&self, id: AttachmentId) -> Result<Option<Attachment>, LibraryError>;

    /// URL and dimensions of a size of an attachment. Unknown named sizes fall
    /// back to the full image.
    fn image_src(&self, id: AttachmentId, key: &SizeKey)
    -> Result<Option<ImageSrc>, LibraryError>;

    /// Remember a generated size so later lookups and srcsets include it.
    fn record_size(
        &self,
        id: AttachmentId,
        key: &SizeKey,
        entry: SizeEntry,
    ) -> Result<(), LibraryError>;

    /// The `srcset` attribute value for an attachment shown at `key`.
    /// `Ok(None)` when there is nothing worth offering.
    fn srcset(
        &self,
        id: AttachmentId,
        key: &SizeKey,
        overrides: Option<&SrcsetOverride>,
    ) -> Result<Option<String>, LibraryError>;

    /// The `sizes` attribute value for an attachment shown at `key`.
    fn sizes(
        &self,
        id: AttachmentId,
        key: &SizeKey,
        overrides: Option<&SrcsetOverride>,
    ) -> Result<Option<String>, LibraryError>;
}
