//! Filesystem-backed media library.
//!
//! Attachments are plain files under the uploads directory, described by a
//! JSON index at `<uploads_dir>/attachments.json`:
//!
//! ```json
//! {
//!   "version": 1,
//!   "next_id": 3,
//!   "attachments": {
//!     "1": {
//!       "file": "2024/photo.jpg",
//!       "alt": "Harbour at dawn",
//!       "width": 1000,
//!       "height": 500,
//!       "mime_type": "image/jpeg",
//!       "sizes": {
//!         "thumbnail": { "file": "photo-150x75.jpg", "width": 150, "height": 75 },
//!         "resized-400x200": { "file": "photo-resized-400x200.jpg", "width": 400, "height": 200 }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Size entries are relative to the attachment's own directory. Generated
//! variants are recorded here as they are produced, so `srcset` picks them up
//! on later renders.
//!
//! Unlike the variant manifest, the index is data rather than cache: a corrupt
//! or unknown-version index is an error, never silently emptied.

use crate::config::MediaConfig;
use crate::imaging::{
    Dimensions, ImageBackend, is_vector, matches_ratio, mime_type, supported_input_extensions,
    svg_dimensions,
};
use crate::library::{
    Attachment, AttachmentId, ImageSrc, LibraryError, MediaLibrary, SizeEntry, SrcsetCandidate,
    SrcsetOverride,
};
use crate::size::{SizeKey, split_variant_stem};
use crate::urls::{join_url, parent_dir};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Name of the attachment index within the uploads directory.
pub const INDEX_FILENAME: &str = "attachments.json";

/// Version of the index format.
const INDEX_VERSION: u32 = 1;

/// One attachment in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Path relative to the uploads directory, `/`-separated.
    pub file: String,
    #[serde(default)]
    pub alt: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub sizes: BTreeMap<String, SizeEntry>,
}

/// On-disk attachment index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentIndex {
    pub version: u32,
    pub next_id: u64,
    pub attachments: BTreeMap<AttachmentId, AttachmentRecord>,
}

impl AttachmentIndex {
    pub fn empty() -> Self {
        Self {
            version: INDEX_VERSION,
            next_id: 1,
            attachments: BTreeMap::new(),
        }
    }

    /// Load from the uploads directory. A missing file is an empty index.
    pub fn load(uploads_dir: &Path) -> Result<Self, LibraryError> {
        let path = uploads_dir.join(INDEX_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(e) => return Err(e.into()),
        };
        let index: Self = serde_json::from_str(&content)?;
        if index.version != INDEX_VERSION {
            return Err(LibraryError::Version {
                found: index.version,
                expected: INDEX_VERSION,
            });
        }
        Ok(index)
    }

    /// Save to the uploads directory.
    pub fn save(&self, uploads_dir: &Path) -> Result<(), LibraryError> {
        std::fs::create_dir_all(uploads_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(uploads_dir.join(INDEX_FILENAME), json)?;
        Ok(())
    }
}

/// Media library over a directory of uploads.
pub struct FsLibrary {
    uploads_dir: PathBuf,
    uploads_url: String,
    max_srcset_width: u32,
    index: Mutex<AttachmentIndex>,
}

impl FsLibrary {
    /// Open the library described by `config`, loading its index.
    pub fn open(config: &MediaConfig) -> Result<Self, LibraryError> {
        let uploads_dir = config.library.uploads_dir.clone();
        let index = AttachmentIndex::load(&uploads_dir)?;
        debug!(
            dir = %uploads_dir.display(),
            attachments = index.attachments.len(),
            "opened media library"
        );
        Ok(Self {
            uploads_dir,
            uploads_url: config.library.uploads_url.clone(),
            max_srcset_width: config.images.max_srcset_width,
            index: Mutex::new(index),
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Ids of all attachments, ascending.
    pub fn attachment_ids(&self) -> Vec<AttachmentId> {
        self.lock().attachments.keys().copied().collect()
    }

    /// Snapshot of one attachment's record.
    pub fn record(&self, id: AttachmentId) -> Option<AttachmentRecord> {
        self.lock().attachments.get(&id).cloned()
    }

    /// Add a file under the uploads directory as a new attachment.
    ///
    /// Dimensions are probed now (SVG root attributes, or `backend` for raster
    /// files). Registering an already known file returns its existing id.
    pub fn register(
        &self,
        file: &Path,
        alt: &str,
        backend: &impl ImageBackend,
    ) -> Result<AttachmentId, LibraryError> {
        let relative = self.relative_file(file)?;

        if let Some(id) = self.find_by_file(&relative) {
            return Ok(id);
        }

        let dims = probe(file, backend)
            .map_err(|reason| LibraryError::Register(file.to_path_buf(), reason))?;

        let mut index = self.lock();
        let id = AttachmentId(index.next_id);
        index.next_id += 1;
        index.attachments.insert(
            id,
            AttachmentRecord {
                file: relative,
                alt: alt.to_string(),
                width: dims.width,
                height: dims.height,
                mime_type: mime_type(file).map(str::to_string),
                sizes: BTreeMap::new(),
            },
        );
        index.save(&self.uploads_dir)?;
        info!(%id, file = %file.display(), "registered attachment");
        Ok(id)
    }

    /// Register every image under the uploads directory that is not in the
    /// index yet. Generated variants and the index itself are skipped.
    pub fn scan(&self, backend: &impl ImageBackend) -> Result<Vec<AttachmentId>, LibraryError> {
        let mut added = Vec::new();
        for entry in WalkDir::new(&self.uploads_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                LibraryError::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
                )
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_library_image(path) {
                continue;
            }
            let relative = self.relative_file(path)?;
            if self.find_by_file(&relative).is_some() {
                continue;
            }
            match self.register(path, "", backend) {
                Ok(id) => added.push(id),
                Err(LibraryError::Register(path, reason)) => {
                    debug!(file = %path.display(), %reason, "skipping unreadable image");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(added)
    }

    fn lock(&self) -> MutexGuard<'_, AttachmentIndex> {
        // A panic mid-update leaves the index usable: every mutation is a
        // single map insert.
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn find_by_file(&self, relative: &str) -> Option<AttachmentId> {
        self.lock()
            .attachments
            .iter()
            .find(|(_, record)| record.file == relative)
            .map(|(id, _)| *id)
    }

    fn relative_file(&self, file: &Path) -> Result<String, LibraryError> {
        let relative = file.strip_prefix(&self.uploads_dir).map_err(|_| {
            LibraryError::Register(
                file.to_path_buf(),
                format!("not inside {}", self.uploads_dir.display()),
            )
        })?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }

    fn full_url(&self, record: &AttachmentRecord) -> String {
        join_url(&self.uploads_url, &[&record.file])
    }

    fn size_url(&self, record: &AttachmentRecord, file: &str) -> String {
        join_url(&self.uploads_url, &[parent_dir(&record.file), file])
    }

    /// Resolve a size against a record, falling back to the full image.
    fn src_for(&self, record: &AttachmentRecord, key: &SizeKey) -> ImageSrc {
        let entry = match key {
            SizeKey::Full => None,
            other => record.sizes.get(&other.to_string()),
        };
        match entry {
            Some(entry) => ImageSrc {
                url: self.size_url(record, &entry.file),
                width: entry.width,
                height: entry.height,
            },
            None => ImageSrc {
                url: self.full_url(record),
                width: record.width,
                height: record.height,
            },
        }
    }

    fn stored_candidates(&self, record: &AttachmentRecord) -> Vec<SrcsetCandidate> {
        record
            .sizes
            .iter()
            .map(|(name, entry)| SrcsetCandidate {
                key: name.parse().unwrap_or(SizeKey::Full),
                url: self.size_url(record, &entry.file),
                width: entry.width,
                height: entry.height,
            })
            .collect()
    }
}

impl MediaLibrary for FsLibrary {
    fn attachment(&self, id: AttachmentId) -> Result<Option<Attachment>, LibraryError> {
        let index = self.lock();
        Ok(index.attachments.get(&id).map(|record| Attachment {
            id,
            path: self.uploads_dir.join(&record.file),
            url: self.full_url(record),
            alt: record.alt.clone(),
        }))
    }

    fn image_src(
        &self,
        id: AttachmentId,
        key: &SizeKey,
    ) -> Result<Option<ImageSrc>, LibraryError> {
        let index = self.lock();
        Ok(index
            .attachments
            .get(&id)
            .map(|record| self.src_for(record, key)))
    }

    fn record_size(
        &self,
        id: AttachmentId,
        key: &SizeKey,
        entry: SizeEntry,
    ) -> Result<(), LibraryError> {
        let mut index = self.lock();
        let record = index
            .attachments
            .get_mut(&id)
            .ok_or(LibraryError::UnknownAttachment(id))?;
        if record.sizes.get(&key.to_string()) == Some(&entry) {
            return Ok(());
        }
        record.sizes.insert(key.to_string(), entry);
        index.save(&self.uploads_dir)
    }

    fn srcset(
        &self,
        id: AttachmentId,
        key: &SizeKey,
        overrides: Option<&SrcsetOverride>,
    ) -> Result<Option<String>, LibraryError> {
        let index = self.lock();
        let Some(record) = index.attachments.get(&id) else {
            return Ok(None);
        };
        let selected = self.src_for(record, key);
        let mut candidates = match overrides {
            Some(o) => o.candidates.clone(),
            None => self.stored_candidates(record),
        };
        candidates.push(SrcsetCandidate {
            key: SizeKey::Full,
            url: self.full_url(record),
            width: record.width,
            height: record.height,
        });
        Ok(calculate_srcset(
            (selected.width, selected.height),
            &candidates,
            self.max_srcset_width,
        ))
    }

    fn sizes(
        &self,
        id: AttachmentId,
        key: &SizeKey,
        overrides: Option<&SrcsetOverride>,
    ) -> Result<Option<String>, LibraryError> {
        if let Some(o) = overrides {
            return Ok(Some(o.sizes.clone()));
        }
        let index = self.lock();
        Ok(index
            .attachments
            .get(&id)
            .map(|record| self.src_for(record, key).width)
            .and_then(calculate_sizes))
    }
}

/// Default `srcset` algorithm.
///
/// Keeps candidates no wider than `max_width` whose aspect ratio matches the
/// displayed size, first candidate per width wins. A single source is not
/// worth a `srcset`, so fewer than two yield `None`.
pub fn calculate_srcset(
    selected: (u32, u32),
    candidates: &[SrcsetCandidate],
    max_width: u32,
) -> Option<String> {
    let mut seen_widths = Vec::new();
    let mut sources = Vec::new();
    for candidate in candidates {
        if candidate.width > max_width
            || seen_widths.contains(&candidate.width)
            || !matches_ratio(selected, (candidate.width, candidate.height))
        {
            continue;
        }
        seen_widths.push(candidate.width);
        sources.push(format!("{} {}w", candidate.url, candidate.width));
    }
    (sources.len() >= 2).then(|| sources.join(", "))
}

/// Default `sizes` algorithm: full viewport width up to the displayed width.
pub fn calculate_sizes(width: u32) -> Option<String> {
    (width > 0).then(|| format!("(max-width: {width}px) 100vw, {width}px"))
}

fn is_library_image(path: &Path) -> bool {
    if path.file_name().and_then(|n| n.to_str()) == Some(INDEX_FILENAME) {
        return false;
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    if split_variant_stem(stem).is_some() {
        return false;
    }
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| supported_input_extensions().contains(&e.as_str()));
    supported || is_vector(path)
}

fn probe(file: &Path, backend: &impl ImageBackend) -> Result<Dimensions, String> {
    if is_vector(file) {
        let text = std::fs::read_to_string(file).map_err(|e| e.to_string())?;
        return svg_dimensions(&text).ok_or_else(|| "SVG declares no size".to_string());
    }
    backend.identify(file).map_err(|e| e.to_string())
}
