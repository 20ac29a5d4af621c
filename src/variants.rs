//! Resized image variants, generated on demand and kept on disk.
//!
//! A variant is keyed by its pixel dimensions: the `400x200` variant of
//! `uploads/2024/photo.jpg` lives at `uploads/2024/photo-resized-400x200.jpg`
//! and is served from the same URL directory as its source. Asking for the same
//! dimensions again finds the file and skips the encode.
//!
//! # Staleness
//!
//! A file that merely exists could have been generated from an older version
//! of the source. When verification is on, the store keeps a manifest at
//! `<dir>/.variant-manifest.json` mapping each variant path it generated to:
//!
//! - **`source_hash`**: SHA-256 of the source file contents when the variant
//!   was written. Content-based rather than mtime-based so it survives copies
//!   and checkouts that reset modification times.
//! - **`params_hash`**: SHA-256 of (width, height, crop, quality).
//!
//! A recorded variant whose hashes no longer match is regenerated. Variants
//! the manifest knows nothing about (written by another process, or before
//! verification was enabled) are reused as-is.
//!
//! Within one store, a source is hashed once per (length, mtime) pair, so
//! rendering many breakpoints of the same image reads it once.
//!
//! # Concurrency
//!
//! The exists-then-generate check is not atomic. Two renders missing the same
//! variant may both encode it; the last write wins and both produce identical
//! bytes.

use crate::config::MediaConfig;
use crate::imaging::{ImageBackend, Quality, ResizeParams, mime_type};
use crate::library::SizeEntry;
use crate::size::SizeKey;
use crate::urls::with_file_name;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Name of the variant manifest file.
const MANIFEST_FILENAME: &str = ".variant-manifest.json";

/// Version of the variant manifest format. Bump this to invalidate all
/// existing manifests when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// The file a variant is derived from.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    pub path: &'a Path,
    pub url: &'a str,
}

/// Dimensions of a wanted variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantRequest {
    pub width: u32,
    pub height: u32,
    /// Fill-resize and centre-crop instead of scaling.
    pub crop: bool,
}

impl VariantRequest {
    pub fn resize(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            crop: false,
        }
    }

    pub fn crop(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            crop: true,
        }
    }

    pub fn key(&self) -> SizeKey {
        SizeKey::resized(self.width, self.height)
    }
}

/// A variant file that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub key: SizeKey,
    pub path: PathBuf,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl Variant {
    /// Metadata entry describing this variant, relative to its directory.
    pub fn size_entry(&self) -> SizeEntry {
        SizeEntry {
            file: self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            width: self.width,
            height: self.height,
            mime_type: mime_type(&self.path).map(str::to_string),
        }
    }
}

/// Get-or-generate access to variants.
pub trait VariantStore: Sync {
    /// Return the variant for `request`, generating it when missing.
    ///
    /// `None` means the variant could not be produced; callers keep whatever
    /// size they had before.
    fn get_or_generate(&self, source: &SourceFile<'_>, request: VariantRequest) -> Option<Variant>;
}

/// Path of the variant of `source` with the given key, beside the source.
pub fn variant_path(source: &Path, key: &SizeKey) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match source.extension() {
        Some(ext) => format!("{}-{}.{}", stem, key, ext.to_string_lossy()),
        None => format!("{}-{}", stem, key),
    };
    source.with_file_name(file_name)
}

/// A single recorded variant.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk record of the variants this store generated.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VariantManifest {
    pub version: u32,
    /// Variant path → hashes it was generated from.
    pub entries: HashMap<String, ManifestEntry>,
}

impl VariantManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from `dir`. Returns an empty manifest if the file doesn't exist
    /// or can't be parsed (version mismatch, corruption): the worst case is
    /// re-encoding.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(MANIFEST_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            _ => Self::empty(),
        }
    }

    pub fn save(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_FILENAME), json)
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of the parameters a variant was encoded with.
pub fn hash_variant_params(request: VariantRequest, quality: Quality) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"variant\0");
    hasher.update(request.width.to_le_bytes());
    hasher.update(request.height.to_le_bytes());
    hasher.update([u8::from(request.crop)]);
    hasher.update(quality.value().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Variant store writing files beside their sources.
pub struct DiskVariantStore<B> {
    backend: B,
    quality: Quality,
    verification: Option<Verification>,
}

struct Verification {
    dir: PathBuf,
    manifest: Mutex<VariantManifest>,
    sources: SourceHashes,
}

/// Size and modification time a cached source hash was computed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl FileStamp {
    fn of(path: &Path) -> io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// Source content hashes, recomputed only when a file's stamp changes.
#[derive(Default)]
struct SourceHashes {
    cache: Mutex<HashMap<PathBuf, (FileStamp, String)>>,
}

impl SourceHashes {
    fn hash(&self, path: &Path) -> io::Result<String> {
        let stamp = FileStamp::of(path)?;
        if let Some((cached, hash)) = self.lock().get(path)
            && *cached == stamp
        {
            return Ok(hash.clone());
        }
        let hash = hash_file(path)?;
        self.lock().insert(path.to_path_buf(), (stamp, hash.clone()));
        Ok(hash)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, (FileStamp, String)>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<B: ImageBackend> DiskVariantStore<B> {
    /// A store that trusts any existing variant file.
    pub fn new(backend: B, quality: Quality) -> Self {
        Self {
            backend,
            quality,
            verification: None,
        }
    }

    /// Track generated variants in a manifest under `dir` and regenerate
    /// them when their source changes.
    pub fn with_manifest(mut self, dir: &Path) -> Self {
        self.verification = Some(Verification {
            dir: dir.to_path_buf(),
            manifest: Mutex::new(VariantManifest::load(dir)),
            sources: SourceHashes::default(),
        });
        self
    }

    /// Store configured from `[images]`, keeping its manifest in the uploads
    /// directory.
    pub fn from_config(backend: B, config: &MediaConfig) -> Self {
        let store = Self::new(backend, Quality::new(config.images.quality));
        if config.images.verify_sources {
            store.with_manifest(&config.library.uploads_dir)
        } else {
            store
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether an existing variant file can be served as-is.
    fn is_fresh(&self, source: &Path, output: &Path, params_hash: &str) -> bool {
        let Some(verification) = &self.verification else {
            return true;
        };
        let Some(entry) = lock(&verification.manifest)
            .entries
            .get(&output.to_string_lossy().into_owned())
            .cloned()
        else {
            return true;
        };
        match verification.sources.hash(source) {
            Ok(source_hash) => entry.source_hash == source_hash && entry.params_hash == params_hash,
            Err(_) => true,
        }
    }

    fn remember(&self, source: &Path, output: &Path, params_hash: String) {
        let Some(verification) = &self.verification else {
            return;
        };
        let source_hash = match verification.sources.hash(source) {
            Ok(h) => h,
            Err(e) => {
                warn!(source = %source.display(), error = %e, "cannot hash variant source");
                return;
            }
        };
        let mut manifest = lock(&verification.manifest);
        manifest.entries.insert(
            output.to_string_lossy().into_owned(),
            ManifestEntry {
                source_hash,
                params_hash,
            },
        );
        if let Err(e) = manifest.save(&verification.dir) {
            warn!(dir = %verification.dir.display(), error = %e, "cannot save variant manifest");
        }
    }
}

fn lock(manifest: &Mutex<VariantManifest>) -> MutexGuard<'_, VariantManifest> {
    manifest.lock().unwrap_or_else(|e| e.into_inner())
}

impl<B: ImageBackend> VariantStore for DiskVariantStore<B> {
    fn get_or_generate(&self, source: &SourceFile<'_>, request: VariantRequest) -> Option<Variant> {
        let key = request.key();
        let output = variant_path(source.path, &key);
        let file_name = output.file_name()?.to_string_lossy().into_owned();
        let variant = Variant {
            url: with_file_name(source.url, &file_name),
            path: output.clone(),
            key,
            width: request.width,
            height: request.height,
        };
        let params_hash = hash_variant_params(request, self.quality);

        if output.exists() {
            if self.is_fresh(source.path, &output, &params_hash) {
                debug!(variant = %output.display(), "reusing variant");
                return Some(variant);
            }
            debug!(variant = %output.display(), "source changed, regenerating variant");
        }

        let params = ResizeParams {
            source: source.path.to_path_buf(),
            output: output.clone(),
            width: request.width,
            height: request.height,
            crop: request.crop,
            quality: self.quality,
        };
        match self.backend.resize(&params) {
            Ok(dims) => {
                debug!(variant = %output.display(), width = dims.width, height = dims.height, "generated variant");
                self.remember(source.path, &output, params_hash);
                Some(Variant {
                    width: dims.width,
                    height: dims.height,
                    ..variant
                })
            }
            Err(e) => {
                warn!(source = %source.path.display(), key = %variant.key, error = %e, "variant generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use std::fs;
    use tempfile::TempDir;

    fn source_in(tmp: &TempDir) -> PathBuf {
        let path = tmp.path().join("photo.jpg");
        fs::write(&path, b"original bytes").unwrap();
        path
    }

    // =========================================================================
    // Paths and keys
    // =========================================================================

    #[test]
    fn variant_path_sits_beside_source() {
        assert_eq!(
            variant_path(Path::new("/up/2024/photo.jpg"), &SizeKey::resized(400, 200)),
            PathBuf::from("/up/2024/photo-resized-400x200.jpg")
        );
        assert_eq!(
            variant_path(Path::new("/up/raw"), &SizeKey::resized(1, 2)),
            PathBuf::from("/up/raw-resized-1x2")
        );
    }

    #[test]
    fn size_entry_is_relative() {
        let variant = Variant {
            key: SizeKey::resized(40, 20),
            path: PathBuf::from("/up/2024/photo-resized-40x20.png"),
            url: "/uploads/2024/photo-resized-40x20.png".into(),
            width: 40,
            height: 20,
        };
        let entry = variant.size_entry();
        assert_eq!(entry.file, "photo-resized-40x20.png");
        assert_eq!(entry.mime_type.as_deref(), Some("image/png"));
    }

    // =========================================================================
    // get_or_generate
    // =========================================================================

    #[test]
    fn generates_once_then_reuses() {
        let tmp = TempDir::new().unwrap();
        let path = source_in(&tmp);
        let source = SourceFile {
            path: &path,
            url: "/uploads/photo.jpg",
        };
        let store = DiskVariantStore::new(MockBackend::new(), Quality::new(80));

        let first = store
            .get_or_generate(&source, VariantRequest::resize(400, 200))
            .unwrap();
        let second = store
            .get_or_generate(&source, VariantRequest::resize(400, 200))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.url, "/uploads/photo-resized-400x200.jpg");
        assert_eq!(first.key.to_string(), "resized-400x200");
        assert_eq!(store.backend().resize_count(), 1);
    }

    #[test]
    fn crop_flag_reaches_backend() {
        let tmp = TempDir::new().unwrap();
        let path = source_in(&tmp);
        let source = SourceFile {
            path: &path,
            url: "/photo.jpg",
        };
        let store = DiskVariantStore::new(MockBackend::new(), Quality::default());

        store.get_or_generate(&source, VariantRequest::crop(50, 50));

        assert!(matches!(
            &store.backend().get_operations()[0],
            RecordedOp::Resize {
                crop: true,
                width: 50,
                height: 50,
                quality: 90,
                ..
            }
        ));
    }

    #[test]
    fn backend_failure_is_a_sentinel() {
        let tmp = TempDir::new().unwrap();
        let path = source_in(&tmp);
        let source = SourceFile {
            path: &path,
            url: "/photo.jpg",
        };
        let store = DiskVariantStore::new(MockBackend::failing(), Quality::default());

        assert_eq!(
            store.get_or_generate(&source, VariantRequest::resize(10, 5)),
            None
        );
    }

    #[test]
    fn unverified_store_reuses_after_source_change() {
        let tmp = TempDir::new().unwrap();
        let path = source_in(&tmp);
        let source = SourceFile {
            path: &path,
            url: "/photo.jpg",
        };
        let store = DiskVariantStore::new(MockBackend::new(), Quality::default());

        store.get_or_generate(&source, VariantRequest::resize(10, 5));
        fs::write(&path, b"edited bytes").unwrap();
        store.get_or_generate(&source, VariantRequest::resize(10, 5));

        assert_eq!(store.backend().resize_count(), 1);
    }

    #[test]
    fn verified_store_regenerates_after_source_change() {
        let tmp = TempDir::new().unwrap();
        let path = source_in(&tmp);
        let source = SourceFile {
            path: &path,
            url: "/photo.jpg",
        };
        let store =
            DiskVariantStore::new(MockBackend::new(), Quality::default()).with_manifest(tmp.path());

        store.get_or_generate(&source, VariantRequest::resize(10, 5));
        store.get_or_generate(&source, VariantRequest::resize(10, 5));
        assert_eq!(store.backend().resize_count(), 1);

        fs::write(&path, b"edited bytes").unwrap();
        store.get_or_generate(&source, VariantRequest::resize(10, 5));
        assert_eq!(store.backend().resize_count(), 2);
    }

    #[test]
    fn verified_store_reuses_unknown_files() {
        let tmp = TempDir::new().unwrap();
        let path = source_in(&tmp);
        fs::write(tmp.path().join("photo-resized-10x5.jpg"), b"").unwrap();
        let source = SourceFile {
            path: &path,
            url: "/photo.jpg",
        };
        let store =
            DiskVariantStore::new(MockBackend::new(), Quality::default()).with_manifest(tmp.path());

        assert!(
            store
                .get_or_generate(&source, VariantRequest::resize(10, 5))
                .is_some()
        );
        assert_eq!(store.backend().resize_count(), 0);
    }

    #[test]
    fn manifest_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = source_in(&tmp);
        let source = SourceFile {
            path: &path,
            url: "/photo.jpg",
        };
        DiskVariantStore::new(MockBackend::new(), Quality::default())
            .with_manifest(tmp.path())
            .get_or_generate(&source, VariantRequest::resize(10, 5));

        fs::write(&path, b"edited bytes").unwrap();
        let reopened =
            DiskVariantStore::new(MockBackend::new(), Quality::default()).with_manifest(tmp.path());
        reopened.get_or_generate(&source, VariantRequest::resize(10, 5));
        assert_eq!(reopened.backend().resize_count(), 1);
    }

    // =========================================================================
    // Manifest and hashes
    // =========================================================================

    #[test]
    fn load_corrupt_manifest_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILENAME), "not json").unwrap();
        assert!(VariantManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"version": {}, "entries": {{"a": {{"source_hash":"h","params_hash":"p"}}}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(tmp.path().join(MANIFEST_FILENAME), json).unwrap();
        assert!(VariantManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn hash_file_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");

        fs::write(&path, b"version 1").unwrap();
        let h1 = hash_file(&path).unwrap();
        fs::write(&path, b"version 2").unwrap();
        let h2 = hash_file(&path).unwrap();

        assert_ne!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn source_hash_is_reused_while_stamp_matches() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        fs::write(&path, b"aaaa").unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        let hashes = SourceHashes::default();
        let first = hashes.hash(&path).unwrap();

        // Same length and mtime: the cached hash is served without reading
        fs::write(&path, b"bbbb").unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
        assert_eq!(hashes.hash(&path).unwrap(), first);

        fs::write(&path, b"bbbbb").unwrap();
        assert_ne!(hashes.hash(&path).unwrap(), first);
        assert_eq!(hashes.hash(&path).unwrap(), hash_file(&path).unwrap());
    }

    #[test]
    fn source_hash_of_missing_file_errors() {
        let tmp = TempDir::new().unwrap();
        let hashes = SourceHashes::default();
        assert!(hashes.hash(&tmp.path().join("gone.jpg")).is_err());
    }

    #[test]
    fn params_hash_varies_with_every_input() {
        let base = hash_variant_params(VariantRequest::resize(400, 200), Quality::new(90));
        assert_eq!(
            base,
            hash_variant_params(VariantRequest::resize(400, 200), Quality::new(90))
        );
        assert_ne!(
            base,
            hash_variant_params(VariantRequest::resize(401, 200), Quality::new(90))
        );
        assert_ne!(
            base,
            hash_variant_params(VariantRequest::crop(400, 200), Quality::new(90))
        );
        assert_ne!(
            base,
            hash_variant_params(VariantRequest::resize(400, 200), Quality::new(80))
        );
    }
}
