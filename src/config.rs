//! Media configuration module.
//!
//! Handles loading, validating, and merging `respimg.toml`. Stock defaults are
//! overridden by whatever keys the user file sets; everything else keeps its
//! default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [lazy]
//! enabled = false           # Lazy-load images that don't choose explicitly
//! class = "lazyload"        # Class appended to lazy images
//!
//! [theme]
//! dir = "theme"             # Theme root on disk
//! url = "/theme"            # Public URL of the theme root
//! image_path = "images"     # Media directory inside the theme
//!
//! [library]
//! uploads_dir = "uploads"   # Attachment files + attachments.json
//! uploads_url = "/uploads"  # Public URL of uploads_dir
//!
//! [images]
//! quality = 90              # Encoding quality for generated variants (1-100)
//! max_srcset_width = 2048   # Widest candidate listed in srcset
//! verify_sources = true     # Regenerate variants whose source changed
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Media configuration loaded from `respimg.toml`.
///
/// This replaces the global lazy flag/class and path settings a CMS would keep
/// in mutable statics: it is built once and handed to
/// [`Media`](crate::Media) at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    /// Lazy-loading defaults.
    pub lazy: LazyConfig,
    /// Where theme-relative images live.
    pub theme: ThemeConfig,
    /// Where attachments live.
    pub library: LibraryConfig,
    /// Variant generation and srcset settings.
    pub images: ImagesConfig,
}

impl MediaConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality == 0 || self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.max_srcset_width == 0 {
            return Err(ConfigError::Validation(
                "images.max_srcset_width must be non-zero".into(),
            ));
        }
        if self.lazy.class.is_empty() || self.lazy.class.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "lazy.class must be a single class name".into(),
            ));
        }
        Ok(())
    }

    /// Resolve relative directories against `base` (the config file's
    /// directory), leaving absolute ones untouched.
    pub fn rebase(mut self, base: &Path) -> Self {
        if self.theme.dir.is_relative() {
            self.theme.dir = base.join(&self.theme.dir);
        }
        if self.library.uploads_dir.is_relative() {
            self.library.uploads_dir = base.join(&self.library.uploads_dir);
        }
        self
    }
}

/// Lazy-loading defaults.
///
/// An [`Image`](crate::Image) whose lazy flag was never set inherits
/// `enabled`; an explicit `lazy(true)`/`lazy(false)` always wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LazyConfig {
    pub enabled: bool,
    /// Class appended to lazily loaded images (the hook for the loader script).
    pub class: String,
}

impl Default for LazyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            class: "lazyload".to_string(),
        }
    }
}

/// Theme location for path-sourced images.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub dir: PathBuf,
    pub url: String,
    /// Media directory inside the theme. Empty means the theme root.
    pub image_path: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("theme"),
            url: "/theme".to_string(),
            image_path: "images".to_string(),
        }
    }
}

/// Attachment storage location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LibraryConfig {
    pub uploads_dir: PathBuf,
    pub uploads_url: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            uploads_url: "/uploads".to_string(),
        }
    }
}

/// Variant generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Encoding quality for generated variants (1 = worst, 100 = best).
    pub quality: u32,
    /// Candidates wider than this are left out of `srcset`.
    pub max_srcset_width: u32,
    /// Hash sources so variants are regenerated after the source changes.
    pub verify_sources: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            max_srcset_width: 2048,
            verify_sources: true,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(MediaConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<MediaConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: MediaConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// A missing file yields the stock defaults. Relative directories in the
/// result are anchored at the file's parent directory.
pub fn load_config(path: &Path) -> Result<MediaConfig, ConfigError> {
    let base = path.parent().unwrap_or(Path::new("."));
    if !path.exists() {
        return Ok(resolve_config(None)?.rebase(base));
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(resolve_config(Some(value))?.rebase(base))
}

/// Returns a fully-commented stock `respimg.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# respimg configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Relative paths are resolved against
# the directory containing this file. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Lazy loading
# ---------------------------------------------------------------------------
[lazy]
# Images that never call lazy(true/false) follow this flag. Lazy images
# render data-src instead of src.
enabled = false

# Class appended to lazy images, for the front-end loader to pick up.
class = "lazyload"

# ---------------------------------------------------------------------------
# Theme images (sources given as relative paths)
# ---------------------------------------------------------------------------
[theme]
dir = "theme"
url = "/theme"
# Media directory inside the theme; "" means the theme root.
image_path = "images"

# ---------------------------------------------------------------------------
# Media library (sources given as attachment ids)
# ---------------------------------------------------------------------------
[library]
# Holds the attachment files and the attachments.json index.
uploads_dir = "uploads"
uploads_url = "/uploads"

# ---------------------------------------------------------------------------
# Variants and srcset
# ---------------------------------------------------------------------------
[images]
# Encoding quality for generated variants (1 = worst, 100 = best).
quality = 90

# Candidates wider than this are left out of srcset.
max_srcset_width = 2048

# Remember a hash of each variant's source and regenerate the variant
# when the source file changes.
verify_sources = true
"##
}
