//! Size requests and size keys.
//!
//! A [`SizeSpec`] is what a caller asks for; a [`SizeKey`] is what the media
//! library and variant store know an image by once the request is resolved.
//! `Width(400)` on a 1000×500 image resolves to `SizeKey::Resized { 400, 200 }`,
//! displayed as `resized-400x200`. That string names the variant file on disk
//! and its entry in attachment metadata.

use std::fmt;
use std::str::FromStr;

/// Prefix of generated variant size keys.
pub const RESIZED_PREFIX: &str = "resized-";

/// Requested display size of an image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SizeSpec {
    /// The original upload.
    #[default]
    Full,
    /// A size the media library already knows by name (e.g. `thumbnail`).
    Named(String),
    /// Scale to this pixel width, height follows the aspect ratio.
    Width(u32),
    /// Scale to this pixel height, width follows the aspect ratio.
    Height(u32),
    /// Fill-resize and centre-crop to exactly this box.
    Crop { width: u32, height: u32 },
}

impl From<u32> for SizeSpec {
    fn from(width: u32) -> Self {
        SizeSpec::Width(width)
    }
}

impl From<&str> for SizeSpec {
    /// `"full"` is the original, a positive integer is a pixel width,
    /// anything else is a named size.
    fn from(value: &str) -> Self {
        match value.parse::<u32>() {
            Ok(width) if width > 0 => SizeSpec::Width(width),
            _ if value == "full" => SizeSpec::Full,
            _ => SizeSpec::Named(value.to_string()),
        }
    }
}

/// Resolved identity of a size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SizeKey {
    #[default]
    Full,
    Named(String),
    Resized { width: u32, height: u32 },
}

impl SizeKey {
    pub fn resized(width: u32, height: u32) -> Self {
        SizeKey::Resized { width, height }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, SizeKey::Full)
    }
}

impl fmt::Display for SizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeKey::Full => write!(f, "full"),
            SizeKey::Named(name) => write!(f, "{}", name),
            SizeKey::Resized { width, height } => {
                write!(f, "{}{}x{}", RESIZED_PREFIX, width, height)
            }
        }
    }
}

impl FromStr for SizeKey {
    type Err = std::convert::Infallible;

    /// Every string is a valid key; only `full` and well-formed
    /// `resized-WxH` strings are recognised specially.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "full" {
            return Ok(SizeKey::Full);
        }
        Ok(parse_resized(s).unwrap_or_else(|| SizeKey::Named(s.to_string())))
    }
}

fn parse_resized(s: &str) -> Option<SizeKey> {
    let dims = s.strip_prefix(RESIZED_PREFIX)?;
    let (w, h) = dims.split_once('x')?;
    Some(SizeKey::Resized {
        width: w.parse().ok()?,
        height: h.parse().ok()?,
    })
}

/// Split a file stem into its base stem and variant key, if it carries one
/// (`photo-resized-400x200` → `("photo", 400x200)`).
pub fn split_variant_stem(stem: &str) -> Option<(&str, SizeKey)> {
    let idx = stem.rfind(&format!("-{}", RESIZED_PREFIX))?;
    let key = parse_resized(&stem[idx + 1..])?;
    Some((&stem[..idx], key))
}
