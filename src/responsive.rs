//! Responsive `srcset`/`sizes` inputs.
//!
//! A list of [`Breakpoint`]s turns into one variant per breakpoint plus the
//! image's current size as the default. The variants become the candidate
//! list handed to the media library's `srcset` algorithm, and the breakpoints
//! become the `sizes` attribute:
//!
//! ```text
//! breakpoints [(600, 300), (900, 600)], default 1200px wide
//!
//! (max-width: 600px) 300px,
//! (max-width: 900px) 600px,
//! 1200px
//! ```

use crate::imaging::{Dimensions, scale_to_height, scale_to_width};
use crate::library::{SrcsetCandidate, SrcsetOverride};
use crate::variants::{SourceFile, Variant, VariantRequest, VariantStore};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// A viewport threshold and the display size used below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    /// Viewport width in CSS pixels.
    pub max_width: u32,
    /// Display size in pixels along the image's orientation (width unless the
    /// image was sized by height).
    pub width: u32,
}

impl Breakpoint {
    pub fn new(max_width: u32, width: u32) -> Self {
        Self { max_width, width }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.max_width, self.width)
    }
}

impl FromStr for Breakpoint {
    type Err = String;

    /// Parse `MAX=WIDTH`, e.g. `600=300`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (max_width, width) = s
            .split_once('=')
            .ok_or_else(|| format!("expected MAX=WIDTH, got '{s}'"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| format!("'{v}' is not a pixel size"))
        };
        Ok(Self::new(parse(max_width)?, parse(width)?))
    }
}

/// Which edge a pixel size constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Width,
    Height,
}

impl Orientation {
    /// Scale `full` so the oriented edge equals `edge`.
    pub fn scale(self, full: Dimensions, edge: u32) -> Option<(u32, u32)> {
        match self {
            Orientation::Width => scale_to_width(full.as_tuple(), edge),
            Orientation::Height => scale_to_height(full.as_tuple(), edge),
        }
    }
}

/// One image of a responsive set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsiveEntry {
    /// `None` for the default entry.
    pub max_width: Option<u32>,
    pub candidate: SrcsetCandidate,
}

/// Breakpoint variants followed by the default entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsiveSet {
    pub entries: Vec<ResponsiveEntry>,
    /// Variants backing the breakpoint entries, for metadata bookkeeping.
    pub variants: Vec<Variant>,
}

impl ResponsiveSet {
    /// Generate a variant per breakpoint and append `default`.
    ///
    /// Breakpoints whose variant cannot be produced are left out.
    pub fn build(
        full: Dimensions,
        orientation: Orientation,
        breakpoints: &[Breakpoint],
        default: SrcsetCandidate,
        source: &SourceFile<'_>,
        store: &impl VariantStore,
    ) -> Self {
        let mut entries = Vec::with_capacity(breakpoints.len() + 1);
        let mut variants = Vec::with_capacity(breakpoints.len());
        for bp in breakpoints {
            let Some((width, height)) = orientation.scale(full, bp.width) else {
                warn!(breakpoint = %bp, "breakpoint has no usable size, skipping");
                continue;
            };
            let Some(variant) = store.get_or_generate(source, VariantRequest::resize(width, height))
            else {
                continue;
            };
            entries.push(ResponsiveEntry {
                max_width: Some(bp.max_width),
                candidate: SrcsetCandidate {
                    key: variant.key.clone(),
                    url: variant.url.clone(),
                    width: variant.width,
                    height: variant.height,
                },
            });
            variants.push(variant);
        }
        entries.push(ResponsiveEntry {
            max_width: None,
            candidate: default,
        });
        Self { entries, variants }
    }

    /// The `sizes` attribute value.
    pub fn sizes(&self) -> String {
        sizes_descriptor(&self.entries)
    }

    /// Candidates and `sizes` for a single library `srcset`/`sizes` call.
    pub fn to_override(&self) -> SrcsetOverride {
        SrcsetOverride {
            candidates: self
                .entries
                .iter()
                .map(|e| e.candidate.clone())
                .collect(),
            sizes: self.sizes(),
        }
    }
}

/// Media-query list for a responsive set: every entry but the last carries
/// its `max-width` query, the last is the unconditional default.
pub fn sizes_descriptor(entries: &[ResponsiveEntry]) -> String {
    let Some((last, rest)) = entries.split_last() else {
        return String::new();
    };
    let mut parts: Vec<String> = rest
        .iter()
        .map(|e| match e.max_width {
            Some(bp) => format!("(max-width: {}px) {}px", bp, e.candidate.width),
            None => format!("{}px", e.candidate.width),
        })
        .collect();
    parts.push(format!("{}px", last.candidate.width));
    parts.join(",\n")
}
