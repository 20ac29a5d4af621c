//! Intrinsic size of SVG documents.
//!
//! Vector images have no pixel grid to probe, so their display size comes from
//! the root element: explicit `width`/`height` attributes first, then the
//! `viewBox` extent. Percentages carry no intrinsic size and are rejected.

use super::backend::Dimensions;

/// Read the intrinsic dimensions of an SVG document.
///
/// Returns `None` when the text is not an SVG document or declares no usable
/// size. Fractional sizes are rounded to whole pixels.
pub fn svg_dimensions(text: &str) -> Option<Dimensions> {
    let doc = roxmltree::Document::parse(text).ok()?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return None;
    }

    let width = root.attribute("width").and_then(parse_length);
    let height = root.attribute("height").and_then(parse_length);
    let (w, h) = match (width, height) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => (w, h),
        _ => root
            .attribute("viewBox")
            .and_then(parse_viewbox)
            .filter(|(w, h)| *w > 0.0 && *h > 0.0)?,
    };

    Some(Dimensions {
        width: w.round() as u32,
        height: h.round() as u32,
    })
}

fn parse_viewbox(value: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect();
    match parts.as_slice() {
        [_, _, w, h] => Some((w.parse().ok()?, h.parse().ok()?)),
        _ => None,
    }
}

/// Parse an SVG length, dropping any unit suffix (`px`, `pt`, `mm`, …).
fn parse_length(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.ends_with('%') {
        return None;
    }
    let numeric = trimmed
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim();
    if numeric.is_empty() {
        return None;
    }
    numeric.parse::<f64>().ok()
}
