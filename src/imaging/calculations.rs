//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `original` so its width becomes `width`, preserving aspect ratio.
///
/// Returns `None` when either the target or the original has a zero edge,
/// since no ratio can be derived.
///
/// # Examples
/// ```
/// # use respimg::imaging::scale_to_width;
/// // 1000x500 at width 400 → 400x200
/// assert_eq!(scale_to_width((1000, 500), 400), Some((400, 200)));
/// ```
pub fn scale_to_width(original: (u32, u32), width: u32) -> Option<(u32, u32)> {
    let (orig_w, orig_h) = original;
    if width == 0 || orig_w == 0 || orig_h == 0 {
        return None;
    }
    let height = (width as f64 * orig_h as f64 / orig_w as f64).round() as u32;
    Some((width, height.max(1)))
}

/// Scale `original` so its height becomes `height`, preserving aspect ratio.
///
/// # Examples
/// ```
/// # use respimg::imaging::scale_to_height;
/// // 1000x500 at height 100 → 200x100
/// assert_eq!(scale_to_height((1000, 500), 100), Some((200, 100)));
/// ```
pub fn scale_to_height(original: (u32, u32), height: u32) -> Option<(u32, u32)> {
    let (orig_w, orig_h) = original;
    if height == 0 || orig_w == 0 || orig_h == 0 {
        return None;
    }
    let width = (height as f64 * orig_w as f64 / orig_h as f64).round() as u32;
    Some((width.max(1), height))
}

/// Whether `candidate` has the same aspect ratio as `source`.
///
/// The source is scaled to the candidate's width and compared on height with
/// a one pixel tolerance, absorbing the rounding done when the candidate was
/// produced.
pub fn matches_ratio(source: (u32, u32), candidate: (u32, u32)) -> bool {
    let (cand_w, cand_h) = candidate;
    match scale_to_width(source, cand_w) {
        Some((_, expected_h)) => expected_h.abs_diff(cand_h) <= 1,
        None => false,
    }
}
