//! CLI output formatting.
//!
//! Output is **attachment-centric**: every line block leads with the
//! attachment id and its file, with sizes and variant outcomes as indented
//! context lines.
//!
//! # Output Format
//!
//! ## Scan / register
//!
//! ```text
//! #1 2024/photo.jpg (1000x500)
//! #2 logo.svg (120x40)
//!
//! Registered 2 attachments
//! ```
//!
//! ## Warm
//!
//! ```text
//! #1 /uploads/2024/photo.jpg
//!     400w: resized-400x200 → /uploads/2024/photo-resized-400x200.jpg
//!     1200w: skipped (not smaller than the original)
//! #2 /uploads/logo.svg
//!     400w: skipped (vector image)
//!
//! Warmed 1 variant, 0 failed
//! ```
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::fs_library::AttachmentRecord;
use crate::library::AttachmentId;
use crate::warm::{WarmReport, WarmStatus};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an attachment header line.
///
/// ```text
/// #12 2024/photo.jpg (1000x500)
/// ```
fn attachment_line(id: AttachmentId, record: &AttachmentRecord) -> String {
    format!(
        "#{} {} ({}x{})",
        id, record.file, record.width, record.height
    )
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

// ============================================================================
// Scan / register
// ============================================================================

/// Format newly registered attachments with a summary line.
pub fn format_registered(attachments: &[(AttachmentId, AttachmentRecord)]) -> Vec<String> {
    let mut lines: Vec<String> = attachments
        .iter()
        .map(|(id, record)| attachment_line(*id, record))
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!("Registered {}", plural(attachments.len(), "attachment")));
    lines
}

pub fn print_registered(attachments: &[(AttachmentId, AttachmentRecord)]) {
    for line in format_registered(attachments) {
        println!("{}", line);
    }
}

// ============================================================================
// Warm
// ============================================================================

fn status_text(status: &WarmStatus) -> String {
    match status {
        WarmStatus::Ready { key, url } => format!("{} → {}", key, url),
        WarmStatus::Failed => "failed".to_string(),
        WarmStatus::Skipped(reason) => format!("skipped ({})", reason),
    }
}

/// Format warm results: one block per attachment, then totals.
pub fn format_warm_output(reports: &[WarmReport]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut ready = 0;
    let mut failed = 0;

    for report in reports {
        lines.push(format!("#{} {}", report.id, report.url));
        for variant in &report.variants {
            match variant.status {
                WarmStatus::Ready { .. } => ready += 1,
                WarmStatus::Failed => failed += 1,
                WarmStatus::Skipped(_) => {}
            }
            lines.push(format!(
                "{}{}w: {}",
                indent(1),
                variant.width,
                status_text(&variant.status)
            ));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!("Warmed {}, {} failed", plural(ready, "variant"), failed));
    lines
}

pub fn print_warm_output(reports: &[WarmReport]) {
    for line in format_warm_output(reports) {
        println!("{}", line);
    }
}
