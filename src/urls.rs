//! Small helpers for public URLs of media files.

/// Join URL segments with exactly one slash between them. Empty segments are
/// skipped.
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(segment);
    }
    url
}

/// Replace the last path segment of `url` with `file_name`.
pub fn with_file_name(url: &str, file_name: &str) -> String {
    match url.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, file_name),
        None => file_name.to_string(),
    }
}

/// Directory part of a relative file path using `/` separators (`""` for
/// top-level files).
pub fn parent_dir(relative: &str) -> &str {
    relative.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}
