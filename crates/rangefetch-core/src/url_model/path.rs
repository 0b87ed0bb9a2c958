//! Filename extraction from a URL path.

/// Last non-empty segment of `path`, or `None` for `/`, empty paths and
/// `.`/`..`.
pub fn filename_from_url_path(path: &str) -> Option<String> {
    let segment = path.rsplit('/').find(|s| !s.is_empty())?;
    match segment {
        "." | ".." => None,
        s => Some(s.to_string()),
    }
}
