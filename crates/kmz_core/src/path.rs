//! Archive-relative path handling.
//!
//! Paths are plain strings with `/` separators. Resolution is textual only:
//! there is no filesystem access, no case folding and no check that the
//! result names a real archive entry.

const PARENT_SEGMENT: &str = "../";

/// Resolve `href` against `parent_path`, the directory of the referencing
/// document.
///
/// `parent_path` is expected to be empty or to end in `/`; plain hrefs are
/// appended to it without inserting a separator. Hrefs that start with one or
/// more `../` segments drop that many trailing segments from `parent_path`.
///
/// Climbing above the archive root does not fail: the prefix collapses to
/// nothing and the result starts with `/`, which matches no archive entry.
///
/// ```
/// use kmz_core::resolve_path;
///
/// assert_eq!(resolve_path("a/b/", "c.kml"), "a/b/c.kml");
/// assert_eq!(resolve_path("a/b/c/", "../d.kml"), "a/b/d.kml");
/// assert_eq!(resolve_path("a/", "../../x.kml"), "/x.kml");
/// ```
pub fn resolve_path(parent_path: &str, href: &str) -> String {
    if !href.starts_with(PARENT_SEGMENT) {
        return format!("{parent_path}{href}");
    }

    let mut levels_up = 0usize;
    let mut rest = href;
    while let Some(stripped) = rest.strip_prefix(PARENT_SEGMENT) {
        levels_up += 1;
        rest = stripped;
    }

    let segments: Vec<&str> = parent_path.split('/').filter(|s| !s.is_empty()).collect();
    let keep = segments.len().saturating_sub(levels_up);
    format!("{}/{}", segments[..keep].join("/"), rest)
}

/// Directory portion of an archive path: everything up to and including the
/// last `/`, or the empty string for paths at the archive root.
pub fn directory_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

/// Normalize a raw zip entry name into the archive path form: forward
/// slashes, no leading slash.
pub fn normalize_entry_name(raw: &str) -> String {
    let forward = raw.replace('\\', "/");
    match forward.strip_prefix('/') {
        Some(stripped) => stripped.to_string(),
        None => forward,
    }
}
