//! Store-relative name handling shared by the path-based backends.

/// Split a store-relative name into its path segments.
///
/// Empty and `.` segments are dropped, so `/a//./b` and `a/b` resolve the
/// same way a plain path join would. Returns `None` if any segment is `..`:
/// names may never climb out of the store's root.
pub fn segments(name: &str) -> Option<Vec<&str>> {
    let mut out = Vec::new();
    for seg in name.split(is_separator) {
        match seg {
            "" | "." => continue,
            ".." => return None,
            seg => out.push(seg),
        }
    }
    Some(out)
}

fn is_separator(c: char) -> bool {
    c == '/' || c == std::path::MAIN_SEPARATOR
}
