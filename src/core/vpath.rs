//! Virtual-path utilities for backend paths.
//!
//! Backend paths are plain strings with `/` separators (e.g. `"C/docs/"`),
//! not host filesystem paths. Every function here is pure and total: any
//! input string is accepted, backslashes are treated as separators, and runs
//! of separators collapse to one.

/// Canonicalize a virtual path: backslashes become forward slashes and any
/// run of separators collapses to a single one.
#[must_use]
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_sep = false;
    for ch in path.chars() {
        let is_sep = ch == '/' || ch == '\\';
        if is_sep {
            if !prev_sep {
                out.push('/');
            }
        } else {
            out.push(ch);
        }
        prev_sep = is_sep;
    }
    out
}

/// Append `name` to `base` with exactly one separator between them.
///
/// The result is normalized whenever `base` was.
#[must_use]
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        return name.to_string();
    }
    if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Split a path into its non-empty segments.
///
/// Both `"a/b/"` and `"/a/b"` yield `["a", "b"]`.
#[must_use]
pub fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Ensure a normalized path carries a trailing separator, marking it as
/// "inside this folder".
#[must_use]
pub fn with_trailing_sep(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Rebuild a folder path from the first `count` segments, with trailing
/// separator. Used by breadcrumb and parent navigation.
#[must_use]
pub fn truncate_to_segments(path: &str, count: usize) -> String {
    let mut out = segments(path)
        .into_iter()
        .take(count)
        .collect::<Vec<_>>()
        .join("/");
    out.push('/');
    out
}

/// Compare two paths for identity, ignoring separator style, duplicate
/// separators, and a trailing separator.
#[must_use]
pub fn same_location(left: &str, right: &str) -> bool {
    let l = normalize(left);
    let r = normalize(right);
    l.trim_end_matches('/') == r.trim_end_matches('/')
}
