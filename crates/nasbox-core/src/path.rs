//! Logical path rules.
//!
//! A logical path is relative to an owner root, forward-slash separated,
//! with no leading or trailing slash. The empty string is the owner root
//! itself. Every layer (resolver, metadata stores, services) relies on the
//! helpers here so that prefix and depth checks agree everywhere.

use crate::error::AppError;
use crate::result::AppResult;

/// Normalize a caller-supplied path into canonical logical form.
///
/// Leading slashes are treated as "relative to the owner root". `.` and
/// empty segments are dropped and `..` pops a segment. A `..` that would
/// climb above the root fails with `InvalidPath`, as does a NUL byte.
pub fn normalize(raw: &str) -> AppResult<String> {
    if raw.contains('\0') {
        return Err(AppError::invalid_path("Path contains a NUL byte"));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(AppError::invalid_path(format!(
                        "Path escapes the owner root: {raw}"
                    )));
                }
            }
            other => segments.push(other),
        }
    }

    Ok(segments.join("/"))
}

/// Join a normalized parent and a single child name.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent of a normalized path (`""` for top-level entries and the root).
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
}

/// Last segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, n)| n).unwrap_or(path)
}

/// Whether `path` is `prefix` itself or lies beneath it.
pub fn is_within(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

/// Whether `path` lies strictly beneath `prefix`.
pub fn is_descendant(prefix: &str, path: &str) -> bool {
    path != prefix && is_within(prefix, path)
}

/// Whether `path` is an immediate child of `parent_path`.
pub fn is_immediate_child(parent_path: &str, path: &str) -> bool {
    !path.is_empty() && is_descendant(parent_path, path) && parent(path) == parent_path
}

/// Replace the `old_prefix` head of `path` with `new_prefix`.
///
/// Returns `None` when `path` is not within `old_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_within(old_prefix, path) {
        return None;
    }
    let tail = path[old_prefix.len()..].trim_start_matches('/');
    Some(match (new_prefix.is_empty(), tail.is_empty()) {
        (_, true) => new_prefix.to_string(),
        (true, false) => tail.to_string(),
        (false, false) => format!("{new_prefix}/{tail}"),
    })
}

/// Validate a single entry name (file or folder), returning it trimmed.
pub fn validate_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Name must not be empty"));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(AppError::invalid_path(format!("Invalid name: {trimmed}")));
    }
    if trimmed.contains(['/', '\\', '\0']) {
        return Err(AppError::invalid_path(format!(
            "Name must not contain path separators: {trimmed}"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_normalize_collapses_segments() {
        assert_eq!(normalize("/docs//2024/./report.pdf").unwrap(), "docs/2024/report.pdf");
        assert_eq!(normalize("a/b/../c/").unwrap(), "a/c");
        assert_eq!(normalize("").unwrap(), "");
        assert_eq!(normalize("/").unwrap(), "");
    }

    #[test]
    fn test_normalize_rejects_escape() {
        for raw in ["..", "../x", "a/../../x", "/../etc/passwd", "a\\..\\..\\b"] {
            let err = normalize(raw).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidPath, "{raw}");
        }
    }

    #[test]
    fn test_prefix_helpers() {
        assert!(is_within("", "anything"));
        assert!(is_within("docs", "docs"));
        assert!(is_within("docs", "docs/a.txt"));
        assert!(!is_within("docs", "docs2/a.txt"));
        assert!(is_immediate_child("docs", "docs/a.txt"));
        assert!(!is_immediate_child("docs", "docs/sub/a.txt"));
        assert!(is_immediate_child("", "a.txt"));
        assert!(!is_immediate_child("", ""));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("a/b/c.txt", "a/b", "x").as_deref(), Some("x/c.txt"));
        assert_eq!(rebase("a/b", "a/b", "x/y").as_deref(), Some("x/y"));
        assert_eq!(rebase("a/b/c", "a", "").as_deref(), Some("b/c"));
        assert_eq!(rebase("ab/c", "a", "z"), None);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  photos ").unwrap(), "photos");
        assert_eq!(validate_name("   ").unwrap_err().kind, ErrorKind::Validation);
        assert_eq!(validate_name("a/b").unwrap_err().kind, ErrorKind::InvalidPath);
        assert_eq!(validate_name("..").unwrap_err().kind, ErrorKind::InvalidPath);
    }

    #[test]
    fn test_parent_and_file_name() {
        assert_eq!(parent("a/b/c.txt"), "a/b");
        assert_eq!(parent("c.txt"), "");
        assert_eq!(file_name("a/b/c.txt"), "c.txt");
        assert_eq!(file_name("c.txt"), "c.txt");
    }
}
