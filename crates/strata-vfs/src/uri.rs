//! Directory URI helpers.
//!
//! A directory URI is absolute, starts and ends with `/`, and never contains
//! a `.` or `..` segment.

use crate::error::VfsError;

/// Check that `uri` is a well-formed directory URI.
///
/// # Errors
///
/// Returns [`VfsError::MalformedUri`] if the URI does not start and end with
/// `/`, or if any segment is `.` or `..`.
pub fn validate_directory_uri(uri: &str) -> Result<(), VfsError> {
    let well_formed = uri.starts_with('/')
        && uri.ends_with('/')
        && !uri.split('/').any(|segment| segment == "." || segment == "..");
    if well_formed {
        Ok(())
    } else {
        Err(VfsError::MalformedUri(uri.to_owned()))
    }
}

/// Non-empty path segments of `uri`, in order.
pub fn segments(uri: &str) -> impl Iterator<Item = &str> {
    uri.split('/').filter(|segment| !segment.is_empty())
}

/// The directory URI and every ancestor up to the root, deepest first.
///
/// ```
/// use strata_vfs::uri_ancestry;
///
/// assert_eq!(uri_ancestry("/a/b/"), ["/a/b/", "/a/", "/"]);
/// ```
pub fn uri_ancestry(uri: &str) -> Vec<String> {
    let mut ancestry = Vec::new();
    let mut current = uri;
    loop {
        ancestry.push(current.to_owned());
        let trimmed = current.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if !trimmed.is_empty() => current = &current[..=idx],
            _ => break,
        }
    }
    ancestry
}

/// Split a request path at its last `/` into a directory URI and a leaf name.
///
/// A trailing slash yields the empty leaf name. Returns `None` for paths that
/// are not absolute.
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    let idx = path.rfind('/')?;
    if !path.starts_with('/') {
        return None;
    }
    Some((&path[..=idx], &path[idx + 1..]))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_validate_accepts_directory_uris() {
        for uri in ["/", "/a/", "/a/b/", "/a.b/", "/.well-known/", "/a//b/"] {
            assert!(validate_directory_uri(uri).is_ok(), "{uri}");
        }
    }

    #[test]
    fn test_validate_rejects_malformed_uris() {
        for uri in ["", "a/", "/a", "a", "/./", "/../", "/a/./b/", "/a/../", "/a/.."] {
            let err = validate_directory_uri(uri).unwrap_err();
            assert!(matches!(err, VfsError::MalformedUri(ref u) if u == uri), "{uri}");
        }
    }

    #[test]
    fn test_segments_skip_empty() {
        assert_eq!(segments("/a//b/").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(segments("/").count(), 0);
    }

    #[test]
    fn test_uri_ancestry() {
        assert_eq!(uri_ancestry("/"), vec!["/"]);
        assert_eq!(uri_ancestry("/a/"), vec!["/a/", "/"]);
        assert_eq!(uri_ancestry("/a/b/c/"), vec!["/a/b/c/", "/a/b/", "/a/", "/"]);
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/"), Some(("/", "")));
        assert_eq!(split_path("/index.html"), Some(("/", "index.html")));
        assert_eq!(split_path("/blog/"), Some(("/blog/", "")));
        assert_eq!(split_path("/blog/post.html"), Some(("/blog/", "post.html")));
        assert_eq!(split_path("blog/post.html"), None);
        assert_eq!(split_path("*"), None);
    }
}
