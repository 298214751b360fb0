//! URL path decoding and traversal checks.

use percent_encoding::percent_decode_str;

use super::ServeError;

/// Decode a request path into filesystem segments.
///
/// The query string must already be stripped. Empty and `.` segments are
/// dropped; both `/` and `\` separate segments.
pub fn decode_segments(path: &str) -> Result<Vec<String>, ServeError> {
    let bytes: Vec<u8> = percent_decode_str(path).collect();

    if bytes.contains(&0) {
        return Err(ServeError::BadRequest("NUL byte in path".into()));
    }
    let decoded = String::from_utf8(bytes)
        .map_err(|_| ServeError::BadRequest("path is not valid UTF-8".into()))?;

    let mut segments = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return Err(ServeError::PathTraversal),
            _ => segments.push(segment.to_owned()),
        }
    }
    Ok(segments)
}

/// Whether any segment names a dotfile or dot-directory.
pub fn has_dotfile(segments: &[String]) -> bool {
    segments.iter().any(|s| s.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_encoded_paths() {
        assert_eq!(decode_segments("/css/app.css").unwrap(), vec!["css", "app.css"]);
        assert_eq!(
            decode_segments("/my%20file.txt").unwrap(),
            vec!["my file.txt"]
        );
        assert_eq!(decode_segments("//a/./b/").unwrap(), vec!["a", "b"]);
        assert!(decode_segments("/").unwrap().is_empty());
    }

    #[test]
    fn test_traversal_rejected() {
        for path in [
            "/../etc/passwd",
            "/a/../../etc/passwd",
            "/%2e%2e/etc/passwd",
            "/%2E%2E%2Fetc%2Fpasswd",
            "/a\\..\\b",
            "/a/%2e%2e%5cb",
        ] {
            assert!(
                matches!(decode_segments(path), Err(ServeError::PathTraversal)),
                "{path}"
            );
        }
    }

    #[test]
    fn test_dots_inside_names_allowed() {
        assert_eq!(decode_segments("/a..b/c...").unwrap(), vec!["a..b", "c..."]);
    }

    #[test]
    fn test_bad_bytes() {
        assert!(matches!(decode_segments("/a%00b"), Err(ServeError::BadRequest(_))));
        assert!(matches!(decode_segments("/%ff%fe"), Err(ServeError::BadRequest(_))));
    }

    #[test]
    fn test_has_dotfile() {
        let segs = |p: &str| decode_segments(p).unwrap();
        assert!(has_dotfile(&segs("/.env")));
        assert!(has_dotfile(&segs("/.git/config")));
        assert!(!has_dotfile(&segs("/assets/app.js")));
    }
}
