//! String utility functions

/// Trims trailing null characters from a byte buffer
pub fn trim_trailing_nulls(buffer: &mut Vec<u8>) {
    while !buffer.is_empty() && buffer[buffer.len() - 1] == 0 {
        buffer.pop();
    }
}

/// Reduces an uploaded file name to a safe single path component
///
/// Directory parts are dropped, whitespace and any character outside
/// `[A-Za-z0-9._-]` become `_`, and leading dots are removed. The result
/// may be empty.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = last.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_trailing_nulls() {
        let mut buffer = b"EPSG\0\0".to_vec();
        trim_trailing_nulls(&mut buffer);
        assert_eq!(buffer, b"EPSG");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("scene.tif"), "scene.tif");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\data\\my scene (1).tif"), "my_scene__1_.tif");
        assert_eq!(sanitize_file_name(".hidden.tif"), "hidden.tif");
        assert_eq!(sanitize_file_name("dem-ü.tif"), "dem-_.tif");
        assert_eq!(sanitize_file_name(".."), "");
    }
}
