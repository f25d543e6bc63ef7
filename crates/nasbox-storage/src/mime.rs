//! MIME type guessing from file names.

use nasbox_entity::file::model::DEFAULT_MIME_TYPE;

/// Guess a MIME type from the extension, falling back to octet-stream.
pub fn guess(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// Prefer a caller-declared type, ignoring blanks and generic values.
pub fn declared_or_guess(declared: Option<&str>, filename: &str) -> String {
    match declared.map(str::trim) {
        Some(value) if !value.is_empty() && value != DEFAULT_MIME_TYPE => value.to_string(),
        _ => guess(filename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess() {
        assert_eq!(guess("photo.JPG"), "image/jpeg");
        assert_eq!(guess("notes.txt"), "text/plain");
        assert_eq!(guess("blob"), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_declared_wins_when_specific() {
        assert_eq!(declared_or_guess(Some("video/mp4"), "x.bin"), "video/mp4");
        assert_eq!(declared_or_guess(Some("  "), "a.pdf"), "application/pdf");
        assert_eq!(
            declared_or_guess(Some(DEFAULT_MIME_TYPE), "a.pdf"),
            "application/pdf"
        );
        assert_eq!(declared_or_guess(None, "a.json"), "application/json");
    }
}
