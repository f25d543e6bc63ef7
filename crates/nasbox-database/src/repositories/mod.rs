//! PostgreSQL implementations of the store traits.

pub mod activity;
pub mod metadata;
pub mod nas_share;
pub mod share;
pub mod user;

pub use activity::ActivityRepository;
pub use metadata::MetadataRepository;
pub use nas_share::NasShareRepository;
pub use share::ShareRepository;
pub use user::UserRepository;

/// Escape `LIKE` metacharacters so user input matches literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Pattern matching every path strictly beneath `prefix`.
pub(crate) fn descendant_pattern(prefix: &str) -> String {
    if prefix.is_empty() {
        "%".to_string()
    } else {
        format!("{}/%", escape_like(prefix))
    }
}

/// Pattern matching names containing `needle`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    format!("%{}%", escape_like(needle.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_patterns_escape_metacharacters() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(descendant_pattern(""), "%");
        assert_eq!(descendant_pattern("a_b"), "a\\_b/%");
        assert_eq!(contains_pattern(" rep "), "%rep%");
    }
}
