//! crates/study_assistant_core/src/context.rs
//!
//! Bounds the amount of document text sent to the generation service.

/// Maximum number of characters of document text submitted for generation.
pub const MAX_TEXT_LENGTH: usize = 60_000;

/// Returns the first `MAX_TEXT_LENGTH` characters of `text`.
///
/// This is a prefix cut: anything past the cap is invisible to generation.
pub fn truncate_for_generation(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_LENGTH) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(truncate_for_generation("photosynthesis"), "photosynthesis");
        assert_eq!(truncate_for_generation(""), "");
    }

    #[test]
    fn test_long_text_is_cut_to_exact_prefix() {
        let text = "a".repeat(70_000);
        let cut = truncate_for_generation(&text);
        assert_eq!(cut.len(), MAX_TEXT_LENGTH);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn test_cut_counts_characters_not_bytes() {
        let text = "é".repeat(MAX_TEXT_LENGTH + 5);
        let cut = truncate_for_generation(&text);
        assert_eq!(cut.chars().count(), MAX_TEXT_LENGTH);
    }
}
