//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token. This is
//! accurate within ~10% for BPE tokenizers on English text, which is all the
//! budget arithmetic in this layer needs.

use baton_core::text::char_len;

/// Characters per token assumed by the heuristic.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count for a string. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    char_len(text).div_ceil(CHARS_PER_TOKEN)
}

/// Estimate tokens for a slice of texts.
pub fn estimate_total_tokens<S: AsRef<str>>(texts: &[S]) -> usize {
    texts.iter().map(|t| estimate_tokens(t.as_ref())).sum()
}

/// Character budget that corresponds to a token budget.
pub fn chars_for_tokens(tokens: usize) -> usize {
    tokens.saturating_mul(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn counts_chars_not_bytes() {
        // 4 chars, 8 bytes
        assert_eq!(estimate_tokens("ßßßß"), 1);
    }

    #[test]
    fn multiple_texts() {
        assert_eq!(estimate_total_tokens(&["hello", "world"]), 4);
        assert_eq!(estimate_total_tokens::<&str>(&[]), 0);
    }

    #[test]
    fn token_budget_to_chars() {
        assert_eq!(chars_for_tokens(500), 2000);
        assert_eq!(chars_for_tokens(usize::MAX), usize::MAX);
    }
}
