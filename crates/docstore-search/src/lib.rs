//! # docstore-search
//!
//! Tokenization shared by the in-memory store's full-text index and by
//! `FullTextSearch` query parsing — the two must agree byte for byte or
//! nothing ever matches.
//!
//! Lowercasing is ASCII-only casefolding; non-ASCII letters are
//! case-preserved (§9 "Tokenization locale" design note — the source
//! behavior is unspecified for Unicode, so we pick the narrower rule and
//! document it here rather than silently Unicode-lowercasing).

/// Tokenize `text`: ASCII-lowercase, split on any non-alphanumeric
/// character, drop zero-length tokens. No minimum-length filter.
pub fn tokenize(text: &str) -> Vec<String> {
    text.chars()
        .map(ascii_lower)
        .collect::<String>()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn ascii_lower(c: char) -> char {
    if c.is_ascii() {
        c.to_ascii_lowercase()
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_splits_on_punctuation() {
        assert_eq!(tokenize("Hello, World!"), vec!["hello", "world"]);
    }

    #[test]
    fn drops_zero_length_tokens_but_keeps_single_characters() {
        assert_eq!(tokenize("a b--c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_and_punctuation_only_input_yields_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("...---...").is_empty());
    }

    #[test]
    fn non_ascii_letters_are_case_preserved() {
        // 'É' is non-ASCII; only ASCII casefolding applies.
        let tokens = tokenize("CAFÉ Time");
        assert_eq!(tokens, vec!["cafÉ", "time"]);
    }

    #[test]
    fn digits_stay_attached_to_letters() {
        assert_eq!(tokenize("test123 foo456bar"), vec!["test123", "foo456bar"]);
    }
}
