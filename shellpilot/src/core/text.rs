//! Character-based text helpers.
//!
//! Limits here count Unicode scalar values, not bytes, so multi-byte output
//! from commands is never split inside a character.

/// Return the prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Split `text` into consecutive pieces of at most `max_chars` characters.
///
/// Empty input yields no pieces. A zero limit disables splitting.
pub fn chunk_chars(text: &str, max_chars: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    if max_chars == 0 {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let head = truncate_chars(rest, max_chars);
        chunks.push(head);
        rest = &rest[head.len()..];
    }
    chunks
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_chars("abc", 8000), "abc");
    }

    #[test]
    fn truncate_cuts_at_exact_character_count() {
        let long = "x".repeat(8005);
        assert_eq!(truncate_chars(&long, 8000).chars().count(), 8000);
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn chunks_cover_input_in_order() {
        let text = "abcdefghij";
        assert_eq!(chunk_chars(text, 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(chunk_chars(text, 4).concat(), text);
    }

    #[test]
    fn chunking_edge_cases() {
        assert!(chunk_chars("", 4).is_empty());
        assert_eq!(chunk_chars("abc", 0), vec!["abc"]);
        assert_eq!(chunk_chars("abcd", 4), vec!["abcd"]);
    }

    #[test]
    fn phrase_match_ignores_case() {
        assert!(contains_ignore_case("All done. TASK Completed!", "task completed"));
        assert!(!contains_ignore_case("task not complete", "task completed"));
    }
}
