//! A module implementing lexical analysis (tokenization) for the command line.
//!
//! Tokens are maximal runs of characters other than space, tab and newline.
//! Nothing else is special here: quotes, `$` and operator characters are
//! ordinary token characters. Operators are recognized later by exact match.

use std::iter::FusedIterator;

/// Default ceiling on the number of tokens produced for one command.
pub const MAX_TOKENS: usize = 64;

/// Characters separating tokens.
const SEPARATORS: [char; 3] = [' ', '\t', '\n'];

/// Lazy sequence of owned tokens over a borrowed input line.
///
/// The sequence is finite and not restartable: once a token has been
/// yielded it is gone, and after the limit is reached the iterator stays
/// exhausted even if input remains.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
    remaining: usize,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str, limit: usize) -> Self {
        Tokens {
            rest: line,
            remaining: limit,
        }
    }

    /// Returns `true` when the limit cut off input that still holds tokens.
    pub fn truncated(&self) -> bool {
        self.remaining == 0 && !self.rest.trim_start_matches(SEPARATORS).is_empty()
    }
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        let start = self.rest.trim_start_matches(SEPARATORS);
        if start.is_empty() {
            self.rest = start;
            return None;
        }
        let end = start.find(SEPARATORS).unwrap_or(start.len());
        let (token, rest) = start.split_at(end);
        self.rest = rest;
        self.remaining -= 1;
        Some(token.to_string())
    }
}

impl FusedIterator for Tokens<'_> {}

/// Splits `line` into at most [`MAX_TOKENS`] whitespace-delimited tokens.
pub fn split_into_tokens(line: &str) -> Tokens<'_> {
    Tokens::new(line, MAX_TOKENS)
}

/// Like [`split_into_tokens`] with an explicit token ceiling.
pub fn split_with_limit(line: &str, limit: usize) -> Tokens<'_> {
    Tokens::new(line, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<String> {
        split_into_tokens(line).collect()
    }

    #[test]
    fn test_splits_on_spaces_tabs_and_newlines() {
        assert_eq!(tokens("ls  -l\t/tmp\n"), vec!["ls", "-l", "/tmp"]);
    }

    #[test]
    fn test_empty_and_blank_input_yield_nothing() {
        assert!(tokens("").is_empty());
        assert!(tokens(" \t \n").is_empty());
    }

    #[test]
    fn test_quotes_are_ordinary_characters() {
        assert_eq!(
            tokens("echo 'hello world\""),
            vec!["echo", "'hello", "world\""]
        );
    }

    #[test]
    fn test_operators_inside_words_stay_attached() {
        assert_eq!(tokens("echo a>b"), vec!["echo", "a>b"]);
    }

    #[test]
    fn test_tokens_beyond_limit_are_discarded() {
        let line = (0..70).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let mut iter = split_into_tokens(&line);
        let collected: Vec<String> = iter.by_ref().collect();
        assert_eq!(collected.len(), MAX_TOKENS);
        assert_eq!(collected.last().map(String::as_str), Some("63"));
        assert!(iter.truncated());
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_exact_limit_is_not_truncation() {
        let mut iter = split_with_limit("a b ", 2);
        assert_eq!(iter.by_ref().count(), 2);
        assert!(!iter.truncated());
    }

    #[test]
    fn test_is_lazy() {
        let mut iter = split_into_tokens("first second third");
        assert_eq!(iter.next().as_deref(), Some("first"));
        assert_eq!(iter.rest, " second third");
    }
}
