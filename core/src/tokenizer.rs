//! Splits a line of input into words, the same way the trained model's
//! dictionary expects them to be spelled.
//!
//! Reference upstream: `boundary`/`make_words`/`upper` in
//! `libmegahal.c`. `boundary` is ported byte-for-byte
//! (ASCII-only `isalpha`/`isdigit`, not full Unicode classification) since
//! the brain format and every downstream comparison (`wordcmp`) are
//! themselves ASCII-case-insensitive byte operations.

use crate::dictionary::WordBuf;

fn is_alpha(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

/// True if a word boundary falls between `bytes[position - 1]` and
/// `bytes[position]`. `position == 0` is never a boundary (there's nothing
/// before it to split from); `position == bytes.len()` always is (end of
/// input closes the final word).
fn boundary(bytes: &[u8], position: usize) -> bool {
    if position == 0 {
        return false;
    }
    if position == bytes.len() {
        return true;
    }

    let cur = bytes[position];
    let prev = bytes[position - 1];

    // An apostrophe between two letters ("don't") stays inside the word.
    if cur == b'\'' && is_alpha(prev) && position + 1 < bytes.len() && is_alpha(bytes[position + 1]) {
        return false;
    }
    if position > 1 && prev == b'\'' && is_alpha(bytes[position - 2]) && is_alpha(cur) {
        return false;
    }

    if is_alpha(cur) && !is_alpha(prev) {
        return true;
    }
    if !is_alpha(cur) && is_alpha(prev) {
        return true;
    }
    if is_digit(cur) != is_digit(prev) {
        return true;
    }
    false
}

/// Split `input` into words at class boundaries (letters vs digits vs
/// everything else, with the apostrophe exception above), then make sure
/// the utterance ends in punctuation: if the last word starts with a
/// letter or digit, a synthetic `.` token is appended; otherwise, if that
/// last word's final byte isn't one of `!.?`, the last word itself is
/// replaced with `.` (this mirrors the C source's asymmetric handling:
/// appending when the tail is wordy, overwriting when it's already
/// punctuation-shaped but the wrong punctuation).
///
/// Returns no words for an empty (or all-whitespace-absent, since the
/// source does no trimming) input string.
pub fn tokenize(input: &str) -> Vec<WordBuf> {
    let bytes = input.as_bytes();
    if bytes.is_empty() {
        return Vec::new();
    }

    let mut words = Vec::new();
    let mut start = 0usize;
    for position in 1..=bytes.len() {
        if boundary(bytes, position) {
            words.push(WordBuf::new(&bytes[start..position]));
            start = position;
        }
    }

    if let Some(last) = words.last() {
        let starts_alnum = last.starts_alphanumeric();
        if starts_alnum {
            words.push(WordBuf::from_str("."));
        } else {
            let ends_punct = last
                .as_bytes()
                .last()
                .is_some_and(|&b| b == b'!' || b == b'.' || b == b'?');
            if !ends_punct {
                *words.last_mut().unwrap() = WordBuf::from_str(".");
            }
        }
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(words: &[WordBuf]) -> Vec<String> {
        words.iter().map(|w| w.to_string_lossy()).collect()
    }

    #[test]
    fn splits_on_class_boundaries() {
        let words = tokenize("Hello world");
        assert_eq!(strs(&words), vec!["Hello", " ", "world", "."]);
    }

    #[test]
    fn apostrophe_inside_word_is_not_a_boundary() {
        let words = tokenize("don't");
        assert_eq!(strs(&words), vec!["don't", "."]);
    }

    #[test]
    fn existing_terminal_punctuation_is_kept() {
        let words = tokenize("Are you there?");
        assert_eq!(strs(&words).last().unwrap(), "?");
    }

    #[test]
    fn wrong_trailing_punctuation_is_overwritten_with_full_stop() {
        let words = tokenize("wait,");
        assert_eq!(strs(&words).last().unwrap(), ".");
    }

    #[test]
    fn digit_to_letter_is_a_boundary() {
        let words = tokenize("room101b");
        assert_eq!(strs(&words), vec!["room", "101", "b", "."]);
    }

    #[test]
    fn empty_input_yields_no_words() {
        assert!(tokenize("").is_empty());
    }
}
