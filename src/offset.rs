//! Character-offset handling for annotated text.
//!
//! Annotation offsets are **character** offsets, not byte offsets: corpus
//! files count positions the way humans (and annotation tools) do, while
//! Rust strings index by byte. Every slicing or searching operation in this
//! crate goes through the helpers below so that multi-byte text never
//! shifts an annotation.
//!
//! ```text
//! Text: "café X"
//!
//! byte index:  c(0) a(1) f(2) é(3-4) ' '(5) X(6)
//! char index:  c(0) a(1) f(2) é(3)   ' '(4) X(5)
//! ```

use std::ops::Range;

/// Number of characters in `text`.
#[must_use]
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Convert character offsets to byte offsets.
///
/// Offsets past the end of `text` clamp to `text.len()`.
#[must_use]
pub fn chars_to_bytes(text: &str, char_start: usize, char_end: usize) -> (usize, usize) {
    let mut byte_start = text.len();
    let mut byte_end = text.len();
    let mut found_start = false;

    for (char_idx, (byte_idx, _ch)) in text.char_indices().enumerate() {
        if char_idx == char_start {
            byte_start = byte_idx;
            found_start = true;
        }
        if char_idx == char_end {
            byte_end = byte_idx;
            break;
        }
    }

    if !found_start {
        byte_start = text.len();
    }

    (byte_start, byte_end)
}

/// Slice `text` by character offsets.
///
/// Returns `""` for an empty or out-of-range span instead of panicking:
/// callers compare the result against expected annotation text and report
/// the mismatch themselves.
#[must_use]
pub fn char_slice(text: &str, char_start: usize, char_end: usize) -> &str {
    if char_start >= char_end {
        return "";
    }
    let (byte_start, byte_end) = chars_to_bytes(text, char_start, char_end);
    text.get(byte_start..byte_end).unwrap_or("")
}

/// Slice a character vector by a half-open range, clamped to bounds.
#[must_use]
pub fn clamped(chars: &[char], range: Range<usize>) -> &[char] {
    let start = range.start.min(chars.len());
    let end = range.end.min(chars.len());
    if start > end {
        return &[];
    }
    &chars[start..end]
}

/// Word character in the `\w` sense: alphanumeric or underscore.
#[must_use]
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Find the first occurrence of `needle` in `haystack` at or after `from`.
///
/// Plain literal search over characters. Returns the match's start index.
#[must_use]
pub fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    let last = haystack.len().checked_sub(needle.len())?;
    (from..=last).find(|&i| haystack[i..i + needle.len()] == *needle)
}

/// Like [`find_chars`], but the match must sit on word boundaries: the
/// characters immediately before and after the match (when they exist) must
/// not be word characters. Rejects accidental matches inside longer words.
#[must_use]
pub fn find_chars_word_bounded(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    let mut at = from;
    while let Some(i) = find_chars(haystack, needle, at) {
        let before_ok = i == 0 || !is_word_char(haystack[i - 1]);
        let after = i + needle.len();
        let after_ok = after == haystack.len() || !is_word_char(haystack[after]);
        if before_ok && after_ok {
            return Some(i);
        }
        at = i + 1;
    }
    None
}
