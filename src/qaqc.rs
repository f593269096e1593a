//! Consistency checks run after every transformation.
//!
//! Both checks walk the whole example and report every violation at once
//! instead of stopping at the first, so a failing document can be diagnosed
//! from a single error.

use crate::data::Example;
use crate::error::{Error, Result};
use crate::offset::{char_count, char_slice, clamped};

/// The character before `rel_start` glues the mention to a preceding word.
#[must_use]
pub fn glued_before(chars: &[char], rel_start: usize) -> bool {
    rel_start > 0
        && rel_start <= chars.len()
        && chars[rel_start - 1].is_alphanumeric()
}

/// The character at `rel_end` glues the mention to a following word.
#[must_use]
pub fn glued_after(chars: &[char], rel_end: usize) -> bool {
    rel_end < chars.len() && chars[rel_end].is_alphanumeric()
}

/// Verify that every annotation's recorded text equals the passage text at
/// its recorded offsets.
///
/// Offsets are document-wide characters; the passage-relative span is
/// `[start - passage.offset, end - passage.offset)`.
pub fn check_offsets(example: &Example) -> Result<()> {
    let mut mismatches = Vec::new();

    for p in &example.passages {
        for a in &p.annotations {
            let (Some(rel_start), Some(rel_end)) =
                (a.start.checked_sub(p.offset), a.end.checked_sub(p.offset))
            else {
                mismatches.push(format!(
                    "`{}` [{}, {}) starts before its passage (offset {})",
                    a.text, a.start, a.end, p.offset
                ));
                continue;
            };

            let actual = char_slice(&p.text, rel_start, rel_end);
            if actual != a.text {
                mismatches.push(format!(
                    "`{}` != `{}` [{}, {})",
                    actual, a.text, a.start, a.end
                ));
            }
        }
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(Error::Offsets {
            eid: example.id.clone(),
            mismatches,
        })
    }
}

/// Verify that no annotation is glued to adjoining alphanumeric text.
///
/// Reports each offender with a five-character context window on both
/// sides.
pub fn check_no_intra_word_mentions(example: &Example) -> Result<()> {
    let mut mentions = Vec::new();

    for p in &example.passages {
        let chars: Vec<char> = p.text.chars().collect();
        for a in &p.annotations {
            let Some(rel_start) = a.start.checked_sub(p.offset) else {
                continue;
            };
            let rel_end = rel_start + char_count(&a.text);

            if glued_before(&chars, rel_start) || glued_after(&chars, rel_end) {
                let window: String = clamped(&chars, rel_start.saturating_sub(5)..rel_end + 5)
                    .iter()
                    .collect();
                mentions.push(format!(
                    "`{}` in `...{}...` [{}, {})",
                    a.text, window, a.start, a.end
                ));
            }
        }
    }

    if mentions.is_empty() {
        Ok(())
    } else {
        Err(Error::IntraWordMentions {
            eid: example.id.clone(),
            mentions,
        })
    }
}
