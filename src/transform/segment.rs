//! Sentence segmentation of annotated passages.
//!
//! Splits every passage into sentences, each becoming a passage of its
//! own with the annotations it contains. Annotation text is masked with a
//! sentinel run of equal length before slicing, then substituted back run
//! by run, so offsets inside a sentence are recovered by construction
//! rather than by searching for annotation text (which could match a
//! different occurrence).
//!
//! Boundary detection is pluggable through [`SentenceSplitter`]. Candidate
//! sentences are merged to a fixed point while any annotation crosses a
//! boundary, so no mention is ever cut in half.

use std::collections::BTreeSet;

use crate::data::{Annotation, Example, Passage};
use crate::error::{Error, Result};
use crate::group::{group_by_span, is_independent};
use crate::index::SpanIndex;
use crate::offset::char_count;
use crate::transform::{remap_cluster, DropPolicy, Transformation};

/// Sentence boundary detection over plain text.
///
/// Returns half-open `(start, end)` character ranges in ascending order,
/// excluding inter-sentence whitespace.
pub trait SentenceSplitter {
    /// Split `text` into candidate sentence ranges.
    fn split(&self, text: &str) -> Vec<(usize, usize)>;
}

/// Punctuation-and-follow-case sentence boundary heuristic.
///
/// A `.`, `!` or `?` (plus any closing quotes or brackets) ends a sentence
/// when followed by whitespace and an uppercase letter, a digit or an
/// opening quote, or when it ends the text. Digits count as sentence
/// starters, so abbreviated references like `"Fig. 1"` produce a candidate
/// split that the annotation-driven merge repairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSplitter;

impl SentenceSplitter for HeuristicSplitter {
    fn split(&self, text: &str) -> Vec<(usize, usize)> {
        let chars: Vec<char> = text.chars().collect();
        let mut sentences = Vec::new();

        let mut start = 0;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }

        let mut i = start;
        while i < chars.len() {
            if matches!(chars[i], '.' | '!' | '?') {
                let mut end = i + 1;
                while end < chars.len() && matches!(chars[end], '"' | '\'' | ')' | ']') {
                    end += 1;
                }

                let mut next = end;
                while next < chars.len() && chars[next].is_whitespace() {
                    next += 1;
                }

                let at_text_end = next == chars.len();
                let starts_sentence = !at_text_end
                    && next > end
                    && (chars[next].is_uppercase()
                        || chars[next].is_ascii_digit()
                        || matches!(chars[next], '"' | '\'' | '(' | '['));

                if at_text_end || starts_sentence {
                    sentences.push((start, end));
                    start = next;
                    i = next;
                    continue;
                }
            }
            i += 1;
        }

        if start < chars.len() {
            sentences.push((start, chars.len()));
        }

        sentences
    }
}

/// Split every passage into one passage per sentence.
pub struct SplitIntoSentences {
    /// Boundary detector.
    pub splitter: Box<dyn SentenceSplitter>,
    /// Character used to mask annotation text; pre-existing occurrences in
    /// the input are replaced by spaces.
    pub sentinel: char,
    /// What to do with documents the pass cannot segment.
    pub drop_policy: DropPolicy,
}

impl SplitIntoSentences {
    /// Create the pass with the default heuristic splitter and `@` sentinel.
    #[must_use]
    pub fn new(drop_policy: DropPolicy) -> Self {
        Self {
            splitter: Box::new(HeuristicSplitter),
            sentinel: '@',
            drop_policy,
        }
    }

    /// Create the pass with a custom boundary detector.
    #[must_use]
    pub fn with_splitter(splitter: Box<dyn SentenceSplitter>, drop_policy: DropPolicy) -> Self {
        Self {
            splitter,
            sentinel: '@',
            drop_policy,
        }
    }

    /// Merge adjacent candidate sentences while any annotation crosses
    /// their boundary, to a fixed point.
    fn merge_crossing(&self, mut ranges: Vec<(usize, usize)>, p: &Passage) -> Vec<(usize, usize)> {
        loop {
            let mut crossing = BTreeSet::new();
            for a in &p.annotations {
                let Some(rel_start) = a.start.checked_sub(p.offset) else {
                    continue;
                };
                let rel_end = rel_start + char_count(&a.text);

                for i in 0..ranges.len().saturating_sub(1) {
                    let (x_start, x_end) = ranges[i];
                    let (y_start, y_end) = ranges[i + 1];
                    if rel_start >= x_start
                        && rel_start <= x_end
                        && rel_end >= y_start
                        && rel_end <= y_end
                    {
                        crossing.insert(i);
                        crossing.insert(i + 1);
                    }
                }
            }

            if crossing.is_empty() {
                return ranges;
            }

            let mut merged = Vec::with_capacity(ranges.len());
            let mut i = 0;
            while i < ranges.len() {
                if crossing.contains(&i) {
                    let start = ranges[i].0;
                    let mut j = i;
                    while j + 1 < ranges.len() && crossing.contains(&(j + 1)) {
                        j += 1;
                    }
                    merged.push((start, ranges[j].1));
                    i = j + 1;
                } else {
                    merged.push(ranges[i]);
                    i += 1;
                }
            }
            ranges = merged;
        }
    }

    /// Assign each annotation to the sentence containing it.
    fn partition_annotations(
        &self,
        eid: &str,
        ranges: &[(usize, usize)],
        p: &Passage,
    ) -> Result<Vec<Vec<Annotation>>> {
        let mut grouped = Vec::with_capacity(ranges.len());
        let mut placed = 0;

        for &(start, end) in ranges {
            let anns: Vec<Annotation> = p
                .annotations
                .iter()
                .filter(|a| {
                    a.start.checked_sub(p.offset).is_some_and(|rel_start| {
                        rel_start >= start && rel_start + char_count(&a.text) <= end
                    })
                })
                .cloned()
                .collect();
            placed += anns.len();
            grouped.push(anns);
        }

        if placed != p.annotations.len() {
            return Err(Error::masking(
                eid,
                format!(
                    "placed {placed} of {} annotations into sentences",
                    p.annotations.len()
                ),
            ));
        }

        Ok(grouped)
    }

    /// Passage text with every annotation span overwritten by sentinels.
    fn mask_annotations(&self, eid: &str, p: &Passage, p_chars: &[char]) -> Result<Vec<char>> {
        let mut masked = p_chars.to_vec();

        for a in &p.annotations {
            let rel_start = a.start.checked_sub(p.offset).unwrap_or(usize::MAX);
            let rel_end = rel_start.saturating_add(char_count(&a.text));
            if rel_end > masked.len() {
                return Err(Error::masking(
                    eid,
                    format!("cannot mask annotation `{}` [{}, {})", a.text, a.start, a.end),
                ));
            }
            for ch in &mut masked[rel_start..rel_end] {
                *ch = self.sentinel;
            }
        }

        Ok(masked)
    }

    /// Substitute original annotation text back into the sentinel runs of
    /// one sentence, left to right, and set sentence-relative offsets.
    fn replace_masked(
        &self,
        eid: &str,
        p: &Passage,
        p_chars: &[char],
        text: &mut [char],
        anns: &mut [Annotation],
    ) -> Result<()> {
        let clusters = group_by_span(anns);
        let mut last_match = 0;

        for cluster in &clusters {
            let index = if is_independent(cluster) {
                None
            } else {
                Some(SpanIndex::build(eid, p_chars, p.offset, anns, cluster)?)
            };

            let replacement: Vec<char> = match &index {
                None => anns[cluster[0]].text.chars().collect(),
                Some(ix) => ix.span_text().chars().collect(),
            };

            let at = find_sentinel_run(text, self.sentinel, replacement.len(), last_match)
                .ok_or_else(|| {
                    Error::masking(
                        eid,
                        format!(
                            "cannot locate {} sentinel chars for `{}` in `{}`",
                            replacement.len(),
                            replacement.iter().collect::<String>(),
                            text.iter().collect::<String>()
                        ),
                    )
                })?;

            text[at..at + replacement.len()].copy_from_slice(&replacement);
            last_match = at + replacement.len();

            match index {
                None => {
                    let a = &mut anns[cluster[0]];
                    a.start = at;
                    a.end = at + replacement.len();
                }
                Some(ix) => remap_cluster(eid, anns, cluster, &ix, at)?,
            }
        }

        Ok(())
    }
}

/// First position at or after `from` where `len` consecutive sentinels start.
fn find_sentinel_run(chars: &[char], sentinel: char, len: usize, from: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    (from..chars.len().checked_sub(len)?.saturating_add(1))
        .find(|&i| chars[i..i + len].iter().all(|&c| c == sentinel))
}

impl Transformation for SplitIntoSentences {
    fn name(&self) -> &'static str {
        "split-into-sentences"
    }

    fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    fn transform(&self, example: &mut Example) -> Result<()> {
        let eid = example.id.clone();
        let mut sentences = Vec::new();

        for p in &mut example.passages {
            // pre-existing sentinel chars would corrupt mask replacement
            p.text = p.text.replace(self.sentinel, " ");
            for a in &mut p.annotations {
                a.text = a.text.replace(self.sentinel, " ");
            }

            let ranges = self.splitter.split(&p.text);
            let ranges = self.merge_crossing(ranges, p);
            let grouped = self.partition_annotations(&eid, &ranges, p)?;

            let p_chars: Vec<char> = p.text.chars().collect();
            let masked = self.mask_annotations(&eid, p, &p_chars)?;

            for (&(start, end), mut anns) in ranges.iter().zip(grouped) {
                let mut text: Vec<char> = masked[start..end].to_vec();
                if !anns.is_empty() {
                    self.replace_masked(&eid, p, &p_chars, &mut text, &mut anns)?;
                }

                sentences.push(Passage {
                    id: p.id,
                    offset: start,
                    text: text.into_iter().collect(),
                    kind: p.kind.clone(),
                    annotations: anns,
                });
            }
        }

        example.passages = sentences;
        example.mark_rewritten();
        Ok(())
    }
}
