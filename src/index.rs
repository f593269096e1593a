//! Per-character ownership map over a cluster's union span.
//!
//! Text inside a cluster of interacting annotations cannot be edited
//! through the annotations' offsets: one insertion shifts every other
//! member. The [`SpanIndex`] pairs every character of the cluster's union
//! span with the set of annotations that own it, so edits move characters
//! and ownership together and each member's text can be read back after
//! the fact.
//!
//! Ownership intervals are contiguous at construction and every splice
//! inserts characters whose owner set is copied from a neighbour (minus
//! the annotation that triggered the insertion), so they stay contiguous.

use std::collections::BTreeMap;

use crate::data::Annotation;
use crate::error::{Error, Result};
use crate::offset::char_count;

/// One character of a union span plus the ids of the annotations covering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedChar {
    /// The character.
    pub ch: char,
    /// Ids of the annotations whose span covers this character.
    pub owners: Vec<u32>,
}

impl TaggedChar {
    /// A character owned by the given annotations.
    #[must_use]
    pub fn new(ch: char, owners: Vec<u32>) -> Self {
        Self { ch, owners }
    }
}

/// Ownership map over the union span of one annotation cluster.
#[derive(Debug, Clone)]
pub struct SpanIndex {
    /// Union span start, passage-relative (characters).
    pub start: usize,
    /// Union span end at construction time, passage-relative (exclusive).
    pub end: usize,
    /// The span's characters with their owner sets; grows under splices.
    pub chars: Vec<TaggedChar>,
}

impl SpanIndex {
    /// Build the ownership map for `cluster` (indices into `annotations`)
    /// over `passage_chars`, whose first character sits at document offset
    /// `passage_offset`.
    ///
    /// Every cluster member must carry an id and lie inside the passage.
    pub fn build(
        eid: &str,
        passage_chars: &[char],
        passage_offset: usize,
        annotations: &[Annotation],
        cluster: &[usize],
    ) -> Result<Self> {
        let members: Vec<&Annotation> = cluster.iter().map(|&i| &annotations[i]).collect();
        let Some(doc_start) = members.iter().map(|a| a.start).min() else {
            return Err(Error::invalid_input(format!(
                "EID:{eid} | cannot index an empty cluster"
            )));
        };
        // recompute each end from the annotation text so a stale `end`
        // cannot truncate the span
        let doc_end = members
            .iter()
            .map(|a| a.start + char_count(&a.text))
            .max()
            .unwrap_or(doc_start);

        let start = doc_start.checked_sub(passage_offset).ok_or_else(|| {
            Error::invalid_input(format!(
                "EID:{eid} | cluster start {doc_start} precedes passage offset {passage_offset}"
            ))
        })?;
        let end = doc_end - passage_offset;
        if end > passage_chars.len() {
            return Err(Error::invalid_input(format!(
                "EID:{eid} | cluster end {end} exceeds passage length {}",
                passage_chars.len()
            )));
        }

        let mut chars: Vec<TaggedChar> = passage_chars[start..end]
            .iter()
            .map(|&ch| TaggedChar::new(ch, Vec::new()))
            .collect();

        for a in &members {
            let id = a.id.ok_or_else(|| {
                Error::invalid_input(format!(
                    "EID:{eid} | annotation `{}` has no id; example not prepared",
                    a.text
                ))
            })?;
            let rel = a.start - passage_offset - start;
            for tagged in &mut chars[rel..rel + char_count(&a.text)] {
                tagged.owners.push(id);
            }
        }

        Ok(Self { start, end, chars })
    }

    /// The full span text in its current state.
    #[must_use]
    pub fn span_text(&self) -> String {
        self.chars.iter().map(|t| t.ch).collect()
    }

    /// The text currently owned by annotation `id`.
    #[must_use]
    pub fn render_text(&self, id: u32) -> String {
        self.chars
            .iter()
            .filter(|t| t.owners.contains(&id))
            .map(|t| t.ch)
            .collect()
    }

    /// Splice tagged characters into the span.
    ///
    /// Keys are insertion anchors: the inserted run goes immediately after
    /// the character at that index, with key `-1` placing it before the
    /// first character. Anchors refer to the span as it is now; all
    /// insertions land in one pass.
    pub fn splice(&mut self, inserts: BTreeMap<isize, Vec<TaggedChar>>) {
        let added: usize = inserts.values().map(Vec::len).sum();
        let mut out = Vec::with_capacity(self.chars.len() + added);

        if let Some(run) = inserts.get(&-1) {
            out.extend(run.iter().cloned());
        }
        for (i, tagged) in self.chars.iter().enumerate() {
            out.push(tagged.clone());
            if let Some(run) = inserts.get(&(i as isize)) {
                out.extend(run.iter().cloned());
            }
        }

        self.chars = out;
    }

    /// Owner set of the character at `index`, empty when out of range.
    #[must_use]
    pub fn owners_at(&self, index: usize) -> &[u32] {
        self.chars.get(index).map_or(&[], |t| t.owners.as_slice())
    }
}
