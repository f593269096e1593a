//! Text transformations over prepared examples.
//!
//! A [`Transformation`] rewrites passage text and keeps every annotation's
//! offsets pointing at its text. Implementations work passage by passage
//! with passage-relative offsets and flag the example as rewritten; the
//! [`apply`](Transformation::apply) wrapper lifts offsets back to
//! document-wide coordinates afterwards.
//!
//! [`safe_apply`](Transformation::safe_apply) additionally runs the
//! post-transformation consistency checks and, depending on the
//! [`DropPolicy`], either propagates a failure or drops the document with
//! a warning. Dropping is the right call for bulk corpus builds where a
//! handful of malformed source documents must not abort the run.

pub mod clean;
pub mod mark;
pub mod segment;

use crate::data::{Annotation, Example};
use crate::error::{Error, Result};
use crate::index::SpanIndex;
use crate::offset::find_chars;
use crate::qaqc::check_offsets;

/// What to do with a document that fails a transformation or its checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropPolicy {
    /// Propagate the error.
    #[default]
    Raise,
    /// Log a warning and replace the document with an empty example.
    AllowDrop,
}

/// A rewriting step over a prepared [`Example`].
pub trait Transformation {
    /// Name used in logs and length-accounting errors.
    fn name(&self) -> &'static str;

    /// Failure handling for [`safe_apply`](Self::safe_apply).
    fn drop_policy(&self) -> DropPolicy;

    /// Rewrite the example in place.
    ///
    /// On exit, offsets may be passage-relative; implementations record
    /// that through the example's state flags and [`apply`](Self::apply)
    /// restores document-wide coordinates.
    fn transform(&self, example: &mut Example) -> Result<()>;

    /// Consistency checks for [`safe_apply`](Self::safe_apply); offset
    /// verification by default.
    fn postconditions(&self, example: &Example) -> Result<()> {
        check_offsets(example)
    }

    /// Run the transformation on a prepared example and restore
    /// document-wide offsets.
    fn apply(&self, mut example: Example) -> Result<Example> {
        if !example.is_prepared() {
            return Err(Error::NotPrepared {
                eid: example.id.clone(),
            });
        }

        self.transform(&mut example)?;
        example.reset_offsets();
        Ok(example)
    }

    /// Like [`apply`](Self::apply), but verify postconditions and route
    /// every failure through the drop policy.
    fn safe_apply(&self, example: Example) -> Result<Example> {
        let eid = example.id.clone();

        let example = match self.apply(example) {
            Ok(example) => example,
            Err(err) => return self.handle_error(&eid, err),
        };

        if !example.is_empty() {
            if let Err(err) = self.postconditions(&example) {
                return self.handle_error(&eid, err);
            }
        }

        Ok(example)
    }

    /// Resolve a failure according to the drop policy.
    fn handle_error(&self, eid: &str, err: Error) -> Result<Example> {
        match self.drop_policy() {
            DropPolicy::AllowDrop => {
                log::warn!("{} | dropping example: {err}", self.name());
                Ok(Example::empty(eid))
            }
            DropPolicy::Raise => Err(err),
        }
    }
}

/// Replace unicode space variants (U+2000..U+200B, U+00A0) with a plain
/// space. One character maps to one character, so offsets are unaffected.
#[must_use]
pub fn standardize_whitespace(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2000}'..='\u{200B}' | '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

/// Point every cluster member at its rewritten text.
///
/// `index` holds the cluster's rewritten span; `offset` is the
/// passage-relative position where the span text was emitted. Ownership
/// intervals are contiguous, so each member's rendered text occurs in the
/// span verbatim; failure to find it means the rewrite itself is invalid.
pub(crate) fn remap_cluster(
    eid: &str,
    annotations: &mut [Annotation],
    cluster: &[usize],
    index: &SpanIndex,
    offset: usize,
) -> Result<()> {
    let span_text = index.span_text();
    let span_chars: Vec<char> = span_text.chars().collect();

    for &i in cluster {
        let id = annotations[i].id.ok_or_else(|| {
            Error::invalid_input(format!(
                "EID:{eid} | annotation `{}` has no id; example not prepared",
                annotations[i].text
            ))
        })?;

        let text = index.render_text(id);
        let needle: Vec<char> = text.chars().collect();
        let at = find_chars(&span_chars, &needle, 0).ok_or_else(|| Error::Remap {
            eid: eid.to_string(),
            text: text.clone(),
            span: span_text.clone(),
        })?;

        let a = &mut annotations[i];
        a.text = text;
        a.start = offset + at;
        a.end = a.start + needle.len();
    }

    Ok(())
}
