//! Whitespace repair for intra-word mentions.
//!
//! Source corpora regularly annotate a mention that is glued to adjoining
//! alphanumeric text (`IL-6alpha` with only `IL-6` annotated). Such
//! mentions break tokenizers and markers alike, so this pass inserts a
//! space at every glued boundary while keeping all annotations pointing at
//! their text.
//!
//! Independent annotations only need a space on the outside of their span.
//! Clusters of interacting annotations are rewritten through a
//! [`SpanIndex`] so an insertion inside the union span moves every
//! member's characters and ownership together.

use std::collections::BTreeMap;

use crate::data::{Example, Passage};
use crate::error::{Error, Result};
use crate::group::{group_by_span, is_independent};
use crate::index::{SpanIndex, TaggedChar};
use crate::offset::{char_count, clamped};
use crate::qaqc::{check_no_intra_word_mentions, check_offsets, glued_after, glued_before};
use crate::transform::{remap_cluster, standardize_whitespace, DropPolicy, Transformation};

/// Insert a space at every boundary where an annotation is glued to
/// adjoining alphanumeric text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanIntraWordMentions {
    /// What to do with documents the pass cannot repair.
    pub drop_policy: DropPolicy,
}

impl CleanIntraWordMentions {
    /// Create the pass with the given drop policy.
    #[must_use]
    pub fn new(drop_policy: DropPolicy) -> Self {
        Self { drop_policy }
    }
}

impl Transformation for CleanIntraWordMentions {
    fn name(&self) -> &'static str {
        "clean-intra-word-mentions"
    }

    fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    fn transform(&self, example: &mut Example) -> Result<()> {
        let eid = example.id.clone();

        for p in &mut example.passages {
            p.text = standardize_whitespace(&p.text);
            for a in &mut p.annotations {
                a.text = standardize_whitespace(&a.text);
            }

            if has_intra_word_mentions(p) {
                clean_passage(&eid, p)?;
            } else {
                for a in &mut p.annotations {
                    let rel = rel_span(&eid, a.start, a.end, p.offset)?;
                    a.start = rel.0;
                    a.end = rel.1;
                }
            }
        }

        example.mark_rewritten();
        Ok(())
    }

    fn postconditions(&self, example: &Example) -> Result<()> {
        check_offsets(example)?;
        check_no_intra_word_mentions(example)
    }

    /// Documents that already pass the intra-word check go through
    /// untouched.
    fn safe_apply(&self, example: Example) -> Result<Example> {
        let eid = example.id.clone();

        if !example.is_prepared() {
            return self.handle_error(&eid, Error::NotPrepared { eid: eid.clone() });
        }

        if check_no_intra_word_mentions(&example).is_ok() {
            return Ok(example);
        }

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
}

fn rel_span(eid: &str, start: usize, end: usize, offset: usize) -> Result<(usize, usize)> {
    match (start.checked_sub(offset), end.checked_sub(offset)) {
        (Some(s), Some(e)) => Ok((s, e)),
        _ => Err(Error::invalid_input(format!(
            "EID:{eid} | annotation [{start}, {end}) precedes passage offset {offset}"
        ))),
    }
}

/// Any annotation of `p` glued to adjoining alphanumeric text?
fn has_intra_word_mentions(p: &Passage) -> bool {
    let chars: Vec<char> = p.text.chars().collect();
    p.annotations.iter().any(|a| {
        a.start
            .checked_sub(p.offset)
            .is_some_and(|rel_start| {
                let rel_end = rel_start + char_count(&a.text);
                glued_before(&chars, rel_start) || glued_after(&chars, rel_end)
            })
    })
}

/// Rewrite one passage. On return, `p.text` carries the repaired text and
/// annotation offsets are passage-relative.
fn clean_passage(eid: &str, p: &mut Passage) -> Result<()> {
    let p_chars: Vec<char> = p.text.chars().collect();
    let mut anns = std::mem::take(&mut p.annotations);
    let clusters = group_by_span(&anns);

    let mut out: Vec<char> = Vec::with_capacity(p_chars.len());
    let mut cursor = 0;
    let mut spaces = 0;
    // boundary where the previous cluster already inserted a space
    let mut spaced_at: Option<usize> = None;

    for cluster in &clusters {
        let (rel_start, _) = rel_span(eid, anns[cluster[0]].start, anns[cluster[0]].end, p.offset)?;
        let rel_end = cluster
            .iter()
            .map(|&i| anns[i].start - p.offset + char_count(&anns[i].text))
            .max()
            .unwrap_or(rel_start);

        out.extend(clamped(&p_chars, cursor..rel_start));

        if glued_before(&p_chars, rel_start) && spaced_at != Some(rel_start) {
            out.push(' ');
            spaces += 1;
        }

        if is_independent(cluster) {
            let a = &mut anns[cluster[0]];
            a.start = out.len();
            out.extend(a.text.chars());
            a.end = out.len();
        } else {
            spaces += clean_cluster(eid, &p_chars, p.offset, &mut anns, cluster, &mut out)?;
        }

        if glued_after(&p_chars, rel_end) {
            out.push(' ');
            spaces += 1;
            spaced_at = Some(rel_end);
        }
        cursor = rel_end;
    }

    out.extend(clamped(&p_chars, cursor..p_chars.len()));

    if out.len() != p_chars.len() + spaces {
        return Err(Error::LengthMismatch {
            eid: eid.to_string(),
            transform: "clean-intra-word-mentions",
            actual: out.len(),
            expected: p_chars.len() + spaces,
        });
    }

    p.text = out.into_iter().collect();
    p.annotations = anns;
    Ok(())
}

/// Repair glued boundaries inside a cluster's union span and emit the
/// rewritten span into `out`. Returns the number of spaces inserted.
///
/// A space between span positions `i` and `i + 1` is owned by the
/// annotations whose span covers both characters; members that merely end
/// or start at the boundary keep their text unchanged.
fn clean_cluster(
    eid: &str,
    p_chars: &[char],
    p_offset: usize,
    anns: &mut [crate::data::Annotation],
    cluster: &[usize],
    out: &mut Vec<char>,
) -> Result<usize> {
    let mut index = SpanIndex::build(eid, p_chars, p_offset, anns, cluster)?;
    let base = index.start;

    let mut inserts: BTreeMap<isize, Vec<TaggedChar>> = BTreeMap::new();
    let mut spaces = 0;

    for &i in cluster {
        let (rel_start, _) = rel_span(eid, anns[i].start, anns[i].end, p_offset)?;
        let rel_end = rel_start + char_count(&anns[i].text);

        // glued start inside the span
        if rel_start > base && p_chars[rel_start - 1].is_alphanumeric() {
            spaces += insert_boundary_space(&index, &mut inserts, rel_start - base);
        }
        // glued end inside the span
        if rel_end < index.end && p_chars[rel_end].is_alphanumeric() {
            spaces += insert_boundary_space(&index, &mut inserts, rel_end - base);
        }
    }

    index.splice(inserts);

    let offset = out.len();
    out.extend(index.span_text().chars());
    remap_cluster(eid, anns, cluster, &index, offset)?;

    Ok(spaces)
}

/// Queue a space between span positions `at - 1` and `at`, owned by the
/// annotations covering both sides. Each boundary is spaced once.
fn insert_boundary_space(
    index: &SpanIndex,
    inserts: &mut BTreeMap<isize, Vec<TaggedChar>>,
    at: usize,
) -> usize {
    let anchor = at as isize - 1;
    if inserts.contains_key(&anchor) {
        return 0;
    }

    let owners: Vec<u32> = index
        .owners_at(at - 1)
        .iter()
        .filter(|id| index.owners_at(at).contains(id))
        .copied()
        .collect();
    inserts.insert(anchor, vec![TaggedChar::new(' ', owners)]);
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Annotation, EntityType};

    fn gene(start: usize, end: usize, text: &str, id: &str) -> Annotation {
        Annotation::new(start, end, text, EntityType::Gene, vec![id.into()])
    }

    fn example(text: &str, anns: Vec<Annotation>) -> Example {
        let mut ex = Example::from_text_and_annotations(
            "doc",
            vec![("title".to_string(), text.to_string())],
            anns,
        );
        ex.prepare().unwrap();
        ex
    }

    fn pass() -> CleanIntraWordMentions {
        CleanIntraWordMentions::new(DropPolicy::Raise)
    }

    #[test]
    fn independent_glued_tail() {
        let ex = example("the IL-6alpha level", vec![gene(4, 8, "IL-6", "3569")]);
        let out = pass().safe_apply(ex).unwrap();

        assert_eq!(out.passages[0].text, "the IL-6 alpha level");
        let a = &out.passages[0].annotations[0];
        assert_eq!((a.start, a.end, a.text.as_str()), (4, 8, "IL-6"));
        assert!(check_no_intra_word_mentions(&out).is_ok());
    }

    #[test]
    fn independent_glued_head_and_tail() {
        let ex = example("xxBRCA1yy end", vec![gene(2, 7, "BRCA1", "672")]);
        let out = pass().safe_apply(ex).unwrap();

        assert_eq!(out.passages[0].text, "xx BRCA1 yy end");
        let a = &out.passages[0].annotations[0];
        assert_eq!((a.start, a.end, a.text.as_str()), (3, 8, "BRCA1"));
    }

    #[test]
    fn nested_mention_splits_inside_outer_span() {
        // "IL-6" nested in "IL-6alpha"; the space lands inside the outer
        // annotation, which grows to "IL-6 alpha"
        let ex = example(
            "Serum IL-6alpha levels",
            vec![gene(6, 10, "IL-6", "3569"), gene(6, 15, "IL-6alpha", "9999")],
        );
        let out = pass().safe_apply(ex).unwrap();

        assert_eq!(out.passages[0].text, "Serum IL-6 alpha levels");
        let anns = &out.passages[0].annotations;
        let outer = anns.iter().find(|a| a.text.contains(' ')).unwrap();
        let inner = anns.iter().find(|a| !a.text.contains(' ')).unwrap();
        assert_eq!((outer.start, outer.end, outer.text.as_str()), (6, 16, "IL-6 alpha"));
        assert_eq!((inner.start, inner.end, inner.text.as_str()), (6, 10, "IL-6"));
        assert!(check_offsets(&out).is_ok());
        assert!(check_no_intra_word_mentions(&out).is_ok());
    }

    #[test]
    fn unprepared_example_is_rejected_even_without_glued_mentions() {
        // the fast path must not skip the preparation check
        let ex = Example::from_text_and_annotations(
            "doc",
            vec![("title".to_string(), "BRCA1 is a gene".to_string())],
            vec![gene(0, 5, "BRCA1", "672")],
        );
        let err = pass().safe_apply(ex).unwrap_err();
        assert!(matches!(err, Error::NotPrepared { .. }));
    }

    #[test]
    fn clean_document_passes_through_unchanged() {
        let ex = example("BRCA1 is a gene", vec![gene(0, 5, "BRCA1", "672")]);
        let before = ex.clone();
        let out = pass().safe_apply(ex).unwrap();
        assert_eq!(before, out);
    }

    #[test]
    fn whitespace_variants_are_standardized() {
        // no-break space between words; no intra-word mention
        let ex = example("BRCA1\u{00A0}is a gene", vec![gene(0, 5, "BRCA1", "672")]);
        let out = pass().apply(ex).unwrap();
        assert_eq!(out.passages[0].text, "BRCA1 is a gene");
        assert!(check_offsets(&out).is_ok());
    }

    #[test]
    fn second_passage_offsets_survive() {
        let title = "A title";
        let abstract_ = "xxIL-6 rises";
        let mut ex = Example::from_text_and_annotations(
            "doc",
            vec![
                ("title".to_string(), title.to_string()),
                ("abstract".to_string(), abstract_.to_string()),
            ],
            // title is 7 chars, separator 1: abstract starts at 8
            vec![gene(10, 14, "IL-6", "3569")],
        );
        ex.prepare().unwrap();

        let out = pass().safe_apply(ex).unwrap();
        assert_eq!(out.passages[1].text, "xx IL-6 rises");
        let a = &out.passages[1].annotations[0];
        assert_eq!((a.start, a.end), (11, 15));
        assert!(check_offsets(&out).is_ok());
    }

    #[test]
    fn overlapping_mentions_share_the_repair() {
        // "TNFalpha" with "TNF" and "TNFalpha" annotated: one space after
        // position of "TNF" repairs the inner gluing
        let ex = example(
            "high TNFalpha level",
            vec![gene(5, 8, "TNF", "7124"), gene(5, 13, "TNFalpha", "7124")],
        );
        let out = pass().safe_apply(ex).unwrap();

        assert_eq!(out.passages[0].text, "high TNF alpha level");
        assert!(check_offsets(&out).is_ok());
        assert!(check_no_intra_word_mentions(&out).is_ok());
    }
}
