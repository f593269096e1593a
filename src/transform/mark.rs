//! In-text mention markers.
//!
//! Wraps every mention in marker tokens so a downstream reader can locate
//! entities without consulting the annotation list: `[MS] ... [ME]` for the
//! target entity type, `[FS] ... [FE]` for helper annotations of any other
//! type. Markers are padded with a space toward the text.
//!
//! Inside a cluster, markers become part of the enclosing annotations'
//! text: a nested mention's markers are owned by every annotation spanning
//! the insertion point. Markers landing before the union span (co-located
//! nested starts) are owned by nobody and are emitted outermost first.

use std::collections::BTreeMap;

use crate::data::{Annotation, EntityType, Example, Passage};
use crate::error::{Error, Result};
use crate::group::{group_by_span, is_independent};
use crate::index::{SpanIndex, TaggedChar};
use crate::offset::{char_count, clamped};
use crate::transform::{remap_cluster, DropPolicy, Transformation};

/// Start marker for mentions of the target entity type.
pub const MENTION_START: &str = "[MS]";
/// End marker for mentions of the target entity type.
pub const MENTION_END: &str = "[ME]";
/// Start marker for helper annotations.
pub const FOREIGN_START: &str = "[FS]";
/// End marker for helper annotations.
pub const FOREIGN_END: &str = "[FE]";

/// Wrap every mention in start/end marker tokens.
#[derive(Debug, Clone)]
pub struct AddMentionMarkers {
    /// Entity type that receives mention markers; all others get foreign
    /// markers.
    pub target: EntityType,
    /// What to do with documents the pass cannot mark.
    pub drop_policy: DropPolicy,
}

impl AddMentionMarkers {
    /// Create the pass for the given target entity type.
    #[must_use]
    pub fn new(target: EntityType, drop_policy: DropPolicy) -> Self {
        Self {
            target,
            drop_policy,
        }
    }

    /// Padded start/end markers for an annotation.
    fn markers(&self, entity_type: &EntityType) -> (String, String) {
        let (start, end) = if *entity_type == self.target {
            (MENTION_START, MENTION_END)
        } else {
            (FOREIGN_START, FOREIGN_END)
        };
        (format!("{start} "), format!(" {end}"))
    }

    /// Rewrite one passage; annotation offsets become passage-relative.
    fn mark_passage(&self, eid: &str, p: &mut Passage) -> Result<()> {
        let p_chars: Vec<char> = p.text.chars().collect();
        let mut anns = std::mem::take(&mut p.annotations);
        let clusters = group_by_span(&anns);

        let mut out: Vec<char> = Vec::with_capacity(p_chars.len());
        let mut cursor = 0;
        let mut added = 0;

        for cluster in &clusters {
            let rel_start = anns[cluster[0]].start.checked_sub(p.offset).ok_or_else(|| {
                Error::invalid_input(format!(
                    "EID:{eid} | annotation [{}, {}) precedes passage offset {}",
                    anns[cluster[0]].start, anns[cluster[0]].end, p.offset
                ))
            })?;
            let rel_end = cluster
                .iter()
                .map(|&i| anns[i].start - p.offset + char_count(&anns[i].text))
                .max()
                .unwrap_or(rel_start);

            out.extend(clamped(&p_chars, cursor..rel_start));

            if is_independent(cluster) {
                let a = &mut anns[cluster[0]];
                let (start_marker, end_marker) = self.markers(&a.entity_type);

                out.extend(start_marker.chars());
                added += char_count(&start_marker);

                a.start = out.len();
                out.extend(a.text.chars());
                a.end = out.len();

                out.extend(end_marker.chars());
                added += char_count(&end_marker);
            } else {
                added += self.mark_cluster(eid, &p_chars, p.offset, &mut anns, cluster, &mut out)?;
            }

            cursor = rel_end;
        }

        out.extend(clamped(&p_chars, cursor..p_chars.len()));

        if out.len() != p_chars.len() + added {
            return Err(Error::LengthMismatch {
                eid: eid.to_string(),
                transform: "add-mention-markers",
                actual: out.len(),
                expected: p_chars.len() + added,
            });
        }

        p.text = out.into_iter().collect();
        p.annotations = anns;
        Ok(())
    }

    /// Insert markers inside a cluster's union span and emit the rewritten
    /// span into `out`. Returns the number of characters added.
    fn mark_cluster(
        &self,
        eid: &str,
        p_chars: &[char],
        p_offset: usize,
        anns: &mut [Annotation],
        cluster: &[usize],
        out: &mut Vec<char>,
    ) -> Result<usize> {
        let mut index = SpanIndex::build(eid, p_chars, p_offset, anns, cluster)?;
        let base = index.start;

        let mut inserts: BTreeMap<isize, Vec<TaggedChar>> = BTreeMap::new();
        let mut added = 0;

        for &i in cluster {
            let a = &anns[i];
            let id = a.id.ok_or_else(|| {
                Error::invalid_input(format!(
                    "EID:{eid} | annotation `{}` has no id; example not prepared",
                    a.text
                ))
            })?;
            let (start_marker, end_marker) = self.markers(&a.entity_type);

            let rel_start = a.start - p_offset - base;
            let rel_end = rel_start + char_count(&a.text);

            added += queue_marker(&index, &mut inserts, rel_start as isize - 1, &start_marker, id);
            added += queue_marker(&index, &mut inserts, rel_end as isize - 1, &end_marker, id);
        }

        index.splice(inserts);

        let offset = out.len();
        out.extend(index.span_text().chars());
        remap_cluster(eid, anns, cluster, &index, offset)?;

        Ok(added)
    }
}

/// Queue a marker string after span position `anchor`.
///
/// The marker's characters are owned by the annotations covering the
/// anchor character, minus the marked annotation itself; a marker before
/// the span (`anchor == -1`) is owned by nobody, so co-located nested
/// starts never swallow each other's markers.
fn queue_marker(
    index: &SpanIndex,
    inserts: &mut BTreeMap<isize, Vec<TaggedChar>>,
    anchor: isize,
    marker: &str,
    id: u32,
) -> usize {
    let owners: Vec<u32> = if anchor < 0 {
        Vec::new()
    } else {
        index
            .owners_at(anchor as usize)
            .iter()
            .copied()
            .filter(|&o| o != id)
            .collect()
    };

    let run = inserts.entry(anchor).or_default();
    let mut count = 0;
    for ch in marker.chars() {
        run.push(TaggedChar::new(ch, owners.clone()));
        count += 1;
    }
    count
}

impl Transformation for AddMentionMarkers {
    fn name(&self) -> &'static str {
        "add-mention-markers"
    }

    fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    fn transform(&self, example: &mut Example) -> Result<()> {
        let eid = example.id.clone();

        for p in &mut example.passages {
            if !p.annotations.is_empty() {
                self.mark_passage(&eid, p)?;
            }
        }

        example.mark_rewritten();
        Ok(())
    }
}
