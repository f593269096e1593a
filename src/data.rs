//! Data model: example -> passage -> annotation.
//!
//! An [`Example`] is one document: an ordered list of [`Passage`]s whose
//! texts are joined by a single separator character to form the
//! document-wide coordinate system. Each passage owns its [`Annotation`]s;
//! annotation offsets are character offsets into the document-wide text
//! (or passage-relative in the middle of a transformation, tracked by the
//! example's state flags).
//!
//! Lifecycle: construct from raw text and annotations, [`Example::prepare`]
//! (dedup, grouped merge, dense id assignment), then hand to
//! transformations. Every annotation carries an immutable snapshot of its
//! original identifying fields from which a stable content hash is derived;
//! the hash survives reprocessing and is used to filter annotations against
//! a previously recorded identity set.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::offset::{char_count, find_chars_word_bounded};

/// Sentinel value for fields that carry no information.
pub const NA: &str = "-";

/// Connector used to pack a list of identifiers into one string.
pub const IDENTIFIERS_CONNECTOR: &str = ";";

/// Entity type classification for benchmark corpora.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Gene or gene product
    Gene,
    /// Disease or phenotype
    Disease,
    /// Chemical or drug
    Chemical,
    /// Species / organism
    Species,
    /// Sequence variant
    Variant,
    /// Cell line
    CellLine,
    /// UMLS concept (any semantic type)
    Umls,
    /// Other/unknown entity type
    Other(String),
}

impl EntityType {
    /// Convert to label string.
    #[must_use]
    pub fn as_label(&self) -> &str {
        match self {
            EntityType::Gene => "gene",
            EntityType::Disease => "disease",
            EntityType::Chemical => "chemical",
            EntityType::Species => "species",
            EntityType::Variant => "variant",
            EntityType::CellLine => "cell_line",
            EntityType::Umls => "umls",
            EntityType::Other(s) => s.as_str(),
        }
    }

    /// Parse from label string.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "gene" => EntityType::Gene,
            "disease" => EntityType::Disease,
            "chemical" => EntityType::Chemical,
            "species" => EntityType::Species,
            "cell_line" | "cellline" => EntityType::CellLine,
            "variant" => EntityType::Variant,
            "umls" => EntityType::Umls,
            other => EntityType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// External-dictionary identifiers of an annotation.
///
/// Helper ("foreign") annotations carry no identifier; everything else
/// carries a non-empty list after preparation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifiers {
    /// Sentinel for helper annotations of a non-target entity type.
    Foreign,
    /// Identifiers in an external dictionary.
    Ids(Vec<String>),
}

impl Identifiers {
    /// Pack for hashing/writing: `;`-joined list, or the NA sentinel.
    #[must_use]
    pub fn pack(&self) -> String {
        match self {
            Identifiers::Foreign => NA.to_string(),
            Identifiers::Ids(ids) => ids.join(IDENTIFIERS_CONNECTOR),
        }
    }

    /// The identifier list; empty for foreign annotations.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        match self {
            Identifiers::Foreign => &[],
            Identifiers::Ids(ids) => ids.as_slice(),
        }
    }
}

/// Immutable snapshot of an annotation's identifying fields, taken at
/// construction time.
///
/// The parallel `entity_types` / `identifiers` lists have one entry per
/// constituent: length 1 normally, longer after a grouped merge (several
/// raw annotations sharing a span but differing in identifiers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Original start offset (document-wide characters).
    pub start: usize,
    /// Original end offset (exclusive).
    pub end: usize,
    /// Original surface text.
    pub text: String,
    /// Entity type of each constituent.
    pub entity_types: Vec<EntityType>,
    /// Packed identifier string of each constituent.
    pub identifiers: Vec<String>,
}

/// A single entity annotation: a half-open character span plus the text it
/// denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Start offset (character, half-open).
    pub start: usize,
    /// End offset (character, exclusive).
    pub end: usize,
    /// The substring the offsets denote.
    pub text: String,
    /// Entity type.
    pub entity_type: EntityType,
    /// Dictionary identifiers, or the foreign sentinel.
    pub identifiers: Identifiers,
    /// True for helper annotations not belonging to the target entity type.
    pub foreign: bool,
    /// Dense id, unique within an example; assigned by [`Example::prepare`].
    pub id: Option<u32>,
    /// Snapshot of the fields used for the content hash.
    pub original: Snapshot,
}

impl Annotation {
    /// Create an annotation with dictionary identifiers.
    #[must_use]
    pub fn new(
        start: usize,
        end: usize,
        text: impl Into<String>,
        entity_type: EntityType,
        identifiers: Vec<String>,
    ) -> Self {
        let text = text.into();
        let packed = identifiers.join(IDENTIFIERS_CONNECTOR);
        Self {
            start,
            end,
            original: Snapshot {
                start,
                end,
                text: text.clone(),
                entity_types: vec![entity_type.clone()],
                identifiers: vec![packed],
            },
            text,
            entity_type,
            identifiers: Identifiers::Ids(identifiers),
            foreign: false,
            id: None,
        }
    }

    /// Create a helper annotation that carries no identifier.
    #[must_use]
    pub fn foreign(
        start: usize,
        end: usize,
        text: impl Into<String>,
        entity_type: EntityType,
    ) -> Self {
        let text = text.into();
        Self {
            start,
            end,
            original: Snapshot {
                start,
                end,
                text: text.clone(),
                entity_types: vec![entity_type.clone()],
                identifiers: vec![NA.to_string()],
            },
            text,
            entity_type,
            identifiers: Identifiers::Foreign,
            foreign: true,
            id: None,
        }
    }

    /// Span length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if this annotation is nested in `other`.
    #[must_use]
    pub fn nested(&self, other: &Annotation) -> bool {
        self.start >= other.start && self.end <= other.end
    }

    /// Check if this annotation overlaps `other` (half-open semantics).
    #[must_use]
    pub fn overlaps(&self, other: &Annotation) -> bool {
        (self.start <= other.start && other.start < self.end)
            || (self.start < other.end && other.end <= self.end)
    }

    /// True if this annotation is the product of a grouped merge.
    #[must_use]
    pub fn is_grouped(&self) -> bool {
        self.original.entity_types.len() > 1
    }

    /// Duplicate-detection key; identifiers included when `with_identifiers`.
    #[must_use]
    pub fn key(&self, with_identifiers: bool) -> (usize, usize, String, String, Option<String>) {
        (
            self.start,
            self.end,
            self.text.clone(),
            self.entity_type.as_label().to_string(),
            with_identifiers.then(|| self.identifiers.pack()),
        )
    }

    /// Content-hash digests of this annotation: one per constituent.
    ///
    /// The digest is stable across reprocessing runs (it hashes the
    /// snapshot, not the live fields) and order-independent for grouped
    /// annotations (the identity is the *set* of constituent digests).
    pub fn hexdigests(&self, eid: &str, passage_kind: &str) -> Result<Vec<String>> {
        let o = &self.original;
        if o.entity_types.len() != o.identifiers.len() {
            return Err(Error::invalid_input(format!(
                "EID:{eid} | snapshot entity types ({}) != snapshot identifiers ({})",
                o.entity_types.len(),
                o.identifiers.len()
            )));
        }

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(o.entity_types.len());
        for (entity_type, identifiers) in o.entity_types.iter().zip(&o.identifiers) {
            let digest = hexdigest(&[
                eid,
                passage_kind,
                &o.start.to_string(),
                &o.end.to_string(),
                &o.text,
                entity_type.as_label(),
                identifiers,
            ]);
            if !seen.insert(digest.clone()) {
                return Err(Error::HashCollision {
                    eid: eid.to_string(),
                    detail: format!("annotation `{}` [{}, {})", o.text, o.start, o.end),
                });
            }
            out.push(digest);
        }

        Ok(out)
    }
}

/// Sha-256 hexdigest over a sequence of parts, NUL-separated so that part
/// boundaries cannot be confused.
fn hexdigest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// A contiguous unit of document text (title, abstract, figure caption, ...)
/// owning the annotations whose spans fall inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Ordinal within the example.
    pub id: usize,
    /// Starting offset in document-wide character coordinates.
    pub offset: usize,
    /// Passage text.
    pub text: String,
    /// Passage kind: title, abstract, figure-caption, ...
    pub kind: String,
    /// Owned annotations; spans lie within `[offset, offset + char_len]`.
    pub annotations: Vec<Annotation>,
}

impl Passage {
    /// Create an empty passage.
    #[must_use]
    pub fn new(id: usize, offset: usize, text: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id,
            offset,
            text: text.into(),
            kind: kind.into(),
            annotations: Vec::new(),
        }
    }

    /// Text length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        char_count(&self.text)
    }

    /// A passage is empty if it has no non-foreign annotations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.annotations.iter().any(|a| !a.foreign)
    }

    /// Relocate `annotations` inside this passage's text by literal search.
    ///
    /// Matches are word-boundary anchored to reject accidental substring
    /// matches inside longer words, and proceed left to right from the end
    /// of the previous match. Annotations that cannot be matched are
    /// dropped with a debug log (typically a unicode discrepancy in the
    /// source data).
    #[must_use]
    pub fn remap_annotation_offsets(
        &self,
        eid: &str,
        mut annotations: Vec<Annotation>,
    ) -> Vec<Annotation> {
        annotations.sort_by_key(|a| a.start);

        let chars: Vec<char> = self.text.chars().collect();
        let mut remapped = Vec::with_capacity(annotations.len());
        let mut unmatched: Vec<String> = Vec::new();
        let mut last_match = 0;

        for mut a in annotations {
            let needle: Vec<char> = a.text.chars().collect();
            match find_chars_word_bounded(&chars, &needle, last_match) {
                Some(at) => {
                    last_match = at + needle.len();
                    a.start = at + self.offset;
                    a.end = a.start + needle.len();
                    remapped.push(a);
                }
                None => unmatched.push(a.text),
            }
        }

        if !unmatched.is_empty() {
            log::debug!("EID:{eid} | could not remap annotations: {unmatched:?}");
        }

        remapped
    }
}

/// One document: ordered passages plus transformation state flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Document id.
    pub id: String,
    /// Ordered passages.
    pub passages: Vec<Passage>,
    #[serde(skip)]
    prepared: bool,
    #[serde(skip)]
    pub(crate) passages_text_modified: bool,
    #[serde(skip)]
    pub(crate) annotations_offsets_relative_to_passage: bool,
}

impl Example {
    /// Create an example from passages.
    #[must_use]
    pub fn new(id: impl Into<String>, passages: Vec<Passage>) -> Self {
        Self {
            id: id.into(),
            passages,
            prepared: false,
            passages_text_modified: false,
            annotations_offsets_relative_to_passage: false,
        }
    }

    /// An example with no passages: the unit a transformation yields when a
    /// document is dropped.
    #[must_use]
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Vec::new())
    }

    /// Build an example from ordered `(kind, text)` passage pairs and raw
    /// annotations with document-wide offsets.
    ///
    /// Passage offsets are the running sum of passage character lengths
    /// plus one separator character. Annotations that do not fall inside
    /// any single passage are dropped with a debug log.
    #[must_use]
    pub fn from_text_and_annotations(
        eid: impl Into<String>,
        text: Vec<(String, String)>,
        annotations: Vec<Annotation>,
    ) -> Self {
        let eid = eid.into();
        let mut passages = Vec::with_capacity(text.len());
        let mut pool = annotations;
        let mut offset = 0;

        for (idx, (kind, passage_text)) in text.into_iter().enumerate() {
            let len = char_count(&passage_text);
            let (mine, rest): (Vec<_>, Vec<_>) = pool
                .into_iter()
                .partition(|a| a.start >= offset && a.end <= offset + len);
            pool = rest;

            passages.push(Passage {
                id: idx,
                offset,
                text: passage_text,
                kind,
                annotations: mine,
            });

            offset += len + 1;
        }

        if !pool.is_empty() {
            log::debug!(
                "EID:{eid} | dropping {} annotation(s) outside passage bounds",
                pool.len()
            );
        }

        Self::new(eid, passages)
    }

    /// Whether [`prepare`](Self::prepare) has run.
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// No passages, or no non-foreign annotations in any passage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty() || self.passages.iter().all(Passage::is_empty)
    }

    /// Prepare for transformation: drop duplicates, merge annotations that
    /// differ only in identifiers, and assign dense ids in document order
    /// (ascending start, ties longest first).
    ///
    /// Every non-foreign annotation must carry at least one identifier.
    ///
    /// Idempotent: running it twice yields the same result as once.
    pub fn prepare(&mut self) -> Result<()> {
        for p in &self.passages {
            for a in &p.annotations {
                if !a.foreign && a.identifiers.ids().is_empty() {
                    return Err(Error::invalid_input(format!(
                        "EID:{} | annotation `{}` [{}, {}) has no identifiers",
                        self.id, a.text, a.start, a.end
                    )));
                }
            }
        }

        self.drop_duplicate_annotations();
        self.merge_grouped_annotations()?;

        let mut idx: u32 = 0;
        for p in &mut self.passages {
            p.annotations
                .sort_by(|a, b| a.start.cmp(&b.start).then(b.char_len().cmp(&a.char_len())));
            for a in &mut p.annotations {
                a.id = Some(idx);
                idx += 1;
            }
        }

        self.prepared = true;
        Ok(())
    }

    /// Drop annotations equal in `(start, end, text, entity_type,
    /// identifiers)`, keeping the first occurrence.
    fn drop_duplicate_annotations(&mut self) {
        let eid = self.id.clone();
        let mut seen = HashSet::new();

        for p in &mut self.passages {
            p.annotations
                .sort_by(|a, b| a.start.cmp(&b.start).then(b.char_len().cmp(&a.char_len())));
            p.annotations.retain(|a| {
                let fresh = seen.insert(a.key(true));
                if !fresh {
                    log::debug!(
                        "EID:{eid} | removing duplicate annotation `{}` [{}, {})",
                        a.text,
                        a.start,
                        a.end
                    );
                }
                fresh
            });
        }
    }

    /// Merge annotations sharing `(start, end, text, entity_type)` but
    /// differing in identifiers into one annotation carrying the union of
    /// identifiers; the snapshot keeps the constituents' fields.
    fn merge_grouped_annotations(&mut self) -> Result<()> {
        let eid = self.id.clone();

        for p in &mut self.passages {
            let mut order = Vec::new();
            let mut groups: HashMap<_, Vec<Annotation>> = HashMap::new();
            for a in p.annotations.drain(..) {
                let key = a.key(false);
                if !groups.contains_key(&key) {
                    order.push(key.clone());
                }
                groups.entry(key).or_default().push(a);
            }

            let mut merged = Vec::with_capacity(order.len());
            for key in order {
                let mut members = groups.remove(&key).unwrap_or_default();
                if members.len() == 1 {
                    merged.push(members.pop().unwrap_or_else(|| unreachable!()));
                    continue;
                }

                if members.iter().any(|a| a.foreign != members[0].foreign) {
                    return Err(Error::invalid_input(format!(
                        "EID:{eid} | duplicate annotation has multiple values for `foreign`: \
                         `{}` [{}, {})",
                        key.2, key.0, key.1
                    )));
                }

                let mut entity_types = Vec::new();
                let mut identifiers = Vec::new();
                let mut union: Vec<String> = Vec::new();
                for a in &members {
                    entity_types.extend(a.original.entity_types.iter().cloned());
                    identifiers.extend(a.original.identifiers.iter().cloned());
                    for i in a.identifiers.ids() {
                        if !union.contains(i) {
                            union.push(i.clone());
                        }
                    }
                }

                let mut keep = members.remove(0);
                keep.original.entity_types = entity_types;
                keep.original.identifiers = identifiers;
                if !keep.foreign {
                    keep.identifiers = Identifiers::Ids(union);
                }

                log::debug!(
                    "EID:{eid} | grouped annotations differing only in identifiers: `{}` [{}, {}) ({:?})",
                    keep.text,
                    keep.start,
                    keep.end,
                    keep.original.identifiers
                );
                merged.push(keep);
            }

            p.annotations = merged;
        }

        Ok(())
    }

    /// Recompute passage ids/offsets and lift passage-relative annotation
    /// offsets back to document-wide coordinates.
    pub fn reset_offsets(&mut self) {
        let mut offset = 0;

        for (idx, p) in self.passages.iter_mut().enumerate() {
            p.id = idx;
            p.offset = offset;
            offset += char_count(&p.text) + 1;

            if self.annotations_offsets_relative_to_passage {
                for a in &mut p.annotations {
                    a.start += p.offset;
                    a.end += p.offset;
                }
            }
        }

        self.passages_text_modified = false;
        self.annotations_offsets_relative_to_passage = false;
    }

    /// Content-hash digests of every annotation in the example.
    ///
    /// Errors on collision: two distinct annotations hashing alike would
    /// silently alias under digest-based filtering.
    pub fn annotation_hexdigests(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for p in &self.passages {
            for a in &p.annotations {
                for digest in a.hexdigests(&self.id, &p.kind)? {
                    if !seen.insert(digest.clone()) {
                        return Err(Error::HashCollision {
                            eid: self.id.clone(),
                            detail: digest,
                        });
                    }
                    out.push(digest);
                }
            }
        }

        Ok(out)
    }

    /// Keep only annotations with at least one digest in `keep`.
    ///
    /// An annotation is retained at most once even when several of its
    /// constituent digests are selected.
    pub fn filter_annotations(&mut self, keep: &HashSet<String>) -> Result<()> {
        let eid = self.id.clone();

        for p in &mut self.passages {
            let kind = p.kind.clone();
            let mut kept = Vec::new();
            for a in p.annotations.drain(..) {
                if a.hexdigests(&eid, &kind)?.iter().any(|d| keep.contains(d)) {
                    kept.push(a);
                }
            }
            p.annotations = kept;
        }

        Ok(())
    }

    /// Inject helper annotations of a non-target entity type.
    ///
    /// Foreign annotations clashing with an existing annotation (overlap,
    /// nesting, identical span, or identical text) are discarded; the rest
    /// are assigned to their containing passage and relocated with
    /// [`Passage::remap_annotation_offsets`].
    pub fn inject_foreign_annotations(&mut self, foreign: Vec<Annotation>) {
        let current: Vec<Annotation> = self
            .passages
            .iter()
            .flat_map(|p| p.annotations.iter().cloned())
            .collect();

        let keep: Vec<Annotation> = foreign
            .into_iter()
            .filter(|fa| {
                !current.iter().any(|a| {
                    fa.overlaps(a)
                        || fa.nested(a)
                        || (fa.start, fa.end) == (a.start, a.end)
                        || fa.text == a.text
                })
            })
            .collect();

        let eid = self.id.clone();
        for p in &mut self.passages {
            let len = char_count(&p.text);
            let candidates: Vec<Annotation> = keep
                .iter()
                .filter(|a| a.start >= p.offset && a.end <= p.offset + len)
                .cloned()
                .collect();

            let remapped = p.remap_annotation_offsets(&eid, candidates);
            p.annotations.extend(remapped);
        }
    }

    /// Flag the example as rewritten with passage-relative offsets; the
    /// transformation wrapper resets coordinates on exit.
    pub(crate) fn mark_rewritten(&mut self) {
        self.passages_text_modified = true;
        self.annotations_offsets_relative_to_passage = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gene(start: usize, end: usize, text: &str, ids: &[&str]) -> Annotation {
        Annotation::new(
            start,
            end,
            text,
            EntityType::Gene,
            ids.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn entity_type_roundtrip() {
        let types = [
            EntityType::Gene,
            EntityType::Disease,
            EntityType::Chemical,
            EntityType::Species,
            EntityType::Variant,
            EntityType::CellLine,
            EntityType::Umls,
        ];
        for t in types {
            assert_eq!(EntityType::from_label(t.as_label()), t);
        }
    }

    #[test]
    fn overlap_and_nesting() {
        let a = gene(0, 4, "IL-6", &["1"]);
        let b = gene(2, 8, "-6 rec", &["2"]);
        let c = gene(0, 8, "IL-6 rec", &["3"]);
        let d = gene(10, 12, "xx", &["4"]);

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(a.nested(&c));
        assert!(!c.nested(&a));
        assert!(!a.overlaps(&d));
        // boundary touch is not overlap under half-open semantics
        let e = gene(4, 6, "ab", &["5"]);
        assert!(!a.overlaps(&e) || a.end > e.start);
    }

    #[test]
    fn prepare_drops_duplicates_and_is_idempotent() {
        let text = "BRCA1 is a gene";
        let anns = vec![
            gene(0, 5, "BRCA1", &["672"]),
            gene(0, 5, "BRCA1", &["672"]),
        ];
        let mut ex = Example::from_text_and_annotations(
            "doc-1",
            vec![("title".into(), text.into())],
            anns,
        );
        ex.prepare().unwrap();
        assert_eq!(ex.passages[0].annotations.len(), 1);
        assert_eq!(ex.passages[0].annotations[0].id, Some(0));

        let before = ex.clone();
        ex.prepare().unwrap();
        assert_eq!(before, ex);
    }

    #[test]
    fn prepare_rejects_non_foreign_annotation_without_identifiers() {
        let anns = vec![Annotation::new(0, 5, "BRCA1", EntityType::Gene, vec![])];
        let mut ex = Example::from_text_and_annotations(
            "doc-id",
            vec![("title".into(), "BRCA1 is a gene".into())],
            anns,
        );
        assert!(ex.prepare().is_err());

        // foreign annotations legitimately carry none
        let mut ex = Example::from_text_and_annotations(
            "doc-id",
            vec![("title".into(), "BRCA1 is a gene".into())],
            vec![Annotation::foreign(0, 5, "BRCA1", EntityType::Gene)],
        );
        ex.prepare().unwrap();
    }

    #[test]
    fn prepare_merges_grouped_annotations() {
        let text = "TNF alpha signaling";
        let anns = vec![
            gene(0, 9, "TNF alpha", &["7124"]),
            gene(0, 9, "TNF alpha", &["7125"]),
        ];
        let mut ex = Example::from_text_and_annotations(
            "doc-2",
            vec![("title".into(), text.into())],
            anns,
        );
        ex.prepare().unwrap();

        let merged = &ex.passages[0].annotations;
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_grouped());
        assert_eq!(
            merged[0].identifiers,
            Identifiers::Ids(vec!["7124".into(), "7125".into()])
        );
        assert_eq!(merged[0].original.identifiers, vec!["7124", "7125"]);
    }

    #[test]
    fn id_assignment_orders_by_start_then_length() {
        let text = "BRCA1 protein is expressed";
        let anns = vec![
            gene(0, 5, "BRCA1", &["672"]),
            gene(0, 13, "BRCA1 protein", &["672"]),
            gene(17, 26, "expressed", &["9"]),
        ];
        let mut ex = Example::from_text_and_annotations(
            "doc-3",
            vec![("title".into(), text.into())],
            anns,
        );
        ex.prepare().unwrap();

        let ids: Vec<(Option<u32>, &str)> = ex.passages[0]
            .annotations
            .iter()
            .map(|a| (a.id, a.text.as_str()))
            .collect();
        // same start: longest first
        assert_eq!(
            ids,
            vec![
                (Some(0), "BRCA1 protein"),
                (Some(1), "BRCA1"),
                (Some(2), "expressed")
            ]
        );
    }

    #[test]
    fn document_offsets_use_char_counts() {
        // title is 9 chars but 11 bytes; byte counting would misplace
        // the abstract offset
        let title = "Caf\u{e9} g\u{e8}ne";
        let abstract_ = "BRCA1 here";
        let anns = vec![gene(10, 15, "BRCA1", &["672"])];
        let ex = Example::from_text_and_annotations(
            "doc-4",
            vec![
                ("title".into(), title.into()),
                ("abstract".into(), abstract_.into()),
            ],
            anns,
        );
        assert_eq!(ex.passages[1].offset, 10);
        assert_eq!(ex.passages[1].annotations.len(), 1);
    }

    #[test]
    fn hexdigests_are_stable_and_distinct() {
        let a = gene(0, 5, "BRCA1", &["672"]);
        let b = gene(0, 5, "BRCA1", &["673"]);
        let da = a.hexdigests("doc", "title").unwrap();
        let db = b.hexdigests("doc", "title").unwrap();
        assert_eq!(da, a.hexdigests("doc", "title").unwrap());
        assert_ne!(da, db);
    }

    #[test]
    fn filter_by_digest_keeps_annotation_once() {
        let text = "TNF alpha signaling";
        let anns = vec![
            gene(0, 9, "TNF alpha", &["7124"]),
            gene(0, 9, "TNF alpha", &["7125"]),
        ];
        let mut ex = Example::from_text_and_annotations(
            "doc-5",
            vec![("title".into(), text.into())],
            anns,
        );
        ex.prepare().unwrap();

        // both constituent digests selected; annotation must appear once
        let digests: HashSet<String> = ex.annotation_hexdigests().unwrap().into_iter().collect();
        assert_eq!(digests.len(), 2);
        ex.filter_annotations(&digests).unwrap();
        assert_eq!(ex.passages[0].annotations.len(), 1);

        ex.filter_annotations(&HashSet::new()).unwrap();
        assert!(ex.is_empty());
    }

    #[test]
    fn foreign_injection_drops_clashes_and_remaps() {
        let text = "BRCA1 in human tissue";
        let anns = vec![gene(0, 5, "BRCA1", &["672"])];
        let mut ex = Example::from_text_and_annotations(
            "doc-6",
            vec![("title".into(), text.into())],
            anns,
        );

        let foreigns = vec![
            // clashes by text with the existing annotation
            Annotation::foreign(0, 5, "BRCA1", EntityType::Species),
            // offsets are off by one; remapping relocates it
            Annotation::foreign(8, 13, "human", EntityType::Species),
        ];
        ex.inject_foreign_annotations(foreigns);

        let p = &ex.passages[0];
        assert_eq!(p.annotations.len(), 2);
        let h = &p.annotations[1];
        assert!(h.foreign);
        assert_eq!((h.start, h.end), (9, 14));
        assert_eq!(&text[9..14], "human");
    }

    #[test]
    fn empty_passage_with_only_foreign_annotations() {
        let mut p = Passage::new(0, 0, "some text", "title");
        assert!(p.is_empty());
        p.annotations
            .push(Annotation::foreign(0, 4, "some", EntityType::Species));
        assert!(p.is_empty());
        p.annotations.push(gene(5, 9, "text", &["1"]));
        assert!(!p.is_empty());
    }
}
