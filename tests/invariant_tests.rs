//! Invariants of preparation, content hashing and serialization.

use std::collections::HashSet;

use respan::prelude::*;

fn gene(start: usize, end: usize, text: &str, id: &str) -> Annotation {
    Annotation::new(start, end, text, EntityType::Gene, vec![id.into()])
}

fn messy_example() -> Example {
    Example::from_text_and_annotations(
        "pmid-42",
        vec![("title".to_string(), "TNF alpha binds TNF alpha".to_string())],
        vec![
            // exact duplicate
            gene(0, 9, "TNF alpha", "7124"),
            gene(0, 9, "TNF alpha", "7124"),
            // same span, different identifier: grouped merge
            gene(0, 9, "TNF alpha", "7125"),
            gene(16, 25, "TNF alpha", "7124"),
        ],
    )
}

#[test]
fn prepare_is_idempotent() {
    let mut ex = messy_example();
    ex.prepare().unwrap();
    let once = ex.clone();
    ex.prepare().unwrap();
    assert_eq!(once, ex);
}

#[test]
fn prepare_dedups_and_merges() {
    let mut ex = messy_example();
    ex.prepare().unwrap();

    let anns = &ex.passages[0].annotations;
    assert_eq!(anns.len(), 2);
    assert!(anns[0].is_grouped());
    assert_eq!(
        anns[0].identifiers,
        Identifiers::Ids(vec!["7124".into(), "7125".into()])
    );
    assert!(!anns[1].is_grouped());
    assert_eq!(anns.iter().map(|a| a.id).collect::<Vec<_>>(), vec![Some(0), Some(1)]);
}

#[test]
fn hexdigests_survive_transformations() {
    let mut ex = Example::from_text_and_annotations(
        "pmid-7",
        vec![("title".to_string(), "the IL-6alpha level".to_string())],
        vec![gene(4, 8, "IL-6", "3569")],
    );
    ex.prepare().unwrap();
    let before = ex.annotation_hexdigests().unwrap();

    let out = CleanIntraWordMentions::new(DropPolicy::Raise)
        .safe_apply(ex)
        .unwrap();
    let after = out.annotation_hexdigests().unwrap();

    // the digest hashes the original snapshot, not the rewritten fields
    assert_eq!(before, after);
}

#[test]
fn hexdigest_set_is_order_independent_for_grouped_annotations() {
    let build = |ids: [&str; 2]| {
        let mut ex = Example::from_text_and_annotations(
            "pmid-8",
            vec![("title".to_string(), "TNF alpha binds".to_string())],
            ids.iter().map(|id| gene(0, 9, "TNF alpha", id)).collect(),
        );
        ex.prepare().unwrap();
        ex.annotation_hexdigests()
            .unwrap()
            .into_iter()
            .collect::<HashSet<String>>()
    };

    assert_eq!(build(["7124", "7125"]), build(["7125", "7124"]));
}

#[test]
fn filtering_with_empty_digest_set_empties_the_example() {
    let mut ex = messy_example();
    ex.prepare().unwrap();
    ex.filter_annotations(&HashSet::new()).unwrap();
    assert!(ex.is_empty());
}

#[test]
fn filtering_keeps_selected_annotations_only() {
    let mut ex = messy_example();
    ex.prepare().unwrap();

    // select only the second (non-grouped) annotation
    let keep: HashSet<String> = ex.passages[0].annotations[1]
        .hexdigests("pmid-42", "title")
        .unwrap()
        .into_iter()
        .collect();
    ex.filter_annotations(&keep).unwrap();

    let anns = &ex.passages[0].annotations;
    assert_eq!(anns.len(), 1);
    assert_eq!((anns[0].start, anns[0].end), (16, 25));
}

#[test]
fn cleanup_conserves_length_exactly() {
    let text = "aaIL-6bb and xxTP53yy";
    let mut ex = Example::from_text_and_annotations(
        "pmid-9",
        vec![("title".to_string(), text.to_string())],
        vec![gene(2, 6, "IL-6", "3569"), gene(15, 19, "TP53", "7157")],
    );
    ex.prepare().unwrap();

    let out = CleanIntraWordMentions::new(DropPolicy::Raise)
        .safe_apply(ex)
        .unwrap();

    // four glued boundaries: four spaces
    assert_eq!(
        out.passages[0].text.chars().count(),
        text.chars().count() + 4
    );
    assert_eq!(out.passages[0].text, "aa IL-6 bb and xx TP53 yy");
    check_no_intra_word_mentions(&out).unwrap();
}

#[test]
fn serde_roundtrip_preserves_data() {
    let mut ex = messy_example();
    ex.prepare().unwrap();

    let json = serde_json::to_string(&ex).unwrap();
    let back: Example = serde_json::from_str(&json).unwrap();

    assert_eq!(back.id, ex.id);
    assert_eq!(back.passages, ex.passages);
    // transformation state is runtime-only and never serialized
    assert!(!back.is_prepared());
}

#[test]
fn foreign_flag_conflict_on_identical_spans_is_an_error() {
    let mut foreign = Annotation::foreign(0, 9, "TNF alpha", EntityType::Gene);
    // same span/text/type as a real annotation, merged group disagrees
    foreign.identifiers = Identifiers::Foreign;
    let mut ex = Example::from_text_and_annotations(
        "pmid-10",
        vec![("title".to_string(), "TNF alpha binds".to_string())],
        vec![gene(0, 9, "TNF alpha", "7124"), foreign],
    );
    assert!(ex.prepare().is_err());
}
