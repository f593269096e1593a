//! Grouping of interacting annotation spans.
//!
//! Two annotations interact when their spans overlap or one is nested in
//! the other. Text rewriting must treat every maximal set of transitively
//! interacting annotations as one unit, so a passage's annotations are
//! partitioned into clusters before any edit.

use crate::data::Annotation;

/// Partition `annotations` into clusters of transitively interacting spans.
///
/// Returns index lists into `annotations`, ordered by ascending start
/// offset; within a cluster, members are ordered by ascending start with
/// ties broken longest first (outermost before nested). Every annotation
/// appears in exactly one cluster. An empty input yields no clusters.
#[must_use]
pub fn group_by_span(annotations: &[Annotation]) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..annotations.len()).collect();
    order.sort_by(|&i, &j| {
        let (a, b) = (&annotations[i], &annotations[j]);
        a.start
            .cmp(&b.start)
            .then(b.char_len().cmp(&a.char_len()))
    });

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for idx in order {
        let a = &annotations[idx];
        let joined = clusters.last_mut().is_some_and(|cluster| {
            let interacts = cluster.iter().any(|&other| {
                let o = &annotations[other];
                a.nested(o) || a.overlaps(o) || o.overlaps(a)
            });
            if interacts {
                cluster.push(idx);
            }
            interacts
        });
        if !joined {
            clusters.push(vec![idx]);
        }
    }

    clusters
}

/// A cluster of one annotation does not interact with anything.
#[must_use]
pub fn is_independent(cluster: &[usize]) -> bool {
    cluster.len() <= 1
}
