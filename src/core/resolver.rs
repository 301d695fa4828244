//! Conflict resolution between candidate matches.
//!
//! Candidates are ordered by `(start, -priority, registration index)` and
//! walked left to right. A candidate that conflicts with the most recently
//! kept match displaces it only if it outranks it, and the check repeats
//! against earlier kept matches, so the kept set never contains a conflict.
//! The result depends only on the candidate set, not its input order.

use crate::domain::{Match, ResolvedMatchSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct MatchResolver;

impl MatchResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, mut candidates: Vec<Match>) -> ResolvedMatchSet {
        candidates.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(b.priority.cmp(&a.priority))
                .then(a.detector.cmp(&b.detector))
                .then(a.end.cmp(&b.end))
                .then(a.kind.cmp(&b.kind))
        });
        candidates.dedup();

        let mut kept: Vec<Match> = Vec::with_capacity(candidates.len());
        'candidates: for candidate in candidates {
            while let Some(last) = kept.last() {
                if !candidate.conflicts_with(last) {
                    break;
                }
                if candidate.outranks(last) {
                    tracing::trace!(
                        dropped = %last.kind,
                        kept = %candidate.kind,
                        start = candidate.start,
                        "conflict resolved"
                    );
                    kept.pop();
                } else {
                    continue 'candidates;
                }
            }
            kept.push(candidate);
        }

        ResolvedMatchSet::from_sorted(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchKind;

    fn span(kind: MatchKind, start: usize, end: usize, priority: i32, detector: usize) -> Match {
        Match::new(kind, start, end, priority, detector)
    }

    fn starts(set: &ResolvedMatchSet) -> Vec<(usize, usize)> {
        set.iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn test_disjoint_matches_all_kept() {
        let set = MatchResolver::new().resolve(vec![
            span(MatchKind::RepeatedCharacter, 5, 8, 30, 1),
            span(MatchKind::RepeatedCharacter, 0, 3, 30, 1),
        ]);
        assert_eq!(starts(&set), vec![(0, 3), (5, 8)]);
    }

    #[test]
    fn test_higher_priority_wins_overlap() {
        let set = MatchResolver::new().resolve(vec![
            span(MatchKind::RepeatedCharacter, 0, 6, 30, 1),
            span(MatchKind::Underline, 2, 4, 40, 0),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].kind, MatchKind::Underline);
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let a = span(MatchKind::Custom("a".into()), 0, 4, 25, 2);
        let b = span(MatchKind::Custom("b".into()), 1, 5, 25, 3);
        let set = MatchResolver::new().resolve(vec![b.clone(), a.clone()]);
        assert_eq!(set.as_slice(), &[a]);
    }

    #[test]
    fn test_permutation_invariance() {
        let a = span(MatchKind::Underline, 3, 6, 40, 0);
        let b = span(MatchKind::ColonField, 3, 3, 10, 4);
        let c = span(MatchKind::RepeatedCharacter, 5, 9, 30, 1);
        let d = span(MatchKind::RepeatedCharacter, 12, 15, 30, 1);

        let expected = MatchResolver::new().resolve(vec![a.clone(), b.clone(), c.clone(), d.clone()]);
        let orders = [
            vec![d.clone(), c.clone(), b.clone(), a.clone()],
            vec![b.clone(), d.clone(), a.clone(), c.clone()],
            vec![c.clone(), a.clone(), d.clone(), b.clone()],
        ];
        for order in orders {
            assert_eq!(MatchResolver::new().resolve(order), expected);
        }
        assert_eq!(starts(&expected), vec![(3, 6), (12, 15)]);
    }

    #[test]
    fn test_insertion_same_offset_uses_priority() {
        // "电话：" + underlined blanks: colon insertion at 3 vs underline [3, 6)
        let set = MatchResolver::new().resolve(vec![
            span(MatchKind::ColonField, 3, 3, 10, 3),
            span(MatchKind::Underline, 3, 6, 40, 0),
        ]);
        assert_eq!(starts(&set), vec![(3, 6)]);
    }

    #[test]
    fn test_insertion_at_end_of_replacement_coexists() {
        let set = MatchResolver::new().resolve(vec![
            span(MatchKind::RepeatedCharacter, 0, 3, 30, 1),
            span(MatchKind::ColonField, 3, 3, 10, 3),
        ]);
        assert_eq!(starts(&set), vec![(0, 3), (3, 3)]);
    }

    #[test]
    fn test_duplicate_insertions_collapse() {
        let set = MatchResolver::new().resolve(vec![
            span(MatchKind::ColonFieldWithContent, 3, 3, 20, 2),
            span(MatchKind::ColonField, 3, 3, 10, 3),
            span(MatchKind::ColonField, 3, 3, 10, 3),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].kind, MatchKind::ColonFieldWithContent);
    }

    #[test]
    fn test_wide_span_evicts_and_blocks() {
        // Evicts the kept span it overlaps and blocks the one after it
        let set = MatchResolver::new().resolve(vec![
            span(MatchKind::RepeatedCharacter, 0, 2, 30, 1),
            span(MatchKind::RepeatedCharacter, 2, 4, 30, 1),
            span(MatchKind::Underline, 1, 6, 40, 0),
        ]);
        assert_eq!(starts(&set), vec![(1, 6)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(MatchResolver::new().resolve(Vec::new()).is_empty());
    }
}
