use crate::diagnostics::Diagnostic;
use crate::enumerate::MatchSet;
use crate::join_type::JoinSide;
use crate::options::Relationship;

/// Observed fan-out of a set of matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cardinality {
    /// First left row matching more than one right row, with its match count.
    pub left_multi: Option<(usize, usize)>,
    /// First right row matching more than one left row, with its match count.
    pub right_multi: Option<(usize, usize)>,
}

impl Cardinality {
    pub fn observe(matches: &MatchSet) -> Self {
        let left_multi = (0..matches.num_left_rows())
            .map(|idx| (idx, matches.left_matches(idx).len()))
            .find(|(_, count)| *count > 1);
        let right_multi = (0..matches.num_right_rows())
            .map(|idx| (idx, matches.right_match_count(idx)))
            .find(|(_, count)| *count > 1);

        Cardinality {
            left_multi,
            right_multi,
        }
    }

    pub fn is_many_to_many(&self) -> bool {
        self.left_multi.is_some() && self.right_multi.is_some()
    }

    /// Check observed cardinality against a relationship.
    ///
    /// With a declared relationship, reports the first row breaking it. Without
    /// one, only many-to-many fan-out is reported.
    pub fn check(&self, declared: Option<Relationship>) -> Option<Diagnostic> {
        let declared = match declared {
            Some(declared) => declared,
            None => {
                return match (self.left_multi, self.right_multi) {
                    (Some((left_row, _)), Some((right_row, _))) => Some(Diagnostic::ManyToMany {
                        left_row,
                        right_row,
                    }),
                    _ => None,
                };
            }
        };

        let violation = |side, (row, matches)| Diagnostic::RelationshipViolation {
            expected: declared,
            side,
            row,
            matches,
        };

        if declared.left_unique_match() {
            if let Some(multi) = self.left_multi {
                return Some(violation(JoinSide::Left, multi));
            }
        }
        if declared.right_unique_match() {
            if let Some(multi) = self.right_multi {
                return Some(violation(JoinSide::Right, multi));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_to_many() -> MatchSet {
        // Left 0 matches right 0 and 1. Left 1 matches right 2.
        MatchSet::from_left_matches(vec![vec![0, 1], vec![2]], 3)
    }

    fn many_to_many() -> MatchSet {
        MatchSet::from_left_matches(vec![vec![0], vec![1, 2], vec![1, 2]], 3)
    }

    #[test]
    fn observe_fan_out() {
        let card = Cardinality::observe(&one_to_many());
        assert_eq!(Some((0, 2)), card.left_multi);
        assert_eq!(None, card.right_multi);
        assert!(!card.is_many_to_many());

        let card = Cardinality::observe(&many_to_many());
        assert_eq!(Some((1, 2)), card.left_multi);
        assert_eq!(Some((1, 2)), card.right_multi);
        assert!(card.is_many_to_many());
    }

    #[test]
    fn undeclared_only_flags_many_to_many() {
        assert_eq!(None, Cardinality::observe(&one_to_many()).check(None));
        assert_eq!(
            Some(Diagnostic::ManyToMany {
                left_row: 1,
                right_row: 1
            }),
            Cardinality::observe(&many_to_many()).check(None)
        );
    }

    #[test]
    fn declared_relationships() {
        let card = Cardinality::observe(&one_to_many());
        assert_eq!(None, card.check(Some(Relationship::OneToMany)));
        assert_eq!(None, card.check(Some(Relationship::ManyToMany)));
        assert_eq!(
            Some(Diagnostic::RelationshipViolation {
                expected: Relationship::ManyToOne,
                side: JoinSide::Left,
                row: 0,
                matches: 2,
            }),
            card.check(Some(Relationship::ManyToOne))
        );
        assert!(card.check(Some(Relationship::OneToOne)).is_some());
    }

    #[test]
    fn right_side_violation() {
        let set = MatchSet::from_left_matches(vec![vec![0], vec![0]], 1);
        let card = Cardinality::observe(&set);
        assert_eq!(
            Some(Diagnostic::RelationshipViolation {
                expected: Relationship::OneToMany,
                side: JoinSide::Right,
                row: 0,
                matches: 2,
            }),
            card.check(Some(Relationship::OneToMany))
        );
        assert_eq!(None, card.check(Some(Relationship::ManyToOne)));
    }
}
