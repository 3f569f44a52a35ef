use crate::Clock;

/// Conditions describe how one clock can relate to another, and may be
/// combined with `|` when several relationships are acceptable.
///
/// The four primitive conditions are mutually exclusive: for any pair of
/// clocks exactly one of them holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Conditions(u8);

impl Conditions {
    /// The clocks hold identical identifiers with identical counters.
    pub const EQUAL: Conditions = Conditions(1);
    /// The other clock is a clear ancestor: all of its identifiers are
    /// present in this clock with counters that never exceed this clock's.
    pub const ANCESTOR: Conditions = Conditions(1 << 1);
    /// The other clock is a clear descendant: all of this clock's
    /// identifiers are present in it with counters at least as large.
    pub const DESCENDANT: Conditions = Conditions(1 << 2);
    /// The clocks are completely independent, or overlap with opposing
    /// counter differences.
    pub const CONCURRENT: Conditions = Conditions(1 << 3);

    /// Returns `true` if the two sets share at least one condition.
    pub fn intersects(self, other: Conditions) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for Conditions {
    type Output = Conditions;

    fn bitor(self, rhs: Conditions) -> Conditions {
        Conditions(self.0 | rhs.0)
    }
}

/// Determines whether the relationship of `other` to `clock` is one of the
/// accepted `cond` conditions.
///
/// The decision is a single pass that may answer early: cardinalities
/// pre-qualify a candidate relationship, identifier-subset checks rule out
/// equality and domination, and the overlapping counters then either
/// confirm the candidate or demote the pair to concurrent. Identifiers are
/// walked in sorted order so that ties resolve the same way on every run.
///
/// ## Example
///
/// ```
/// use vclock_api::{compare, Clock, Conditions};
///
/// let newer = Clock::from([("a".to_owned(), 2), ("b".to_owned(), 14)]);
/// let older = Clock::from([("a".to_owned(), 1), ("b".to_owned(), 14)]);
///
/// // `older` is an ancestor of `newer`
/// assert!(compare(&newer, &older, Conditions::ANCESTOR));
/// assert!(!compare(&newer, &older, Conditions::EQUAL | Conditions::CONCURRENT));
/// ```
pub fn compare(clock: &Clock, other: &Clock, cond: Conditions) -> bool {
    // Preliminary qualification based on cardinality
    let mut other_is = if clock.len() > other.len() {
        if !cond.intersects(Conditions::ANCESTOR | Conditions::CONCURRENT) {
            return false;
        }
        Conditions::ANCESTOR
    } else if clock.len() < other.len() {
        if !cond.intersects(Conditions::DESCENDANT | Conditions::CONCURRENT) {
            return false;
        }
        Conditions::DESCENDANT
    } else {
        Conditions::EQUAL
    };

    if cond.intersects(Conditions::EQUAL | Conditions::DESCENDANT) {
        // All of the identifiers in this clock must be present in the other
        if !clock.keys().all(|id| other.contains_key(id)) {
            return false;
        }
    }
    if cond.intersects(Conditions::EQUAL | Conditions::ANCESTOR) {
        // All of the identifiers in the other clock must be present in this one
        if !other.keys().all(|id| clock.contains_key(id)) {
            return false;
        }
    }

    let mut other_keys: Vec<_> = other.keys().collect();
    other_keys.sort();

    for id in other_keys {
        match clock.get(id) {
            Some(value) => {
                let other_value = other[id];
                if other_value > *value {
                    if other_is == Conditions::EQUAL {
                        if !cond.intersects(Conditions::DESCENDANT) {
                            return false;
                        }
                        other_is = Conditions::DESCENDANT;
                    } else if other_is == Conditions::ANCESTOR {
                        return cond.intersects(Conditions::CONCURRENT);
                    }
                } else if other_value < *value {
                    if other_is == Conditions::EQUAL {
                        if !cond.intersects(Conditions::ANCESTOR) {
                            return false;
                        }
                        other_is = Conditions::ANCESTOR;
                    } else if other_is == Conditions::DESCENDANT {
                        return cond.intersects(Conditions::CONCURRENT);
                    }
                }
            }
            None => {
                if other_is == Conditions::EQUAL {
                    return cond.intersects(Conditions::CONCURRENT);
                }
                // The remaining cardinality headroom no longer allows a
                // clean ancestor/descendant outcome
                if (other.len() as i64 - clock.len() as i64 - 1) < 0 {
                    return cond.intersects(Conditions::CONCURRENT);
                }
            }
        }
    }

    cond.intersects(other_is)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(entries: &[(&str, u64)]) -> Clock {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn run_matrix(base: &[(&str, u64)], cond: Conditions, cases: &[(&[(&str, u64)], bool)]) {
        let base = clock(base);
        for (entries, expected) in cases {
            assert_eq!(
                compare(&base, &clock(entries), cond),
                *expected,
                "base: {base:?}, other: {entries:?}, cond: {cond:?}"
            );
        }
    }

    #[test]
    fn other_is_descendant() {
        run_matrix(
            &[("a", 1), ("b", 14)],
            Conditions::DESCENDANT,
            &[
                (&[("a", 1), ("b", 14)], false),
                (&[("c", 8), ("d", 11)], false),
                (&[("a", 1), ("d", 11)], false),
                (&[("a", 2), ("d", 11)], false),
                (&[("a", 2)], false),
                (&[("a", 2), ("b", 13)], false),
                (&[("a", 2), ("b", 14)], true),
                (&[("a", 2), ("b", 14), ("c", 2)], true),
                (&[("a", 2), ("b", 15)], true),
                (&[("a", 1), ("b", 15)], true),
                (&[("a", 1), ("b", 15), ("c", 3), ("d", 7)], true),
                (&[("a", 0), ("b", 14)], false),
                (&[("a", 0), ("b", 13)], false),
                (&[("a", 0), ("c", 13)], false),
                (&[("a", 0), ("c", 13), ("d", 17)], false),
                (&[("a", 2), ("c", 13), ("d", 17)], false),
            ],
        );
    }

    #[test]
    fn other_is_ancestor() {
        run_matrix(
            &[("a", 1), ("b", 14)],
            Conditions::ANCESTOR,
            &[(&[("a", 1), ("b", 14)], false), (&[("a", 0)], true)],
        );
        run_matrix(
            &[("a", 1)],
            Conditions::ANCESTOR,
            &[(&[("a", 0)], true)],
        );
        run_matrix(
            &[("a", 1), ("b", 23), ("c", 8)],
            Conditions::ANCESTOR,
            &[
                (&[("a", 0)], true),
                (&[("a", 0), ("b", 23)], true),
                (&[("a", 0), ("b", 23), ("c", 8)], true),
                (&[("a", 0), ("b", 23), ("c", 7)], true),
                (&[("a", 0), ("b", 24), ("c", 7)], false),
                (&[("a", 1), ("b", 24), ("c", 8)], false),
                (&[("a", 1)], true),
                (&[("a", 0), ("d", 3)], false),
                (&[("d", 3)], false),
            ],
        );
    }

    #[test]
    fn concurrent_pairs() {
        run_matrix(
            &[("a", 1), ("b", 14)],
            Conditions::CONCURRENT,
            &[
                (&[("a", 1), ("b", 14)], false),
                (&[("c", 2), ("d", 12)], true),
                (&[("a", 1), ("d", 12)], true),
                (&[("a", 2), ("d", 12)], false),
                (&[("a", 1), ("b", 13)], false),
                (&[("a", 1), ("b", 14), ("c", 2)], false),
                (&[("a", 1), ("b", 14), ("c", 2), ("d", 1), ("e", 54)], false),
            ],
        );
    }

    #[test]
    fn equal_pairs() {
        run_matrix(
            &[("a", 1), ("b", 14)],
            Conditions::EQUAL,
            &[
                (&[("a", 1), ("b", 14)], true),
                (&[("c", 1), ("d", 14)], false),
                (&[("a", 1), ("c", 14)], false),
                (&[("a", 1), ("b", 13)], false),
                (&[("a", 0)], false),
            ],
        );
    }

    #[test]
    fn exactly_one_relationship_holds() {
        let pairs: &[(&[(&str, u64)], &[(&str, u64)])] = &[
            (&[("a", 1), ("b", 14)], &[("a", 1), ("b", 14)]),
            (&[("a", 1), ("b", 14)], &[("a", 2), ("b", 14)]),
            (&[("a", 2), ("b", 14)], &[("a", 1), ("b", 14)]),
            (&[("a", 1), ("b", 14)], &[("a", 1), ("d", 12)]),
            (&[("a", 1)], &[("a", 1), ("b", 2)]),
            (&[("a", 1), ("b", 2)], &[("a", 1)]),
            (&[("a", 1)], &[("b", 7)]),
            (&[], &[("a", 1)]),
        ];
        for (left, right) in pairs {
            let left = clock(left);
            let right = clock(right);
            let held = [
                Conditions::EQUAL,
                Conditions::ANCESTOR,
                Conditions::DESCENDANT,
                Conditions::CONCURRENT,
            ]
            .into_iter()
            .filter(|cond| compare(&left, &right, *cond))
            .count();
            assert_eq!(held, 1, "left: {left:?}, right: {right:?}");
        }
    }

    #[test]
    fn combined_masks_accept_any_member() {
        let older = clock(&[("a", 1), ("b", 14)]);
        let newer = clock(&[("a", 2), ("b", 14)]);
        assert!(compare(
            &older,
            &newer,
            Conditions::EQUAL | Conditions::DESCENDANT
        ));
        assert!(compare(
            &newer,
            &older,
            Conditions::ANCESTOR | Conditions::CONCURRENT
        ));
        assert!(!compare(
            &older,
            &newer,
            Conditions::EQUAL | Conditions::ANCESTOR
        ));
    }

    #[test]
    fn missing_key_edge_cases() {
        // Same cardinality, overlapping but not identical key sets
        let left = clock(&[("a", 1), ("b", 14)]);
        let right = clock(&[("a", 1), ("c", 14)]);
        assert!(compare(&left, &right, Conditions::CONCURRENT));
        assert!(!compare(&left, &right, Conditions::DESCENDANT));
        assert!(!compare(&left, &right, Conditions::ANCESTOR));

        // The smaller side is missing from this clock entirely, so the
        // remaining cardinality headroom rules out a clean ancestor
        let left = clock(&[("a", 1), ("b", 14)]);
        let right = clock(&[("c", 13)]);
        assert!(compare(&left, &right, Conditions::CONCURRENT));
        assert!(!compare(&left, &right, Conditions::ANCESTOR));

        // A strictly larger other may carry extra identifiers and still
        // be a clean descendant
        let left = clock(&[("a", 1)]);
        let right = clock(&[("a", 1), ("b", 2)]);
        assert!(compare(&left, &right, Conditions::DESCENDANT));
        assert!(!compare(&left, &right, Conditions::CONCURRENT));

        // Diverging counters combined with keys missing from each side
        // give no clean answer under any single condition
        let left = clock(&[("a", 1), ("b", 14)]);
        let right = clock(&[("a", 2), ("c", 13), ("d", 17)]);
        for cond in [
            Conditions::EQUAL,
            Conditions::ANCESTOR,
            Conditions::DESCENDANT,
            Conditions::CONCURRENT,
        ] {
            assert!(!compare(&left, &right, cond));
        }
    }
}
