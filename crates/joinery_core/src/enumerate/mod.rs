//! Enumeration of matching row pairs.
//!
//! Predicates with at least one equality comparison are matched by building a
//! hash index over the smaller side and probing it with the other side. All
//! other predicates fall back to evaluating every pair of rows.
//!
//! Regardless of strategy, matches are produced per left row with right
//! indices in ascending order. Closest resolution and the multiple-match
//! policy are applied per left row after matching.

pub mod closest;
pub mod key_index;
pub mod match_tracker;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::errors::{JoinError, Result};
use crate::join_type::JoinSide;
use crate::options::MultipleMatches;
use crate::predicate::{CompiledExpr, CompiledPredicate};
use crate::table::{RowRef, RowStore};
use key_index::{KeyIndex, eval_key};
use match_tracker::MatchTracker;

/// How matches are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Hash the equality keys of the `build` side, probe with the other.
    Hash { build: JoinSide },
    /// Evaluate every pair.
    NestedLoop,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash { build } => write!(f, "hash (build {build})"),
            Self::NestedLoop => write!(f, "nested loop"),
        }
    }
}

/// All matches between a left and right store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSet {
    /// Right row indices matched by each left row, ascending.
    matches: Vec<Vec<usize>>,
    left_tracker: MatchTracker,
    right_tracker: MatchTracker,
    /// Number of left rows matched by each right row.
    right_counts: Vec<usize>,
}

impl MatchSet {
    /// Create a match set from per left row matches.
    pub fn from_left_matches(matches: Vec<Vec<usize>>, num_right: usize) -> Self {
        let mut left_tracker = MatchTracker::new(matches.len());
        let mut right_tracker = MatchTracker::new(num_right);
        let mut right_counts = vec![0; num_right];

        for (left_idx, rights) in matches.iter().enumerate() {
            if !rights.is_empty() {
                left_tracker.set_match(left_idx);
            }
            for &right_idx in rights {
                right_tracker.set_match(right_idx);
                right_counts[right_idx] += 1;
            }
        }

        MatchSet {
            matches,
            left_tracker,
            right_tracker,
            right_counts,
        }
    }

    pub fn num_left_rows(&self) -> usize {
        self.matches.len()
    }

    pub fn num_right_rows(&self) -> usize {
        self.right_counts.len()
    }

    /// Total number of matched pairs.
    pub fn num_pairs(&self) -> usize {
        self.matches.iter().map(|m| m.len()).sum()
    }

    /// Right rows matched by a left row.
    pub fn left_matches(&self, left_idx: usize) -> &[usize] {
        &self.matches[left_idx]
    }

    /// Number of left rows matched by a right row.
    pub fn right_match_count(&self, right_idx: usize) -> usize {
        self.right_counts[right_idx]
    }

    /// All matched (left, right) pairs in left row order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.matches
            .iter()
            .enumerate()
            .flat_map(|(l, rights)| rights.iter().map(move |&r| (l, r)))
    }

    pub fn tracker(&self, side: JoinSide) -> &MatchTracker {
        match side {
            JoinSide::Left => &self.left_tracker,
            JoinSide::Right => &self.right_tracker,
        }
    }

    /// Rows on a side without any match, ascending.
    pub fn unmatched(&self, side: JoinSide) -> Vec<usize> {
        self.tracker(side).unmatched_rows().collect()
    }
}

/// Finds matching row pairs for a compiled predicate.
#[derive(Debug)]
pub struct MatchEnumerator<'a> {
    predicate: &'a CompiledPredicate,
    multiple: MultipleMatches,
    parallel_threshold: usize,
    max_pairs: Option<usize>,
}

impl<'a> MatchEnumerator<'a> {
    pub fn new(predicate: &'a CompiledPredicate) -> Self {
        MatchEnumerator {
            predicate,
            multiple: MultipleMatches::All,
            parallel_threshold: crate::options::DEFAULT_PARALLEL_THRESHOLD,
            max_pairs: None,
        }
    }

    pub fn with_multiple(mut self, multiple: MultipleMatches) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold.max(1);
        self
    }

    /// Stop with `OutputLimitExceeded` once more than `max` pairs are found.
    ///
    /// Pairs are counted after closest and multiple-match resolution.
    pub fn with_max_pairs(mut self, max: Option<usize>) -> Self {
        self.max_pairs = max;
        self
    }

    /// Choose a strategy for the given input sizes.
    pub fn strategy(&self, num_left: usize, num_right: usize) -> MatchStrategy {
        if !self.predicate.has_equality() {
            return MatchStrategy::NestedLoop;
        }
        if num_left < num_right {
            MatchStrategy::Hash {
                build: JoinSide::Left,
            }
        } else {
            MatchStrategy::Hash {
                build: JoinSide::Right,
            }
        }
    }

    /// Enumerate matches using the strategy chosen by input sizes.
    pub fn enumerate(&self, left: &dyn RowStore, right: &dyn RowStore) -> Result<MatchSet> {
        let strategy = self.strategy(left.num_rows(), right.num_rows());
        self.enumerate_with(strategy, left, right)
    }

    /// Enumerate matches with a specific strategy.
    ///
    /// Every strategy produces the same matches. A hash strategy is only used
    /// if the predicate has an equality comparison, otherwise this falls back
    /// to a nested loop.
    pub fn enumerate_with(
        &self,
        strategy: MatchStrategy,
        left: &dyn RowStore,
        right: &dyn RowStore,
    ) -> Result<MatchSet> {
        let strategy = match strategy {
            MatchStrategy::Hash { .. } if !self.predicate.has_equality() => {
                MatchStrategy::NestedLoop
            }
            other => other,
        };

        debug!(
            %strategy,
            predicate = %self.predicate,
            left_rows = left.num_rows(),
            right_rows = right.num_rows(),
            "enumerating join matches"
        );

        let budget = PairBudget::new(self.max_pairs);
        if self.predicate.is_cross() && self.multiple == MultipleMatches::All {
            // Cartesian size is known up front.
            budget.charge_product(left.num_rows(), right.num_rows())?;
        }

        let matches = match strategy {
            MatchStrategy::Hash {
                build: JoinSide::Right,
            } => self.hash_build_right(left, right, &budget)?,
            MatchStrategy::Hash {
                build: JoinSide::Left,
            } => self.hash_build_left(left, right, &budget)?,
            MatchStrategy::NestedLoop => self.nested_loop(left, right, &budget)?,
        };

        let set = MatchSet::from_left_matches(matches, right.num_rows());
        trace!(pairs = set.num_pairs(), "enumerated join matches");

        Ok(set)
    }

    /// If per left row matches are narrowed after matching.
    fn resolves(&self) -> bool {
        self.predicate.has_closest() || self.multiple != MultipleMatches::All
    }

    /// Apply closest resolution and the multiple-match policy to a left row's
    /// matches.
    fn resolve(
        &self,
        left: &dyn RowStore,
        right: &dyn RowStore,
        left_idx: usize,
        rights: &mut Vec<usize>,
    ) {
        if self.predicate.has_closest() {
            closest::retain_closest(self.predicate, left, right, left_idx, rights);
        }
        self.multiple.apply(rights);
    }

    /// Index the right side, probe with each left row.
    fn hash_build_right(
        &self,
        left: &dyn RowStore,
        right: &dyn RowStore,
        budget: &PairBudget,
    ) -> Result<Vec<Vec<usize>>> {
        let (left_keys, right_keys) = self.key_exprs();
        let index = KeyIndex::build(right, &right_keys);
        trace!(?index, "built right key index");

        self.map_rows(left.num_rows(), |left_idx| {
            let left_ref = RowRef::new(left, left_idx);
            let key = eval_key(left_ref, &left_keys);
            let mut rights: Vec<usize> = index
                .lookup(&key)
                .iter()
                .copied()
                .filter(|&right_idx| {
                    self.predicate
                        .evaluate_residual(left_ref, RowRef::new(right, right_idx))
                })
                .collect();
            self.resolve(left, right, left_idx, &mut rights);
            budget.charge(rights.len())?;
            Ok(rights)
        })
    }

    /// Index the left side, probe with each right row.
    ///
    /// Probing in right row order keeps each left row's matches ascending.
    fn hash_build_left(
        &self,
        left: &dyn RowStore,
        right: &dyn RowStore,
        budget: &PairBudget,
    ) -> Result<Vec<Vec<usize>>> {
        let (left_keys, right_keys) = self.key_exprs();
        let index = KeyIndex::build(left, &left_keys);
        trace!(?index, "built left key index");

        let resolves = self.resolves();
        let per_right: Vec<Vec<usize>> = self.map_rows(right.num_rows(), |right_idx| {
            let right_ref = RowRef::new(right, right_idx);
            let key = eval_key(right_ref, &right_keys);
            let lefts: Vec<usize> = index
                .lookup(&key)
                .iter()
                .copied()
                .filter(|&left_idx| {
                    self.predicate
                        .evaluate_residual(RowRef::new(left, left_idx), right_ref)
                })
                .collect();
            // Resolution can only shrink a left row's matches, so raw pairs
            // are only counted when nothing is narrowed afterwards.
            if !resolves {
                budget.charge(lefts.len())?;
            }
            Ok(lefts)
        })?;

        let mut matches = vec![Vec::new(); left.num_rows()];
        for (right_idx, lefts) in per_right.into_iter().enumerate() {
            for left_idx in lefts {
                matches[left_idx].push(right_idx);
            }
        }

        if resolves {
            for (left_idx, rights) in matches.iter_mut().enumerate() {
                self.resolve(left, right, left_idx, rights);
                budget.charge(rights.len())?;
            }
        }

        Ok(matches)
    }

    fn nested_loop(
        &self,
        left: &dyn RowStore,
        right: &dyn RowStore,
        budget: &PairBudget,
    ) -> Result<Vec<Vec<usize>>> {
        let num_right = right.num_rows();
        let cross = self.predicate.is_cross();

        self.map_rows(left.num_rows(), |left_idx| {
            let left_ref = RowRef::new(left, left_idx);
            let mut rights: Vec<usize> = if cross {
                (0..num_right).collect()
            } else {
                (0..num_right)
                    .filter(|&right_idx| {
                        self.predicate
                            .evaluate(left_ref, RowRef::new(right, right_idx))
                            .matches
                    })
                    .collect()
            };
            self.resolve(left, right, left_idx, &mut rights);
            // Cross products were charged up front.
            if !cross || self.multiple != MultipleMatches::All {
                budget.charge(rights.len())?;
            }
            Ok(rights)
        })
    }

    /// Key expressions for the equality comparisons, (left, right).
    fn key_exprs(&self) -> (Vec<&'a CompiledExpr>, Vec<&'a CompiledExpr>) {
        self.predicate
            .equality_comparisons()
            .map(|c| (&c.left, &c.right))
            .unzip()
    }

    /// Map over row indices, in parallel when there are enough rows.
    ///
    /// Output order always follows row order. Stops at the first error.
    fn map_rows<T, F>(&self, num_rows: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        if num_rows >= self.parallel_threshold {
            debug!(num_rows, "matching rows in parallel");
            (0..num_rows).into_par_iter().map(f).collect()
        } else {
            (0..num_rows).map(f).collect()
        }
    }
}

/// Running count of emitted pairs, shared across threads.
#[derive(Debug)]
struct PairBudget {
    limit: Option<usize>,
    used: AtomicUsize,
}

impl PairBudget {
    fn new(limit: Option<usize>) -> Self {
        PairBudget {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    fn charge(&self, pairs: usize) -> Result<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let used = self
            .used
            .fetch_add(pairs, AtomicOrdering::Relaxed)
            .saturating_add(pairs);
        if used > limit {
            return Err(JoinError::OutputLimitExceeded { limit, rows: used });
        }
        Ok(())
    }

    fn charge_product(&self, num_left: usize, num_right: usize) -> Result<()> {
        self.charge(num_left.checked_mul(num_right).unwrap_or(usize::MAX))
    }
}
