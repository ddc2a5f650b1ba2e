/// Tracks which rows on one side of a join matched at least once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTracker {
    matches: Vec<bool>,
}

impl MatchTracker {
    pub fn new(num_rows: usize) -> Self {
        MatchTracker {
            matches: vec![false; num_rows],
        }
    }

    /// Sets a match for the given row.
    pub fn set_match(&mut self, row_idx: usize) {
        self.matches[row_idx] = true;
    }

    pub fn set_matches(&mut self, matches: impl IntoIterator<Item = usize>) {
        matches.into_iter().for_each(|idx| self.set_match(idx));
    }

    pub fn is_matched(&self, row_idx: usize) -> bool {
        self.matches[row_idx]
    }

    pub fn num_rows(&self) -> usize {
        self.matches.len()
    }

    /// Indices of rows that matched, ascending.
    pub fn matched_rows(&self) -> MatchIndexIter<'_, true> {
        MatchIndexIter::new(&self.matches)
    }

    /// Indices of rows that never matched, ascending.
    pub fn unmatched_rows(&self) -> NotMatchIter<'_> {
        MatchIndexIter::new(&self.matches)
    }
}

/// Returns indices for rows that did not match.
///
/// Used to produce the padded rows of outer joins and the rows of anti
/// joins.
pub type NotMatchIter<'a> = MatchIndexIter<'a, false>;

/// Returns indices for rows where `matches[row_idx] == B`.
#[derive(Debug, Clone)]
pub struct MatchIndexIter<'a, const B: bool> {
    matches: &'a [bool],
    idx: usize,
    rem_count: usize,
}

impl<'a, const B: bool> MatchIndexIter<'a, B> {
    fn new(matches: &'a [bool]) -> Self {
        let count = matches.iter().filter(|&&did_match| did_match == B).count();

        MatchIndexIter {
            matches,
            idx: 0,
            rem_count: count,
        }
    }
}

impl<const B: bool> Iterator for MatchIndexIter<'_, B> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rem_count == 0 {
                return None;
            }

            let idx = self.idx;
            let v = self.matches[idx];
            self.idx += 1;

            if v == B {
                self.rem_count -= 1;
                return Some(idx);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.rem_count, Some(self.rem_count))
    }
}

impl<const B: bool> ExactSizeIterator for MatchIndexIter<'_, B> {}
