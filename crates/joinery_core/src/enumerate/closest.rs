use crate::predicate::CompiledPredicate;
use crate::scalar::Distance;
use crate::table::{RowRef, RowStore};

/// Keep only the candidates at the minimal non-negative distance from the
/// left row.
///
/// Ties are all kept, in their original order.
pub fn retain_closest(
    predicate: &CompiledPredicate,
    left: &dyn RowStore,
    right: &dyn RowStore,
    left_row: usize,
    candidates: &mut Vec<usize>,
) {
    if candidates.is_empty() {
        return;
    }

    let left_ref = RowRef::new(left, left_row);
    let distances: Vec<Option<Distance>> = candidates
        .iter()
        .map(|&r| {
            predicate
                .distance(left_ref, RowRef::new(right, r))
                .filter(|d| !d.is_negative())
        })
        .collect();

    let min = match distances.iter().flatten().min() {
        Some(min) => *min,
        None => {
            candidates.clear();
            return;
        }
    };

    let mut distances = distances.into_iter();
    candidates.retain(|_| distances.next().flatten() == Some(min));
}
