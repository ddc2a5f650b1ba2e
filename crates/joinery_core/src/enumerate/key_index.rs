use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use hashbrown::raw::RawTable;

use crate::hash::hash_values;
use crate::predicate::CompiledExpr;
use crate::scalar::ScalarValue;
use crate::table::{RowRef, RowStore};

/// All rows sharing a single key tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBucket {
    /// The key values, taken from the first row inserted.
    pub key: Vec<ScalarValue>,
    /// Row indices in ascending order.
    pub rows: Vec<usize>,
}

/// Hash index from key tuples to rows of a single store.
///
/// Rows with a key component that can't equal anything (missing, NaN) are not
/// indexed, and are tracked separately.
pub struct KeyIndex {
    /// Hash table pointing to a bucket.
    table: RawTable<(u64, usize)>,
    /// Buckets in order of first occurrence.
    buckets: Vec<KeyBucket>,
    /// Rows that weren't indexed.
    unindexable: Vec<usize>,
}

impl KeyIndex {
    /// Build an index over every row in `store` using `exprs` as the key.
    pub fn build(store: &dyn RowStore, exprs: &[&CompiledExpr]) -> Self {
        let mut index = KeyIndex {
            table: RawTable::with_capacity(store.num_rows()),
            buckets: Vec::new(),
            unindexable: Vec::new(),
        };

        for row in 0..store.num_rows() {
            let key = eval_key(RowRef::new(store, row), exprs);
            if !is_indexable(&key) {
                index.unindexable.push(row);
                continue;
            }
            index.insert(row, &key);
        }

        index
    }

    fn insert(&mut self, row: usize, key: &[Cow<ScalarValue>]) {
        let hash = hash_values(key.iter().map(|v| v.as_ref()));
        let buckets = &self.buckets;
        let existing = self
            .table
            .get(hash, |(h, bucket_idx)| {
                *h == hash && keys_equal(&buckets[*bucket_idx].key, key)
            })
            .map(|(_, bucket_idx)| *bucket_idx);

        match existing {
            Some(bucket_idx) => self.buckets[bucket_idx].rows.push(row),
            None => {
                let bucket_idx = self.buckets.len();
                self.buckets.push(KeyBucket {
                    key: key.iter().map(|v| v.as_ref().clone()).collect(),
                    rows: vec![row],
                });
                self.table
                    .insert(hash, (hash, bucket_idx), |(hash, _)| *hash);
            }
        }
    }

    /// Find rows whose key equals `key`.
    pub fn lookup(&self, key: &[Cow<ScalarValue>]) -> &[usize] {
        if !is_indexable(key) {
            return &[];
        }
        let hash = hash_values(key.iter().map(|v| v.as_ref()));
        self.table
            .get(hash, |(h, bucket_idx)| {
                *h == hash && keys_equal(&self.buckets[*bucket_idx].key, key)
            })
            .map(|(_, bucket_idx)| self.buckets[*bucket_idx].rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn buckets(&self) -> &[KeyBucket] {
        &self.buckets
    }

    /// Rows with a missing (or otherwise never equal) key component.
    pub fn unindexable(&self) -> &[usize] {
        &self.unindexable
    }
}

impl fmt::Debug for KeyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyIndex")
            .field("buckets", &self.buckets.len())
            .field("unindexable", &self.unindexable.len())
            .finish_non_exhaustive()
    }
}

/// Evaluate key expressions for a row.
pub fn eval_key<'a>(row: RowRef<'a>, exprs: &[&CompiledExpr]) -> Vec<Cow<'a, ScalarValue>> {
    exprs.iter().map(|expr| expr.eval(row)).collect()
}

/// A key can only match if every component is equal to itself.
fn is_indexable(key: &[Cow<ScalarValue>]) -> bool {
    key.iter().all(|v| v.compare(v) == Some(Ordering::Equal))
}

fn keys_equal(stored: &[ScalarValue], key: &[Cow<ScalarValue>]) -> bool {
    stored.len() == key.len()
        && stored
            .iter()
            .zip(key)
            .all(|(a, b)| a.compare(b) == Some(Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::DataType;
    use crate::testutil::table;

    fn col(col: usize, datatype: DataType) -> CompiledExpr {
        CompiledExpr {
            col,
            shift: None,
            datatype,
        }
    }

    #[test]
    fn buckets_in_first_occurrence_order() {
        let t = table(
            &[("a", DataType::Int64), ("b", DataType::Utf8)],
            vec![
                vec![2.into(), "x".into()],
                vec![1.into(), "y".into()],
                vec![2.into(), "x".into()],
                vec![2.into(), "y".into()],
            ],
        );
        let a = col(0, DataType::Int64);
        let b = col(1, DataType::Utf8);
        let index = KeyIndex::build(&t, &[&a, &b]);

        assert_eq!(3, index.buckets().len());
        assert_eq!(vec![0, 2], index.buckets()[0].rows);
        assert_eq!(vec![1], index.buckets()[1].rows);
        assert_eq!(vec![3], index.buckets()[2].rows);
    }

    #[test]
    fn missing_keys_not_indexed() {
        let t = table(
            &[("a", DataType::Float64)],
            vec![
                vec![1.0.into()],
                vec![ScalarValue::Null],
                vec![f64::NAN.into()],
                vec![1.0.into()],
            ],
        );
        let a = col(0, DataType::Float64);
        let index = KeyIndex::build(&t, &[&a]);

        assert_eq!(vec![1, 2], index.unindexable());
        assert_eq!(1, index.buckets().len());

        let probe = [Cow::Owned(ScalarValue::Null)];
        assert!(index.lookup(&probe).is_empty());
    }

    #[test]
    fn lookup_mixed_numeric() {
        let t = table(&[("a", DataType::Float64)], vec![vec![3.0.into()]]);
        let a = col(0, DataType::Float64);
        let index = KeyIndex::build(&t, &[&a]);

        let probe = [Cow::Owned(ScalarValue::Int64(3))];
        assert_eq!(&[0], index.lookup(&probe));
        let probe = [Cow::Owned(ScalarValue::Int64(4))];
        assert!(index.lookup(&probe).is_empty());
    }
}
