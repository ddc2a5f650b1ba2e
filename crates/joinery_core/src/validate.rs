//! Primary key validation.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::enumerate::key_index::KeyIndex;
use crate::errors::Result;
use crate::predicate::CompiledExpr;
use crate::scalar::ScalarValue;
use crate::table::RowStore;

/// A key tuple shared by more than one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateKey {
    pub key: Vec<ScalarValue>,
    pub row_count: usize,
    /// Rows with this key, ascending.
    pub rows: Vec<usize>,
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, value) in self.key.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ") appears {} times", self.row_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyReport {
    /// Duplicated key tuples in order of first occurrence.
    pub duplicates: Vec<DuplicateKey>,
    /// Rows with at least one missing key component.
    pub missing: Vec<usize>,
}

impl KeyReport {
    /// If the candidate columns uniquely identify every row.
    pub fn is_primary_key(&self) -> bool {
        self.duplicates.is_empty() && self.missing.is_empty()
    }
}

/// Check if `columns` uniquely identify the rows of `store`.
///
/// Rows with a missing key component are reported separately and excluded
/// from duplicate counting.
pub fn validate_key<S: AsRef<str>>(store: &dyn RowStore, columns: &[S]) -> Result<KeyReport> {
    let schema = store.schema();
    let exprs = columns
        .iter()
        .map(|name| {
            let col = schema.try_index_of(name.as_ref(), "input")?;
            Ok(CompiledExpr::column(col, schema.fields()[col].datatype))
        })
        .collect::<Result<Vec<_>>>()?;
    let expr_refs: Vec<_> = exprs.iter().collect();

    let index = KeyIndex::build(store, &expr_refs);

    let missing: Vec<usize> = index
        .unindexable()
        .iter()
        .copied()
        .filter(|&row| exprs.iter().any(|e| store.value(row, e.col).is_null()))
        .collect();

    let duplicates: Vec<DuplicateKey> = index
        .buckets()
        .iter()
        .filter(|bucket| bucket.rows.len() > 1)
        .map(|bucket| DuplicateKey {
            key: bucket.key.clone(),
            row_count: bucket.rows.len(),
            rows: bucket.rows.clone(),
        })
        .collect();

    debug!(
        rows = store.num_rows(),
        duplicates = duplicates.len(),
        missing = missing.len(),
        "validated key"
    );

    Ok(KeyReport {
        duplicates,
        missing,
    })
}
