pub mod codec;
pub mod pretty;
pub mod schema;

use std::fmt;

use crate::errors::{Result, schema_err};
use crate::scalar::ScalarValue;
use schema::Schema;

/// Read-only access to rows of a table.
///
/// All rows share the columns described by the schema. The join engine only
/// ever reads through this trait, and never mutates the store.
pub trait RowStore: fmt::Debug + Sync {
    fn schema(&self) -> &Schema;

    fn num_rows(&self) -> usize;

    /// Get the value at the given row and column index.
    ///
    /// Indices must be in bounds.
    fn value(&self, row: usize, col: usize) -> &ScalarValue;

    /// Get a value by column name.
    fn value_by_name(&self, row: usize, name: &str) -> Option<&ScalarValue> {
        let col = self.schema().index_of(name)?;
        if row >= self.num_rows() {
            return None;
        }
        Some(self.value(row, col))
    }
}

/// Reference to a single row in a store.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    pub store: &'a dyn RowStore,
    pub row: usize,
}

impl<'a> RowRef<'a> {
    pub fn new(store: &'a dyn RowStore, row: usize) -> Self {
        debug_assert!(row < store.num_rows());
        RowRef { store, row }
    }

    pub fn value(&self, col: usize) -> &'a ScalarValue {
        self.store.value(self.row, col)
    }
}

/// In-memory row-major table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Vec<ScalarValue>>,
}

impl Table {
    /// Create a new table, checking that every row fits the schema.
    pub fn try_new(schema: Schema, rows: Vec<Vec<ScalarValue>>) -> Result<Self> {
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != schema.num_columns() {
                return Err(schema_err!(
                    "Row {row_idx} has {} values, expected {}",
                    row.len(),
                    schema.num_columns()
                ));
            }

            for (value, field) in row.iter().zip(schema.fields()) {
                if let Some(datatype) = value.datatype() {
                    if datatype != field.datatype {
                        return Err(schema_err!(
                            "Row {row_idx} has a {datatype} value in column '{}' of type {}",
                            field.name,
                            field.datatype
                        ));
                    }
                }
            }
        }

        Ok(Table { schema, rows })
    }

    /// Create a table without validating rows.
    ///
    /// Used for output tables where rows were assembled from validated
    /// inputs.
    pub(crate) fn new_unchecked(schema: Schema, rows: Vec<Vec<ScalarValue>>) -> Self {
        Table { schema, rows }
    }

    pub fn empty(schema: Schema) -> Self {
        Table {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[Vec<ScalarValue>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&[ScalarValue]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    /// Iterate over all values in a column.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &ScalarValue>> {
        let col = self.schema.index_of(name)?;
        Some(self.rows.iter().map(move |row| &row[col]))
    }

    pub fn into_rows(self) -> Vec<Vec<ScalarValue>> {
        self.rows
    }
}

impl RowStore for Table {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn value(&self, row: usize, col: usize) -> &ScalarValue {
        &self.rows[row][col]
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        pretty::PrettyTable::new(self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::DataType;
    use crate::table::schema::Field;

    fn schema() -> Schema {
        Schema::try_new([
            Field::new("key", DataType::Int64),
            Field::new("val", DataType::Utf8),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_wrong_width() {
        let res = Table::try_new(schema(), vec![vec![1.into()]]);
        assert!(res.is_err());
    }

    #[test]
    fn rejects_wrong_type() {
        let res = Table::try_new(schema(), vec![vec!["a".into(), "b".into()]]);
        assert!(res.is_err());
    }

    #[test]
    fn allows_missing() {
        let table = Table::try_new(schema(), vec![vec![ScalarValue::Null, "b".into()]]).unwrap();
        assert_eq!(1, table.num_rows());
        assert_eq!(Some(&ScalarValue::Null), table.value_by_name(0, "key"));
        assert_eq!(None, table.value_by_name(0, "missing"));
        assert_eq!(None, table.value_by_name(1, "key"));
    }

    #[test]
    fn column_iter() {
        let table = Table::try_new(
            schema(),
            vec![vec![1.into(), "a".into()], vec![2.into(), "b".into()]],
        )
        .unwrap();
        let vals: Vec<_> = table.column("key").unwrap().cloned().collect();
        assert_eq!(vec![ScalarValue::Int64(1), ScalarValue::Int64(2)], vals);
    }
}
