//! Helpers for building tables in tests.

use chrono::NaiveDate;

use crate::scalar::{DataType, ScalarValue};
use crate::table::Table;
use crate::table::schema::{Field, Schema};

/// Build a table from column definitions and rows.
///
/// Panics if the rows don't fit the columns.
pub fn table(columns: &[(&str, DataType)], rows: Vec<Vec<ScalarValue>>) -> Table {
    let schema = Schema::try_new(columns.iter().map(|(name, typ)| Field::new(*name, *typ)))
        .expect("valid schema");
    Table::try_new(schema, rows).expect("rows to fit schema")
}

/// Build a single Int64 column table.
pub fn int_table(name: &str, values: impl IntoIterator<Item = Option<i64>>) -> Table {
    table(
        &[(name, DataType::Int64)],
        values.into_iter().map(|v| vec![v.into()]).collect(),
    )
}

pub fn date(year: i32, month: u32, day: u32) -> ScalarValue {
    ScalarValue::Date(NaiveDate::from_ymd_opt(year, month, day).expect("valid date"))
}

/// Get a column's values as strings, for compact assertions.
pub fn column_strings(table: &Table, name: &str) -> Vec<String> {
    table
        .column(name)
        .expect("column to exist")
        .map(|v| v.to_string())
        .collect()
}
