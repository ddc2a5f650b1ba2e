//! Serde support for tables.
//!
//! Tables are encoded as an object with the schema under `columns` and
//! positional values under `rows`:
//!
//! ```text
//! {"columns": [{"name": "key", "type": "int64"}], "rows": [[1], [null]]}
//! ```
//!
//! `null` is a missing value. Dates are `YYYY-MM-DD` strings.

use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use super::Table;
use super::schema::{Field, Schema};
use crate::scalar::{DataType, ScalarValue};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Boolean(v) => serializer.serialize_bool(*v),
            Self::Int64(v) => serializer.serialize_i64(*v),
            Self::Float64(v) => serializer.serialize_f64(*v),
            Self::Utf8(v) => serializer.serialize_str(v),
            Self::Date(v) => serializer.collect_str(&v.format(DATE_FORMAT)),
        }
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Table", 2)?;
        s.serialize_field("columns", self.schema.fields())?;
        s.serialize_field("rows", &self.rows)?;
        s.end()
    }
}

/// Value as found in the encoded form, before its column type is known.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    columns: Schema,
    rows: Vec<Vec<Option<RawValue>>>,
}

fn decode_value(raw: Option<RawValue>, field: &Field) -> Result<ScalarValue, String> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(ScalarValue::Null),
    };

    Ok(match (field.datatype, raw) {
        (DataType::Boolean, RawValue::Boolean(v)) => ScalarValue::Boolean(v),
        (DataType::Int64, RawValue::Integer(v)) => ScalarValue::Int64(v),
        (DataType::Float64, RawValue::Integer(v)) => ScalarValue::Float64(v as f64),
        (DataType::Float64, RawValue::Float(v)) => ScalarValue::Float64(v),
        (DataType::Utf8, RawValue::String(v)) => ScalarValue::Utf8(v),
        (DataType::Date, RawValue::String(v)) => NaiveDate::parse_from_str(&v, DATE_FORMAT)
            .map(ScalarValue::Date)
            .map_err(|e| format!("invalid date '{v}' in column '{}': {e}", field.name))?,
        (datatype, raw) => {
            return Err(format!(
                "value {raw:?} doesn't fit column '{}' of type {datatype}",
                field.name
            ));
        }
    })
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTable::deserialize(deserializer)?;
        let fields = raw.columns.fields();

        let mut rows = Vec::with_capacity(raw.rows.len());
        for (row_idx, row) in raw.rows.into_iter().enumerate() {
            if row.len() != fields.len() {
                return Err(de::Error::custom(format!(
                    "row {row_idx} has {} values, expected {}",
                    row.len(),
                    fields.len()
                )));
            }
            let row = row
                .into_iter()
                .zip(fields)
                .map(|(value, field)| decode_value(value, field))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| de::Error::custom(format!("row {row_idx}: {e}")))?;
            rows.push(row);
        }

        Table::try_new(raw.columns, rows).map_err(de::Error::custom)
    }
}
