use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, schema_err};
use crate::scalar::DataType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub datatype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Field {
            name: name.into(),
            datatype,
        }
    }
}

/// Ordered set of uniquely named columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn empty() -> Self {
        Schema { fields: Vec::new() }
    }

    /// Create a new schema, erroring if any column name is repeated.
    pub fn try_new(fields: impl IntoIterator<Item = Field>) -> Result<Self> {
        let fields: Vec<_> = fields.into_iter().collect();
        for (idx, field) in fields.iter().enumerate() {
            if fields[..idx].iter().any(|f| f.name == field.name) {
                return Err(schema_err!("Duplicate column name '{}'", field.name));
            }
        }
        Ok(Schema { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn num_columns(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    /// Find the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Like `index_of`, but errors when the column doesn't exist.
    ///
    /// `side` is only used in the error message.
    pub fn try_index_of(&self, name: &str, side: impl fmt::Display) -> Result<usize> {
        self.index_of(name).ok_or_else(|| {
            schema_err!(
                "Column '{name}' does not exist in the {side} table, available columns: {}",
                self.column_names().collect::<Vec<_>>().join(", ")
            )
        })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let fields = Vec::<Field>::deserialize(deserializer)?;
        Schema::try_new(fields).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join_type::JoinSide;

    #[test]
    fn duplicate_names_rejected() {
        let res = Schema::try_new([
            Field::new("a", DataType::Int64),
            Field::new("a", DataType::Utf8),
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn missing_column_lists_available() {
        let schema = Schema::try_new([
            Field::new("a", DataType::Int64),
            Field::new("b", DataType::Utf8),
        ])
        .unwrap();

        assert_eq!(1, schema.try_index_of("b", JoinSide::Left).unwrap());
        let err = schema.try_index_of("c", JoinSide::Right).unwrap_err();
        assert_eq!(
            "schema error: Column 'c' does not exist in the right table, available columns: a, b",
            err.to_string()
        );
    }

    #[test]
    fn deserialize_validates_names() {
        let ok: Schema = serde_json::from_str(r#"[{"name": "a", "type": "int64"}]"#).unwrap();
        assert_eq!(1, ok.num_columns());

        let res: std::result::Result<Schema, _> = serde_json::from_str(
            r#"[{"name": "a", "type": "int64"}, {"name": "a", "type": "date"}]"#,
        );
        assert!(res.is_err());
    }
}
