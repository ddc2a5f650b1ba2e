//! Natural joins, joining on the columns both sides share by name.

use tracing::debug;

use crate::condition::JoinCondition;
use crate::diagnostics::Diagnostic;
use crate::errors::{JoinError, Result};
use crate::join::{JoinOutput, join};
use crate::join_type::JoinType;
use crate::options::JoinOptions;
use crate::table::RowStore;
use crate::table::schema::Schema;

/// Build an equality condition over the columns shared by both schemas.
///
/// The chosen columns are always disclosed through a diagnostic. Shared
/// columns whose types can't be compared are left out and reported.
pub fn natural_condition(
    left: &Schema,
    right: &Schema,
) -> Result<(JoinCondition, Vec<Diagnostic>)> {
    let mut columns = Vec::new();
    let mut incompatible = Vec::new();

    for field in left.fields() {
        let Some(idx) = right.index_of(&field.name) else {
            continue;
        };
        let other = &right.fields()[idx];
        if field.datatype.is_comparable_with(&other.datatype) {
            columns.push(field.name.clone());
        } else {
            incompatible.push(format!(
                "'{}' ({} and {})",
                field.name, field.datatype, other.datatype
            ));
        }
    }

    if columns.is_empty() {
        let reason = if incompatible.is_empty() {
            "no shared columns".to_string()
        } else {
            format!(
                "no shared columns with comparable types, skipped {}",
                incompatible.join(", ")
            )
        };
        return Err(JoinError::AmbiguousNaturalKey { reason });
    }

    debug!(?columns, "inferred natural join key");

    let mut diagnostics = vec![Diagnostic::NaturalKey {
        columns: columns.clone(),
    }];
    if !incompatible.is_empty() {
        diagnostics.push(Diagnostic::AmbiguousNaturalKey {
            reason: format!(
                "skipped shared columns with incomparable types: {}",
                incompatible.join(", ")
            ),
        });
    }

    Ok((JoinCondition::on(columns), diagnostics))
}

/// Join on all shared columns.
///
/// Diagnostics describing the inferred key precede the join's own.
pub fn natural_join(
    left: &dyn RowStore,
    right: &dyn RowStore,
    join_type: JoinType,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    let (condition, mut diagnostics) = natural_condition(left.schema(), right.schema())?;
    for diagnostic in &diagnostics {
        tracing::warn!(%diagnostic, "natural join");
    }

    let mut output = join(left, right, join_type, &condition, options)?;
    diagnostics.append(&mut output.diagnostics);
    output.diagnostics = diagnostics;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::DataType;
    use crate::table::schema::Field;
    use crate::testutil::{column_strings, table};

    fn schema(cols: &[(&str, DataType)]) -> Schema {
        Schema::try_new(cols.iter().map(|(n, t)| Field::new(*n, *t))).unwrap()
    }

    #[test]
    fn shared_columns_in_left_order() {
        let left = schema(&[
            ("year", DataType::Int64),
            ("carrier", DataType::Utf8),
            ("dep", DataType::Int64),
        ]);
        let right = schema(&[("carrier", DataType::Utf8), ("year", DataType::Float64)]);

        let (cond, diags) = natural_condition(&left, &right).unwrap();
        assert_eq!("year == year, carrier == carrier", cond.to_string());
        assert_eq!(
            vec![Diagnostic::NaturalKey {
                columns: vec!["year".to_string(), "carrier".to_string()]
            }],
            diags
        );
    }

    #[test]
    fn incomparable_shared_column_reported() {
        let left = schema(&[("id", DataType::Int64), ("year", DataType::Int64)]);
        let right = schema(&[("id", DataType::Int64), ("year", DataType::Utf8)]);

        let (cond, diags) = natural_condition(&left, &right).unwrap();
        assert_eq!("id == id", cond.to_string());
        assert_eq!(2, diags.len());
        assert!(matches!(diags[1], Diagnostic::AmbiguousNaturalKey { .. }));
    }

    #[test]
    fn no_shared_columns() {
        let left = schema(&[("a", DataType::Int64)]);
        let right = schema(&[("b", DataType::Int64)]);
        let err = natural_condition(&left, &right).unwrap_err();
        assert!(matches!(err, JoinError::AmbiguousNaturalKey { .. }));
    }

    #[test]
    fn natural_join_discloses_key() {
        let left = table(
            &[("key", DataType::Int64), ("x", DataType::Utf8)],
            vec![vec![1.into(), "x1".into()], vec![2.into(), "x2".into()]],
        );
        let right = table(
            &[("key", DataType::Int64), ("y", DataType::Utf8)],
            vec![vec![2.into(), "y2".into()]],
        );
        let out = natural_join(&left, &right, JoinType::Inner, &JoinOptions::default()).unwrap();
        assert_eq!(vec!["2"], column_strings(&out.table, "key"));
        assert_eq!(vec!["y2"], column_strings(&out.table, "y"));
        assert_eq!(
            Diagnostic::NaturalKey {
                columns: vec!["key".to_string()]
            },
            out.diagnostics[0]
        );
    }
}
