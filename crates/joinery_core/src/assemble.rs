//! Assembly of join output tables from matches.

use std::collections::HashSet;

use tracing::trace;

use crate::enumerate::MatchSet;
use crate::errors::{JoinError, Result};
use crate::join_type::{JoinSide, JoinType};
use crate::options::JoinOptions;
use crate::predicate::CompiledPredicate;
use crate::scalar::ScalarValue;
use crate::table::schema::{Field, Schema};
use crate::table::{RowStore, Table};

/// A single output row's source rows.
///
/// At most one side is absent, an absent side is rendered as all missing
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPair {
    left: Option<usize>,
    right: Option<usize>,
}

impl MatchPair {
    pub const fn both(left: usize, right: usize) -> Self {
        MatchPair {
            left: Some(left),
            right: Some(right),
        }
    }

    pub const fn left_only(left: usize) -> Self {
        MatchPair {
            left: Some(left),
            right: None,
        }
    }

    pub const fn right_only(right: usize) -> Self {
        MatchPair {
            left: None,
            right: Some(right),
        }
    }

    pub const fn left(&self) -> Option<usize> {
        self.left
    }

    pub const fn right(&self) -> Option<usize> {
        self.right
    }
}

/// Produce the output row order for a join type.
///
/// Matched pairs are ordered by left row, then right row. Unmatched left rows
/// of LEFT and FULL joins appear inline at their left position. Unmatched right
/// rows of RIGHT and FULL joins are appended at the end in right order.
pub fn match_pairs(matches: &MatchSet, join_type: JoinType) -> Vec<MatchPair> {
    let left_tracker = matches.tracker(JoinSide::Left);

    match join_type {
        JoinType::Semi => left_tracker.matched_rows().map(MatchPair::left_only).collect(),
        JoinType::Anti => left_tracker
            .unmatched_rows()
            .map(MatchPair::left_only)
            .collect(),
        _ => {
            let mut pairs = Vec::with_capacity(matches.num_pairs());
            for left_idx in 0..matches.num_left_rows() {
                let rights = matches.left_matches(left_idx);
                if rights.is_empty() && join_type.pads_left() {
                    pairs.push(MatchPair::left_only(left_idx));
                }
                pairs.extend(rights.iter().map(|&r| MatchPair::both(left_idx, r)));
            }
            if join_type.pads_right() {
                pairs.extend(
                    matches
                        .tracker(JoinSide::Right)
                        .unmatched_rows()
                        .map(MatchPair::right_only),
                );
            }
            pairs
        }
    }
}

/// Source of an output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputColumn {
    Left(usize),
    Right(usize),
    /// Collapsed equality key. Takes the left value, or the right value when
    /// there's no left row.
    Merged { left: usize, right: usize },
}

/// Output columns for a join.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    pub schema: Schema,
    pub columns: Vec<OutputColumn>,
}

impl OutputLayout {
    pub fn try_new(
        left: &Schema,
        right: &Schema,
        predicate: &CompiledPredicate,
        join_type: JoinType,
        options: &JoinOptions,
    ) -> Result<Self> {
        if join_type.is_filtering() {
            return Ok(OutputLayout {
                schema: left.clone(),
                columns: (0..left.num_columns()).map(OutputColumn::Left).collect(),
            });
        }

        // (left col, right col) for collapsed equality keys.
        let mut merged: Vec<(usize, usize)> = Vec::new();
        if !options.keep {
            for cmp in predicate.equality_comparisons() {
                if !cmp.left.is_bare_column() || !cmp.right.is_bare_column() {
                    continue;
                }
                if cmp.left.datatype != cmp.right.datatype {
                    continue;
                }
                let already = merged
                    .iter()
                    .any(|(l, r)| *l == cmp.left.col || *r == cmp.right.col);
                if !already {
                    merged.push((cmp.left.col, cmp.right.col));
                }
            }
        }

        let right_kept: Vec<usize> = (0..right.num_columns())
            .filter(|idx| !merged.iter().any(|(_, r)| r == idx))
            .collect();

        let (left_suffix, right_suffix) = &options.suffix;
        let in_right = |name: &str| {
            right_kept
                .iter()
                .any(|&idx| right.fields()[idx].name == name)
        };

        let mut columns = Vec::with_capacity(left.num_columns() + right_kept.len());
        let mut names = Vec::with_capacity(columns.capacity());

        for (idx, field) in left.fields().iter().enumerate() {
            match merged.iter().find(|(l, _)| *l == idx) {
                Some(&(l, r)) => {
                    columns.push(OutputColumn::Merged { left: l, right: r });
                    names.push((field.name.clone(), left_suffix));
                }
                None => {
                    columns.push(OutputColumn::Left(idx));
                    let name = if in_right(&field.name) {
                        format!("{}{left_suffix}", field.name)
                    } else {
                        field.name.clone()
                    };
                    names.push((name, left_suffix));
                }
            }
        }

        for &idx in &right_kept {
            let field = &right.fields()[idx];
            columns.push(OutputColumn::Right(idx));
            let name = if left.index_of(&field.name).is_some() {
                format!("{}{right_suffix}", field.name)
            } else {
                field.name.clone()
            };
            names.push((name, right_suffix));
        }

        // Suffixed names may still clash with existing names, keep suffixing
        // until unique.
        let mut taken = HashSet::with_capacity(names.len());
        let mut fields = Vec::with_capacity(names.len());
        for ((mut name, suffix), col) in names.into_iter().zip(&columns) {
            while taken.contains(&name) {
                name.push_str(suffix);
            }
            taken.insert(name.clone());

            let datatype = match *col {
                OutputColumn::Left(idx) | OutputColumn::Merged { left: idx, .. } => {
                    left.fields()[idx].datatype
                }
                OutputColumn::Right(idx) => right.fields()[idx].datatype,
            };
            fields.push(Field::new(name, datatype));
        }

        Ok(OutputLayout {
            schema: Schema::try_new(fields)?,
            columns,
        })
    }
}

/// Renders match pairs into an output table.
#[derive(Debug)]
pub struct JoinAssembler<'a> {
    left: &'a dyn RowStore,
    right: &'a dyn RowStore,
    join_type: JoinType,
    layout: OutputLayout,
    max_output_rows: Option<usize>,
}

impl<'a> JoinAssembler<'a> {
    pub fn try_new(
        left: &'a dyn RowStore,
        right: &'a dyn RowStore,
        predicate: &CompiledPredicate,
        join_type: JoinType,
        options: &JoinOptions,
    ) -> Result<Self> {
        let layout =
            OutputLayout::try_new(left.schema(), right.schema(), predicate, join_type, options)?;
        Ok(JoinAssembler {
            left,
            right,
            join_type,
            layout,
            max_output_rows: options.max_output_rows,
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Build the output table.
    ///
    /// Fails without producing rows if the output would exceed the row
    /// budget.
    pub fn assemble(&self, matches: &MatchSet) -> Result<Table> {
        let pairs = match_pairs(matches, self.join_type);
        if let Some(limit) = self.max_output_rows {
            if pairs.len() > limit {
                return Err(JoinError::OutputLimitExceeded {
                    limit,
                    rows: pairs.len(),
                });
            }
        }

        trace!(rows = pairs.len(), join_type = %self.join_type, "assembling join output");

        let rows = pairs.iter().map(|pair| self.render_row(pair)).collect();
        Ok(Table::new_unchecked(self.layout.schema.clone(), rows))
    }

    fn render_row(&self, pair: &MatchPair) -> Vec<ScalarValue> {
        self.layout
            .columns
            .iter()
            .map(|col| match *col {
                OutputColumn::Left(idx) => match pair.left {
                    Some(row) => self.left.value(row, idx).clone(),
                    None => ScalarValue::Null,
                },
                OutputColumn::Right(idx) => match pair.right {
                    Some(row) => self.right.value(row, idx).clone(),
                    None => ScalarValue::Null,
                },
                OutputColumn::Merged { left, right } => match (pair.left, pair.right) {
                    (Some(row), _) => self.left.value(row, left).clone(),
                    (None, Some(row)) => self.right.value(row, right).clone(),
                    (None, None) => ScalarValue::Null,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::JoinCondition;
    use crate::scalar::DataType;
    use crate::testutil::table;

    fn schema(cols: &[(&str, DataType)]) -> Schema {
        Schema::try_new(cols.iter().map(|(n, t)| Field::new(*n, *t))).unwrap()
    }

    fn layout(
        left: &Schema,
        right: &Schema,
        cond: &JoinCondition,
        join_type: JoinType,
        options: &JoinOptions,
    ) -> OutputLayout {
        let pred = CompiledPredicate::compile(cond, left, right).unwrap();
        OutputLayout::try_new(left, right, &pred, join_type, options).unwrap()
    }

    fn names(layout: &OutputLayout) -> Vec<&str> {
        layout.schema.column_names().collect()
    }

    #[test]
    fn collapse_equal_keys() {
        let left = schema(&[("key", DataType::Int64), ("val", DataType::Utf8)]);
        let right = schema(&[("key", DataType::Int64), ("val", DataType::Utf8)]);
        let l = layout(
            &left,
            &right,
            &JoinCondition::on(["key"]),
            JoinType::Inner,
            &JoinOptions::default(),
        );
        assert_eq!(vec!["key", "val.x", "val.y"], names(&l));
        assert_eq!(
            OutputColumn::Merged { left: 0, right: 0 },
            l.columns[0]
        );
    }

    #[test]
    fn keep_both_keys() {
        let left = schema(&[("key", DataType::Int64), ("val", DataType::Utf8)]);
        let right = schema(&[("key", DataType::Int64), ("val", DataType::Utf8)]);
        let l = layout(
            &left,
            &right,
            &JoinCondition::on(["key"]),
            JoinType::Inner,
            &JoinOptions::default().with_keep(true),
        );
        assert_eq!(vec!["key.x", "val.x", "key.y", "val.y"], names(&l));
    }

    #[test]
    fn differently_named_keys() {
        let left = schema(&[("a", DataType::Int64), ("b", DataType::Int64)]);
        let right = schema(&[("b", DataType::Int64), ("c", DataType::Int64)]);
        let l = layout(
            &left,
            &right,
            &JoinCondition::cross().eq("a", "b"),
            JoinType::Left,
            &JoinOptions::default(),
        );
        // Right 'b' is collapsed into left 'a', so left 'b' doesn't collide.
        assert_eq!(vec!["a", "b", "c"], names(&l));
    }

    #[test]
    fn merged_key_keeps_name_on_collision() {
        let left = schema(&[("a", DataType::Int64)]);
        let right = schema(&[("b", DataType::Int64), ("a", DataType::Int64)]);
        let l = layout(
            &left,
            &right,
            &JoinCondition::cross().eq("a", "b"),
            JoinType::Inner,
            &JoinOptions::default(),
        );
        assert_eq!(vec!["a", "a.y"], names(&l));
    }

    #[test]
    fn inequality_keys_not_collapsed() {
        let left = schema(&[("id", DataType::Int64)]);
        let right = schema(&[("id", DataType::Int64)]);
        let l = layout(
            &left,
            &right,
            &JoinCondition::cross().lt("id", "id"),
            JoinType::Inner,
            &JoinOptions::default(),
        );
        assert_eq!(vec!["id.x", "id.y"], names(&l));
    }

    #[test]
    fn suffix_clash_resolved() {
        let left = schema(&[("v", DataType::Int64), ("v_l", DataType::Int64)]);
        let right = schema(&[("v", DataType::Int64)]);
        let l = layout(
            &left,
            &right,
            &JoinCondition::cross(),
            JoinType::Cross,
            &JoinOptions::default().with_suffix("_l", "_r"),
        );
        assert_eq!(vec!["v_l", "v_l_l", "v_r"], names(&l));
    }

    #[test]
    fn filtering_joins_only_left() {
        let left = schema(&[("key", DataType::Int64), ("x", DataType::Utf8)]);
        let right = schema(&[("key", DataType::Int64), ("y", DataType::Utf8)]);
        let l = layout(
            &left,
            &right,
            &JoinCondition::on(["key"]),
            JoinType::Anti,
            &JoinOptions::default(),
        );
        assert_eq!(vec!["key", "x"], names(&l));
    }

    #[test]
    fn pair_ordering() {
        // Left 0 -> right 1, left 1 unmatched, left 2 -> right 0, 1. Right 2
        // unmatched.
        let set = MatchSet::from_left_matches(vec![vec![1], vec![], vec![0, 1]], 3);

        assert_eq!(
            vec![
                MatchPair::both(0, 1),
                MatchPair::both(2, 0),
                MatchPair::both(2, 1)
            ],
            match_pairs(&set, JoinType::Inner)
        );
        assert_eq!(
            vec![
                MatchPair::both(0, 1),
                MatchPair::left_only(1),
                MatchPair::both(2, 0),
                MatchPair::both(2, 1)
            ],
            match_pairs(&set, JoinType::Left)
        );
        assert_eq!(
            vec![
                MatchPair::both(0, 1),
                MatchPair::both(2, 0),
                MatchPair::both(2, 1),
                MatchPair::right_only(2)
            ],
            match_pairs(&set, JoinType::Right)
        );
        assert_eq!(
            vec![
                MatchPair::both(0, 1),
                MatchPair::left_only(1),
                MatchPair::both(2, 0),
                MatchPair::both(2, 1),
                MatchPair::right_only(2)
            ],
            match_pairs(&set, JoinType::Full)
        );
        assert_eq!(
            vec![MatchPair::left_only(0), MatchPair::left_only(2)],
            match_pairs(&set, JoinType::Semi)
        );
        assert_eq!(
            vec![MatchPair::left_only(1)],
            match_pairs(&set, JoinType::Anti)
        );
    }

    #[test]
    fn right_only_rows_fill_merged_key() {
        let left = table(
            &[("key", DataType::Int64), ("x", DataType::Utf8)],
            vec![vec![1.into(), "x1".into()]],
        );
        let right = table(
            &[("key", DataType::Int64), ("y", DataType::Utf8)],
            vec![vec![1.into(), "y1".into()], vec![4.into(), "y4".into()]],
        );
        let pred =
            CompiledPredicate::compile(&JoinCondition::on(["key"]), left.schema(), right.schema())
                .unwrap();
        let assembler = JoinAssembler::try_new(
            &left,
            &right,
            &pred,
            JoinType::Full,
            &JoinOptions::default(),
        )
        .unwrap();

        let set = MatchSet::from_left_matches(vec![vec![0]], 2);
        let out = assembler.assemble(&set).unwrap();
        let expected: Vec<Vec<ScalarValue>> = vec![
            vec![1.into(), "x1".into(), "y1".into()],
            vec![4.into(), ScalarValue::Null, "y4".into()],
        ];
        assert_eq!(expected, out.rows());
    }

    #[test]
    fn output_limit() {
        let left = table(&[("a", DataType::Int64)], vec![vec![1.into()], vec![2.into()]]);
        let right = table(&[("b", DataType::Int64)], vec![vec![1.into()], vec![2.into()]]);
        let pred =
            CompiledPredicate::compile(&JoinCondition::cross(), left.schema(), right.schema())
                .unwrap();
        let assembler = JoinAssembler::try_new(
            &left,
            &right,
            &pred,
            JoinType::Cross,
            &JoinOptions::default().with_max_output_rows(3),
        )
        .unwrap();

        let set = MatchSet::from_left_matches(vec![vec![0, 1], vec![0, 1]], 2);
        let err = assembler.assemble(&set).unwrap_err();
        assert!(matches!(
            err,
            JoinError::OutputLimitExceeded { limit: 3, rows: 4 }
        ));
    }
}
