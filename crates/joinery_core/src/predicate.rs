//! Compiled join predicates.
//!
//! Compilation resolves column names against both schemas and type checks every
//! comparison so that no row is scanned with a broken condition.

use std::borrow::Cow;
use std::fmt;

use crate::condition::{ComparisonOperator, JoinComparison, JoinCondition, JoinExpr};
use crate::errors::{JoinError, Result, schema_err};
use crate::join_type::JoinSide;
use crate::scalar::{DataType, Distance, ScalarValue};
use crate::table::RowRef;
use crate::table::schema::Schema;

/// An expression with its column resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    /// Column index in the store for this side.
    pub col: usize,
    /// Constant added to the column value.
    pub shift: Option<ScalarValue>,
    /// Output type of the expression.
    pub datatype: DataType,
}

impl CompiledExpr {
    /// A bare column reference.
    pub fn column(col: usize, datatype: DataType) -> Self {
        CompiledExpr {
            col,
            shift: None,
            datatype,
        }
    }

    fn compile(expr: &JoinExpr, schema: &Schema, side: JoinSide) -> Result<Self> {
        let col = schema.try_index_of(expr.column_name(), side)?;
        let col_type = schema.fields()[col].datatype;

        match expr {
            JoinExpr::Column(_) => Ok(CompiledExpr {
                col,
                shift: None,
                datatype: col_type,
            }),
            JoinExpr::Shift { column, by } => {
                let datatype = match (col_type, by.datatype()) {
                    (DataType::Int64, Some(DataType::Int64)) => DataType::Int64,
                    (DataType::Float64, Some(DataType::Int64 | DataType::Float64)) => {
                        DataType::Float64
                    }
                    (DataType::Date, Some(DataType::Int64)) => DataType::Date,
                    (_, by_type) => {
                        return Err(schema_err!(
                            "Cannot add {} to {side} column '{column}' of type {col_type}",
                            by_type.map(|t| t.to_string()).unwrap_or_else(|| "NA".to_string()),
                        ));
                    }
                };
                Ok(CompiledExpr {
                    col,
                    shift: Some(by.clone()),
                    datatype,
                })
            }
        }
    }

    /// Evaluate the expression for a row.
    ///
    /// Overflowing shifts produce a missing value.
    pub fn eval<'a>(&self, row: RowRef<'a>) -> Cow<'a, ScalarValue> {
        let value = row.value(self.col);
        match &self.shift {
            None => Cow::Borrowed(value),
            Some(by) => Cow::Owned(value.checked_add(by).unwrap_or(ScalarValue::Null)),
        }
    }

    /// If this expression is the bare column with no shift.
    pub fn is_bare_column(&self) -> bool {
        self.shift.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledComparison {
    pub left: CompiledExpr,
    pub op: ComparisonOperator,
    pub right: CompiledExpr,
    pub closest: bool,
}

impl CompiledComparison {
    /// Check the comparison for a pair of rows.
    ///
    /// Missing values on either side never match.
    pub fn matches(&self, left: RowRef, right: RowRef) -> bool {
        let l = self.left.eval(left);
        let r = self.right.eval(right);
        match l.compare(&r) {
            Some(ord) => self.op.is_satisfied_by(ord),
            None => false,
        }
    }

    /// Non-negative distance between operands that satisfy this comparison.
    ///
    /// For `l >= r` (and `l > r`) this is `l - r`, for `l <= r` (and `l < r`)
    /// this is `r - l`.
    pub fn distance(&self, left: RowRef, right: RowRef) -> Option<Distance> {
        let l = self.left.eval(left);
        let r = self.right.eval(right);
        match self.op {
            ComparisonOperator::Gt | ComparisonOperator::GtEq => l.distance_from(&r),
            ComparisonOperator::Lt | ComparisonOperator::LtEq => r.distance_from(&l),
            ComparisonOperator::Eq => None,
        }
    }
}

/// Result of evaluating a predicate on a pair of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub matches: bool,
    /// Distance for the closest comparison, only set when the rows match and
    /// the predicate has a closest comparison.
    pub distance: Option<Distance>,
}

impl Evaluation {
    const NO_MATCH: Evaluation = Evaluation {
        matches: false,
        distance: None,
    };
}

/// A join condition compiled against a pair of schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    comparisons: Vec<CompiledComparison>,
    /// Index of the closest comparison if there is one.
    closest: Option<usize>,
    condition: JoinCondition,
}

impl CompiledPredicate {
    /// Compile a condition.
    ///
    /// Errors if any referenced column is missing, if the operands of a
    /// comparison have incompatible types, or if closest is used incorrectly.
    pub fn compile(condition: &JoinCondition, left: &Schema, right: &Schema) -> Result<Self> {
        let mut comparisons = Vec::with_capacity(condition.comparisons.len());
        let mut closest = None;

        for (idx, cmp) in condition.comparisons.iter().enumerate() {
            let compiled = Self::compile_comparison(cmp, left, right)?;
            if compiled.closest {
                if closest.is_some() {
                    return Err(JoinError::InvalidCondition(format!(
                        "Only one closest comparison is allowed, found a second one: {cmp}"
                    )));
                }
                closest = Some(idx);
            }
            comparisons.push(compiled);
        }

        Ok(CompiledPredicate {
            comparisons,
            closest,
            condition: condition.clone(),
        })
    }

    fn compile_comparison(
        cmp: &JoinComparison,
        left: &Schema,
        right: &Schema,
    ) -> Result<CompiledComparison> {
        let l = CompiledExpr::compile(&cmp.left, left, JoinSide::Left)?;
        let r = CompiledExpr::compile(&cmp.right, right, JoinSide::Right)?;

        if !l.datatype.is_comparable_with(&r.datatype) {
            return Err(schema_err!(
                "Cannot compare {} ({}) with {} ({}) in '{cmp}'",
                cmp.left,
                l.datatype,
                cmp.right,
                r.datatype
            ));
        }

        if cmp.closest {
            if cmp.op.is_equality() {
                return Err(JoinError::InvalidCondition(format!(
                    "closest() requires an inequality, got '{cmp}'"
                )));
            }
            if !l.datatype.supports_distance() || !r.datatype.supports_distance() {
                return Err(JoinError::InvalidCondition(format!(
                    "closest() requires numeric or date operands, got {} and {}",
                    l.datatype, r.datatype
                )));
            }
        }

        Ok(CompiledComparison {
            left: l,
            op: cmp.op,
            right: r,
            closest: cmp.closest,
        })
    }

    /// The condition this predicate was compiled from.
    pub fn condition(&self) -> &JoinCondition {
        &self.condition
    }

    pub fn comparisons(&self) -> &[CompiledComparison] {
        &self.comparisons
    }

    /// If this predicate matches every pair of rows.
    pub fn is_cross(&self) -> bool {
        self.comparisons.is_empty()
    }

    pub fn has_closest(&self) -> bool {
        self.closest.is_some()
    }

    pub fn has_equality(&self) -> bool {
        self.comparisons.iter().any(|c| c.op.is_equality())
    }

    /// If every comparison is an equality.
    pub fn is_equi(&self) -> bool {
        !self.comparisons.is_empty() && self.comparisons.iter().all(|c| c.op.is_equality())
    }

    /// Equality comparisons, used as the hash key.
    pub fn equality_comparisons(&self) -> impl Iterator<Item = &CompiledComparison> {
        self.comparisons.iter().filter(|c| c.op.is_equality())
    }

    /// Evaluate all comparisons for a pair of rows.
    pub fn evaluate(&self, left: RowRef, right: RowRef) -> Evaluation {
        if !self.comparisons.iter().all(|c| c.matches(left, right)) {
            return Evaluation::NO_MATCH;
        }
        Evaluation {
            matches: true,
            distance: self.distance(left, right),
        }
    }

    /// Evaluate only the non-equality comparisons.
    ///
    /// Used after a hash lookup has already established equality.
    pub fn evaluate_residual(&self, left: RowRef, right: RowRef) -> bool {
        self.comparisons
            .iter()
            .filter(|c| !c.op.is_equality())
            .all(|c| c.matches(left, right))
    }

    /// Distance for the closest comparison.
    pub fn distance(&self, left: RowRef, right: RowRef) -> Option<Distance> {
        let idx = self.closest?;
        self.comparisons[idx].distance(left, right)
    }
}

impl fmt::Display for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.condition)
    }
}
