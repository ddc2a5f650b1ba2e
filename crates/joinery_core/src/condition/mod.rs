pub mod parse;

use std::fmt;
use std::str::FromStr;

use crate::errors::JoinError;
use crate::scalar::ScalarValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOperator {
    /// Flip the operator so that the operands can be swapped.
    ///
    /// E.g. 'a >= b' becomes 'b <= a'
    pub const fn flip(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
        }
    }

    pub const fn is_equality(&self) -> bool {
        matches!(self, Self::Eq)
    }

    /// Check an ordering of 'left' relative to 'right' against this operator.
    pub fn is_satisfied_by(&self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering;

        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::LtEq => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::GtEq => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "=="),
            Self::Lt => write!(f, "<"),
            Self::LtEq => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::GtEq => write!(f, ">="),
        }
    }
}

/// Expression over a single row of one side of the join.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinExpr {
    /// Reference a column by name.
    Column(String),
    /// A column plus some constant. Dates are shifted by a number of days.
    Shift { column: String, by: ScalarValue },
}

impl JoinExpr {
    pub fn column(name: impl Into<String>) -> Self {
        JoinExpr::Column(name.into())
    }

    pub fn shift(name: impl Into<String>, by: impl Into<ScalarValue>) -> Self {
        JoinExpr::Shift {
            column: name.into(),
            by: by.into(),
        }
    }

    /// The column this expression reads.
    pub fn column_name(&self) -> &str {
        match self {
            JoinExpr::Column(name) => name,
            JoinExpr::Shift { column, .. } => column,
        }
    }

    /// Returns the column name if this expression is a bare column.
    pub fn as_column(&self) -> Option<&str> {
        match self {
            JoinExpr::Column(name) => Some(name),
            JoinExpr::Shift { .. } => None,
        }
    }
}

impl From<&str> for JoinExpr {
    fn from(value: &str) -> Self {
        JoinExpr::column(value)
    }
}

impl From<String> for JoinExpr {
    fn from(value: String) -> Self {
        JoinExpr::Column(value)
    }
}

impl fmt::Display for JoinExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinExpr::Column(name) => write!(f, "{name}"),
            JoinExpr::Shift { column, by } => match by {
                ScalarValue::Int64(v) if *v < 0 => write!(f, "{column} - {}", v.unsigned_abs()),
                ScalarValue::Float64(v) if *v < 0.0 => write!(f, "{column} - {}", -v),
                by => write!(f, "{column} + {by}"),
            },
        }
    }
}

/// A single comparison between an expression over the left row and an
/// expression over the right row.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinComparison {
    pub left: JoinExpr,
    pub op: ComparisonOperator,
    pub right: JoinExpr,
    /// Only keep the closest matches satisfying this comparison.
    pub closest: bool,
}

impl JoinComparison {
    pub fn new(left: impl Into<JoinExpr>, op: ComparisonOperator, right: impl Into<JoinExpr>) -> Self {
        JoinComparison {
            left: left.into(),
            op,
            right: right.into(),
            closest: false,
        }
    }
}

impl fmt::Display for JoinComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.closest {
            write!(f, "closest({} {} {})", self.left, self.op, self.right)
        } else {
            write!(f, "{} {} {}", self.left, self.op, self.right)
        }
    }
}

/// Conjunction of comparisons between the left and right side.
///
/// An empty condition matches every pair of rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinCondition {
    pub comparisons: Vec<JoinComparison>,
}

impl JoinCondition {
    /// A condition matching every pair of rows.
    pub fn cross() -> Self {
        JoinCondition {
            comparisons: Vec::new(),
        }
    }

    /// Equality on identically named columns on both sides.
    pub fn on<S: AsRef<str>>(columns: impl IntoIterator<Item = S>) -> Self {
        let mut cond = Self::cross();
        for col in columns {
            cond = cond.eq(col.as_ref(), col.as_ref());
        }
        cond
    }

    pub fn parse(s: &str) -> Result<Self, JoinError> {
        parse::Parser::new(s).parse_condition()
    }

    pub fn is_cross(&self) -> bool {
        self.comparisons.is_empty()
    }

    pub fn comparison(
        mut self,
        left: impl Into<JoinExpr>,
        op: ComparisonOperator,
        right: impl Into<JoinExpr>,
    ) -> Self {
        self.comparisons.push(JoinComparison::new(left, op, right));
        self
    }

    pub fn eq(self, left: impl Into<JoinExpr>, right: impl Into<JoinExpr>) -> Self {
        self.comparison(left, ComparisonOperator::Eq, right)
    }

    pub fn lt(self, left: impl Into<JoinExpr>, right: impl Into<JoinExpr>) -> Self {
        self.comparison(left, ComparisonOperator::Lt, right)
    }

    pub fn lt_eq(self, left: impl Into<JoinExpr>, right: impl Into<JoinExpr>) -> Self {
        self.comparison(left, ComparisonOperator::LtEq, right)
    }

    pub fn gt(self, left: impl Into<JoinExpr>, right: impl Into<JoinExpr>) -> Self {
        self.comparison(left, ComparisonOperator::Gt, right)
    }

    pub fn gt_eq(self, left: impl Into<JoinExpr>, right: impl Into<JoinExpr>) -> Self {
        self.comparison(left, ComparisonOperator::GtEq, right)
    }

    /// Add a rolling comparison, keeping only the closest matches.
    pub fn closest(
        mut self,
        left: impl Into<JoinExpr>,
        op: ComparisonOperator,
        right: impl Into<JoinExpr>,
    ) -> Self {
        let mut cmp = JoinComparison::new(left, op, right);
        cmp.closest = true;
        self.comparisons.push(cmp);
        self
    }

    /// `x` lies within `[y_lower, y_upper]`.
    pub fn between(
        self,
        x: impl Into<JoinExpr>,
        y_lower: impl Into<JoinExpr>,
        y_upper: impl Into<JoinExpr>,
    ) -> Self {
        let x = x.into();
        self.gt_eq(x.clone(), y_lower).lt_eq(x, y_upper)
    }

    /// `[x_lower, x_upper]` lies entirely within `[y_lower, y_upper]`.
    pub fn within(
        self,
        x_lower: impl Into<JoinExpr>,
        x_upper: impl Into<JoinExpr>,
        y_lower: impl Into<JoinExpr>,
        y_upper: impl Into<JoinExpr>,
    ) -> Self {
        self.gt_eq(x_lower, y_lower).lt_eq(x_upper, y_upper)
    }

    /// `[x_lower, x_upper]` and `[y_lower, y_upper]` share at least one point.
    pub fn overlaps(
        self,
        x_lower: impl Into<JoinExpr>,
        x_upper: impl Into<JoinExpr>,
        y_lower: impl Into<JoinExpr>,
        y_upper: impl Into<JoinExpr>,
    ) -> Self {
        self.lt_eq(x_lower, y_upper).gt_eq(x_upper, y_lower)
    }
}

impl FromStr for JoinCondition {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JoinCondition::parse(s)
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comparisons.is_empty() {
            return write!(f, "cross");
        }
        let s = self
            .comparisons
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::*;

    #[test]
    fn flip_comparison() {
        assert_eq!(ComparisonOperator::LtEq, ComparisonOperator::GtEq.flip());
        assert_eq!(ComparisonOperator::Eq, ComparisonOperator::Eq.flip());
    }

    #[test]
    fn operator_satisfied() {
        assert!(ComparisonOperator::LtEq.is_satisfied_by(Ordering::Equal));
        assert!(!ComparisonOperator::Lt.is_satisfied_by(Ordering::Equal));
        assert!(ComparisonOperator::Gt.is_satisfied_by(Ordering::Greater));
    }

    #[test]
    fn overlap_helpers_expand() {
        let cond = JoinCondition::cross().overlaps("start", "end", "start", "end");
        assert_eq!("start <= end, end >= start", cond.to_string());

        let cond = JoinCondition::cross().between("x", "lower", "upper");
        assert_eq!("x >= lower, x <= upper", cond.to_string());

        let cond = JoinCondition::cross().within("a", "b", "c", "d");
        assert_eq!("a >= c, b <= d", cond.to_string());
    }

    #[test]
    fn display_shift_and_closest() {
        let cond = JoinCondition::cross()
            .closest("birthday", ComparisonOperator::GtEq, "party")
            .lt(JoinExpr::shift("a", -3), JoinExpr::shift("b", 2));
        assert_eq!("closest(birthday >= party), a - 3 < b + 2", cond.to_string());
    }

    #[test]
    fn on_same_names() {
        let cond = JoinCondition::on(["a", "b"]);
        assert_eq!("a == a, b == b", cond.to_string());
        assert!(JoinCondition::cross().is_cross());
    }
}
