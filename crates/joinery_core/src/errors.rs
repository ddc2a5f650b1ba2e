use crate::join_type::JoinSide;
use crate::options::Relationship;

#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// A referenced column doesn't exist, operand types can't be compared, or
    /// a table is malformed.
    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid join condition: {0}")]
    InvalidCondition(String),

    #[error("invalid join options: {0}")]
    InvalidOptions(String),

    #[error("failed to parse join condition at position {position}: {message}")]
    Parse { message: String, position: usize },

    #[error(
        "expected a {expected} relationship, but {side} row {row} matches {matches} rows on the other side"
    )]
    RelationshipViolation {
        expected: Relationship,
        side: JoinSide,
        row: usize,
        matches: usize,
    },

    #[error("{} {side} row(s) have no match: {}", rows.len(), format_rows(rows))]
    UnmatchedRows { side: JoinSide, rows: Vec<usize> },

    #[error("cannot infer natural join key: {reason}")]
    AmbiguousNaturalKey { reason: String },

    #[error("join would produce at least {rows} rows, exceeding the limit of {limit}")]
    OutputLimitExceeded { limit: usize, rows: usize },
}

pub type Result<T, E = JoinError> = std::result::Result<T, E>;

/// Formats row indices for an error message, truncating long lists.
pub(crate) fn format_rows(rows: &[usize]) -> String {
    const MAX_SHOWN: usize = 10;

    let mut s = rows
        .iter()
        .take(MAX_SHOWN)
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if rows.len() > MAX_SHOWN {
        s.push_str(&format!(", ... ({} more)", rows.len() - MAX_SHOWN));
    }
    s
}

macro_rules! schema_err {
    ($($arg:tt)*) => {
        crate::errors::JoinError::Schema(std::format!($($arg)*))
    };
}
pub(crate) use schema_err;
