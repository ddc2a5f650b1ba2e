use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::errors::{JoinError, Result, format_rows};
use crate::join_type::JoinSide;
use crate::options::{Reaction, Relationship};

/// A non-fatal condition detected during a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Both sides have rows matching multiple rows on the other side, and no
    /// relationship was declared.
    ManyToMany { left_row: usize, right_row: usize },
    /// Declared relationship doesn't hold.
    RelationshipViolation {
        expected: Relationship,
        side: JoinSide,
        row: usize,
        matches: usize,
    },
    /// Rows on a checked side without a match.
    UnmatchedRows { side: JoinSide, rows: Vec<usize> },
    /// Columns a natural join was performed on.
    NaturalKey { columns: Vec<String> },
    /// Shared columns left out of a natural join key.
    AmbiguousNaturalKey { reason: String },
}

impl Diagnostic {
    /// Convert into the error reported when this diagnostic is fatal.
    ///
    /// Informational diagnostics (undeclared many-to-many fan-out, natural
    /// key disclosure) have no error form and are handed back.
    pub fn into_error(self) -> Result<JoinError, Diagnostic> {
        match self {
            Diagnostic::RelationshipViolation {
                expected,
                side,
                row,
                matches,
            } => Ok(JoinError::RelationshipViolation {
                expected,
                side,
                row,
                matches,
            }),
            Diagnostic::UnmatchedRows { side, rows } => Ok(JoinError::UnmatchedRows { side, rows }),
            informational @ (Diagnostic::ManyToMany { .. }
            | Diagnostic::NaturalKey { .. }
            | Diagnostic::AmbiguousNaturalKey { .. }) => Err(informational),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManyToMany {
                left_row,
                right_row,
            } => write!(
                f,
                "Detected an unexpected many-to-many relationship: left row {left_row} matches multiple right rows, and right row {right_row} matches multiple left rows"
            ),
            Self::RelationshipViolation {
                expected,
                side,
                row,
                matches,
            } => write!(
                f,
                "Expected a {expected} relationship, but {side} row {row} matches {matches} rows on the other side"
            ),
            Self::UnmatchedRows { side, rows } => write!(
                f,
                "{} {side} row(s) have no match: {}",
                rows.len(),
                format_rows(rows)
            ),
            Self::NaturalKey { columns } => {
                write!(f, "Joining on shared columns: {}", columns.join(", "))
            }
            Self::AmbiguousNaturalKey { reason } => write!(f, "Ambiguous natural key: {reason}"),
        }
    }
}

/// Collects diagnostics for a single join.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// React to a detected condition.
    ///
    /// Detection always happens upstream; the reaction alone decides if the
    /// diagnostic is dropped, recorded, or turned into an error.
    pub fn report(&mut self, reaction: Reaction, diagnostic: Diagnostic) -> Result<()> {
        match reaction {
            Reaction::Ignore => Ok(()),
            Reaction::Warn => {
                self.record(diagnostic);
                Ok(())
            }
            Reaction::Error => match diagnostic.into_error() {
                Ok(err) => Err(err),
                Err(informational) => {
                    self.record(informational);
                    Ok(())
                }
            },
        }
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        warn!(%diagnostic, "join diagnostic");
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
