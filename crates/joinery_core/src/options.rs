use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{JoinError, Result};

/// Default row count at which matching switches to a parallel scan.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8192;

/// Options for a single join.
///
/// Every field has a default, so a partially specified configuration
/// deserializes into a valid set of options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinOptions {
    /// Suffixes appended to colliding column names from the left and right
    /// sides.
    pub suffix: (String, String),
    /// Keep both key columns of equality comparisons instead of collapsing
    /// them into the left column.
    pub keep: bool,
    /// Expected relationship between the two sides. When set, a violation is
    /// an error.
    pub relationship: Option<Relationship>,
    /// What to do when rows on a checked side have no match.
    pub unmatched: UnmatchedPolicy,
    /// Which matches to keep when a left row matches multiple right rows.
    pub multiple: MultipleMatches,
    /// Refuse to produce more output rows than this.
    pub max_output_rows: Option<usize>,
    /// Scan side row count at which matching runs in parallel.
    pub parallel_threshold: usize,
}

impl Default for JoinOptions {
    fn default() -> Self {
        JoinOptions {
            suffix: (".x".to_string(), ".y".to_string()),
            keep: false,
            relationship: None,
            unmatched: UnmatchedPolicy::Drop,
            multiple: MultipleMatches::All,
            max_output_rows: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl JoinOptions {
    pub fn with_suffix(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.suffix = (left.into(), right.into());
        self
    }

    pub fn with_keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationship = Some(relationship);
        self
    }

    pub fn with_unmatched(mut self, unmatched: UnmatchedPolicy) -> Self {
        self.unmatched = unmatched;
        self
    }

    pub fn with_multiple(mut self, multiple: MultipleMatches) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn with_max_output_rows(mut self, max: usize) -> Self {
        self.max_output_rows = Some(max);
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.suffix.0 == self.suffix.1 {
            return Err(JoinError::InvalidOptions(format!(
                "Left and right suffixes must differ, got '{}' for both",
                self.suffix.0
            )));
        }
        if self.parallel_threshold == 0 {
            return Err(JoinError::InvalidOptions(
                "Parallel threshold must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Reaction to an observed relationship violation.
    ///
    /// Undeclared relationships only warn about many-to-many matches.
    pub fn relationship_reaction(&self) -> Reaction {
        match self.relationship {
            Some(_) => Reaction::Error,
            None => Reaction::Warn,
        }
    }
}

/// Expected cardinality between the left and right side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Relationship {
    /// If each left row may match at most one right row.
    pub const fn left_unique_match(&self) -> bool {
        matches!(self, Relationship::OneToOne | Relationship::ManyToOne)
    }

    /// If each right row may match at most one left row.
    pub const fn right_unique_match(&self) -> bool {
        matches!(self, Relationship::OneToOne | Relationship::OneToMany)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneToOne => write!(f, "one-to-one"),
            Self::OneToMany => write!(f, "one-to-many"),
            Self::ManyToOne => write!(f, "many-to-one"),
            Self::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

impl FromStr for Relationship {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.replace('-', "_").to_ascii_lowercase().as_str() {
            "one_to_one" => Relationship::OneToOne,
            "one_to_many" => Relationship::OneToMany,
            "many_to_one" => Relationship::ManyToOne,
            "many_to_many" => Relationship::ManyToMany,
            other => {
                return Err(JoinError::InvalidOptions(format!(
                    "Unknown relationship '{other}'"
                )));
            }
        })
    }
}

/// Handling of rows with no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    #[default]
    Drop,
    Warn,
    Error,
}

impl UnmatchedPolicy {
    pub const fn reaction(&self) -> Reaction {
        match self {
            UnmatchedPolicy::Drop => Reaction::Ignore,
            UnmatchedPolicy::Warn => Reaction::Warn,
            UnmatchedPolicy::Error => Reaction::Error,
        }
    }
}

impl FromStr for UnmatchedPolicy {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "drop" => UnmatchedPolicy::Drop,
            "warn" => UnmatchedPolicy::Warn,
            "error" => UnmatchedPolicy::Error,
            other => {
                return Err(JoinError::InvalidOptions(format!(
                    "Unknown unmatched policy '{other}'"
                )));
            }
        })
    }
}

/// Which right matches to keep per left row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleMatches {
    /// Keep every match.
    #[default]
    All,
    /// Keep one arbitrary match. Currently the first.
    Any,
    /// Keep the first match in right row order.
    First,
    /// Keep the last match in right row order.
    Last,
}

impl MultipleMatches {
    /// Apply this to a left row's matches, which are in right row order.
    pub fn apply(&self, matches: &mut Vec<usize>) {
        match self {
            MultipleMatches::All => (),
            MultipleMatches::Any | MultipleMatches::First => matches.truncate(1),
            MultipleMatches::Last => {
                if let Some(last) = matches.pop() {
                    matches.clear();
                    matches.push(last);
                }
            }
        }
    }
}

impl FromStr for MultipleMatches {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "all" => MultipleMatches::All,
            "any" => MultipleMatches::Any,
            "first" => MultipleMatches::First,
            "last" => MultipleMatches::Last,
            other => {
                return Err(JoinError::InvalidOptions(format!(
                    "Unknown multiple match handling '{other}'"
                )));
            }
        })
    }
}

/// How a detected condition is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Proceed silently.
    Ignore,
    /// Proceed, recording a diagnostic.
    Warn,
    /// Abort the join.
    Error,
}
