use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::JoinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    /// Standard INNER join.
    Inner,
    /// Standard LEFT join.
    Left,
    /// Standard RIGHT join.
    Right,
    /// Standard full/outer join.
    Full,
    /// Left semi join.
    Semi,
    /// Left anti join.
    Anti,
    /// Cartesian product, the condition is ignored.
    Cross,
}

impl JoinType {
    /// If this join only emits columns from the left side.
    pub const fn is_filtering(&self) -> bool {
        matches!(self, JoinType::Semi | JoinType::Anti)
    }

    /// If unmatched left rows appear in the output padded with missing values.
    pub const fn pads_left(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::Full)
    }

    /// If unmatched right rows appear in the output padded with missing
    /// values.
    pub const fn pads_right(&self) -> bool {
        matches!(self, JoinType::Right | JoinType::Full)
    }

    /// The sides whose unmatched rows are reported by the unmatched row
    /// policy.
    pub const fn unmatched_checked_sides(&self) -> &'static [JoinSide] {
        match self {
            JoinType::Inner | JoinType::Full => &[JoinSide::Left, JoinSide::Right],
            JoinType::Left | JoinType::Semi => &[JoinSide::Left],
            JoinType::Right => &[JoinSide::Right],
            JoinType::Anti | JoinType::Cross => &[],
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
            Self::Full => write!(f, "FULL"),
            Self::Semi => write!(f, "SEMI"),
            Self::Anti => write!(f, "ANTI"),
            Self::Cross => write!(f, "CROSS"),
        }
    }
}

impl FromStr for JoinType {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "inner" => JoinType::Inner,
            "left" => JoinType::Left,
            "right" => JoinType::Right,
            "full" | "outer" => JoinType::Full,
            "semi" => JoinType::Semi,
            "anti" => JoinType::Anti,
            "cross" => JoinType::Cross,
            other => {
                return Err(JoinError::InvalidOptions(format!(
                    "Unknown join type '{other}'"
                )));
            }
        })
    }
}

/// One side of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSide {
    Left,
    Right,
}

impl fmt::Display for JoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_join_types() {
        assert_eq!(JoinType::Full, "outer".parse().unwrap());
        assert_eq!(JoinType::Semi, "SEMI".parse().unwrap());
        assert!("sideways".parse::<JoinType>().is_err());
    }

    #[test]
    fn unmatched_sides() {
        assert_eq!(&[JoinSide::Left], JoinType::Semi.unmatched_checked_sides());
        assert_eq!(&[JoinSide::Right], JoinType::Right.unmatched_checked_sides());
        assert!(JoinType::Anti.unmatched_checked_sides().is_empty());
    }
}
