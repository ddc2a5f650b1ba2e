//! Relational joins over in-memory row stores.
//!
//! A join takes two [`RowStore`]s, a [`JoinCondition`] and a [`JoinType`]. The
//! condition is compiled against both schemas, matching row pairs are
//! enumerated (hashing equality keys where possible), and the output table is
//! assembled according to the join type.
//!
//! ```
//! use joinery_core::{JoinCondition, JoinOptions, JoinType, join};
//! use joinery_core::scalar::DataType;
//! use joinery_core::testutil::table;
//!
//! let x = table(&[("key", DataType::Int64)], vec![vec![1.into()], vec![2.into()]]);
//! let y = table(&[("key", DataType::Int64)], vec![vec![2.into()]]);
//!
//! let cond: JoinCondition = "key".parse().unwrap();
//! let out = join(&x, &y, JoinType::Inner, &cond, &JoinOptions::default()).unwrap();
//! assert_eq!(1, out.table.rows().len());
//! ```

pub mod assemble;
pub mod condition;
pub mod diagnostics;
pub mod enumerate;
pub mod errors;
pub mod hash;
pub mod join;
pub mod join_type;
pub mod natural;
pub mod options;
pub mod predicate;
pub mod relationship;
pub mod scalar;
pub mod table;
pub mod testutil;
pub mod validate;

pub use condition::{ComparisonOperator, JoinComparison, JoinCondition, JoinExpr};
pub use diagnostics::Diagnostic;
pub use errors::{JoinError, Result};
pub use join::{
    JoinOutput, anti_join, cross_join, full_join, inner_join, join, left_join, right_join,
    semi_join,
};
pub use join_type::{JoinSide, JoinType};
pub use natural::{natural_condition, natural_join};
pub use options::{JoinOptions, MultipleMatches, Relationship, UnmatchedPolicy};
pub use scalar::{DataType, ScalarValue};
pub use table::schema::{Field, Schema};
pub use table::{RowStore, Table};
pub use validate::{DuplicateKey, KeyReport, validate_key};
