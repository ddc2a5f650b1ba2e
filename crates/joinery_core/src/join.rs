//! The join entry point.

use serde::Serialize;
use tracing::{debug, trace};

use crate::assemble::JoinAssembler;
use crate::condition::JoinCondition;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::enumerate::MatchEnumerator;
use crate::errors::Result;
use crate::join_type::JoinType;
use crate::options::JoinOptions;
use crate::predicate::CompiledPredicate;
use crate::relationship::Cardinality;
use crate::table::{RowStore, Table};

/// Output of a successful join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinOutput {
    pub table: Table,
    /// Non-fatal conditions detected while joining, in detection order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Join two row stores.
///
/// Column references are resolved before any rows are scanned. Relationship
/// and unmatched row conditions are always detected, `options` decides if
/// they're ignored, reported as diagnostics, or fail the join. No output is
/// produced on failure.
///
/// Relationships are only checked for inner and outer joins. The row budget
/// in `options` is enforced while matching, before output rows are built.
pub fn join(
    left: &dyn RowStore,
    right: &dyn RowStore,
    join_type: JoinType,
    condition: &JoinCondition,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    options.validate()?;

    let predicate = if join_type == JoinType::Cross {
        if !condition.is_cross() {
            debug!(%condition, "ignoring condition for cross join");
        }
        CompiledPredicate::compile(&JoinCondition::cross(), left.schema(), right.schema())?
    } else {
        CompiledPredicate::compile(condition, left.schema(), right.schema())?
    };

    // Resolve output columns before enumerating so layout errors surface
    // without scanning.
    let assembler = JoinAssembler::try_new(left, right, &predicate, join_type, options)?;

    // Every pair is an output row unless the join only filters the left side.
    let max_pairs = if join_type.is_filtering() {
        None
    } else {
        options.max_output_rows
    };
    let matches = MatchEnumerator::new(&predicate)
        .with_multiple(options.multiple)
        .with_parallel_threshold(options.parallel_threshold)
        .with_max_pairs(max_pairs)
        .enumerate(left, right)?;

    trace!(pairs = matches.num_pairs(), "enumerated matches");

    let mut diagnostics = Diagnostics::new();

    // Filtering joins never fan out, and a cross join has no condition to
    // check the relationship of.
    if join_type != JoinType::Cross && !join_type.is_filtering() {
        let cardinality = Cardinality::observe(&matches);
        if let Some(diagnostic) = cardinality.check(options.relationship) {
            diagnostics.report(options.relationship_reaction(), diagnostic)?;
        }
    }

    for &side in join_type.unmatched_checked_sides() {
        let rows = matches.unmatched(side);
        if rows.is_empty() {
            continue;
        }
        diagnostics.report(
            options.unmatched.reaction(),
            Diagnostic::UnmatchedRows { side, rows },
        )?;
    }

    let table = assembler.assemble(&matches)?;

    Ok(JoinOutput {
        table,
        diagnostics: diagnostics.into_vec(),
    })
}

pub fn inner_join(
    left: &dyn RowStore,
    right: &dyn RowStore,
    condition: &JoinCondition,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    join(left, right, JoinType::Inner, condition, options)
}

pub fn left_join(
    left: &dyn RowStore,
    right: &dyn RowStore,
    condition: &JoinCondition,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    join(left, right, JoinType::Left, condition, options)
}

pub fn right_join(
    left: &dyn RowStore,
    right: &dyn RowStore,
    condition: &JoinCondition,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    join(left, right, JoinType::Right, condition, options)
}

pub fn full_join(
    left: &dyn RowStore,
    right: &dyn RowStore,
    condition: &JoinCondition,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    join(left, right, JoinType::Full, condition, options)
}

/// Left rows with at least one match. Never fans out.
pub fn semi_join(
    left: &dyn RowStore,
    right: &dyn RowStore,
    condition: &JoinCondition,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    join(left, right, JoinType::Semi, condition, options)
}

/// Left rows without any match.
pub fn anti_join(
    left: &dyn RowStore,
    right: &dyn RowStore,
    condition: &JoinCondition,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    join(left, right, JoinType::Anti, condition, options)
}

pub fn cross_join(
    left: &dyn RowStore,
    right: &dyn RowStore,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    join(left, right, JoinType::Cross, &JoinCondition::cross(), options)
}
