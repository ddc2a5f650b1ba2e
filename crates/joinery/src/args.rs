use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use joinery_core::{JoinType, MultipleMatches, Relationship, UnmatchedPolicy};

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Aligned text table.
    #[default]
    Pretty,
    /// Json object containing the table and diagnostics.
    Json,
}

#[derive(Debug, Clone, Parser)]
pub struct JoinArgs {
    /// Json file containing the left table.
    #[clap(long)]
    pub left: PathBuf,

    /// Json file containing the right table.
    #[clap(long)]
    pub right: PathBuf,

    /// Join condition, e.g. `id, start <= day, closest(day >= sale)`.
    ///
    /// An empty condition matches every pair of rows.
    #[clap(long, conflicts_with = "natural")]
    pub by: Option<String>,

    /// Join on every column both tables share.
    #[clap(long)]
    pub natural: bool,

    /// Join type: inner, left, right, full, semi, anti, or cross.
    #[clap(long = "type", default_value = "inner")]
    pub join_type: JoinType,

    /// Suffixes for colliding column names, as `left,right`.
    #[clap(long, value_parser = parse_suffix)]
    pub suffix: Option<(String, String)>,

    /// Keep both key columns of equality comparisons.
    #[clap(long)]
    pub keep: bool,

    /// Expected relationship, e.g. `one-to-many`. Violations fail the join.
    #[clap(long)]
    pub relationship: Option<Relationship>,

    /// What to do with unmatched rows: drop, warn, or error.
    #[clap(long)]
    pub unmatched: Option<UnmatchedPolicy>,

    /// Which matches of a row to keep: all, any, first, or last.
    #[clap(long)]
    pub multiple: Option<MultipleMatches>,

    /// Fail instead of producing more than this many rows.
    #[clap(long)]
    pub max_rows: Option<usize>,

    /// Json file with join options. Flags take precedence.
    #[clap(long)]
    pub options: Option<PathBuf>,

    #[clap(long, value_enum, default_value_t = OutputMode::Pretty)]
    pub output: OutputMode,

    /// Max number of rows to display in pretty output.
    #[clap(long)]
    pub display_rows: Option<usize>,
}

#[derive(Debug, Clone, Parser)]
pub struct ValidateKeyArgs {
    /// Json file containing the table.
    #[clap(long)]
    pub table: PathBuf,

    /// Candidate key columns.
    #[clap(long, value_delimiter = ',', required = true)]
    pub columns: Vec<String>,

    #[clap(long, value_enum, default_value_t = OutputMode::Pretty)]
    pub output: OutputMode,
}

fn parse_suffix(s: &str) -> Result<(String, String), String> {
    match s.split_once(',') {
        Some((left, right)) if !right.contains(',') => Ok((left.to_string(), right.to_string())),
        _ => Err(format!("expected two comma separated suffixes, got '{s}'")),
    }
}
