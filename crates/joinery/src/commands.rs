use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use joinery_core::table::pretty::PrettyTable;
use joinery_core::{
    JoinCondition, JoinOptions, JoinOutput, KeyReport, Table, join, natural_join, validate_key,
};
use tracing::{debug, info};

use crate::args::{JoinArgs, OutputMode, ValidateKeyArgs};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Join two tables.
    Join(JoinArgs),
    /// Check if a set of columns is a primary key of a table.
    ValidateKey(ValidateKeyArgs),
}

impl Commands {
    pub fn run(self) -> Result<()> {
        let mut stdout = io::stdout().lock();
        match self {
            Commands::Join(args) => args.run(&mut stdout),
            Commands::ValidateKey(args) => args.run(&mut stdout),
        }
    }
}

trait RunCommand {
    fn run(self, out: &mut dyn Write) -> Result<()>;
}

impl RunCommand for JoinArgs {
    fn run(self, out: &mut dyn Write) -> Result<()> {
        let left = read_table(&self.left)?;
        let right = read_table(&self.right)?;
        let options = self.join_options()?;

        let output = if self.natural {
            natural_join(&left, &right, self.join_type, &options)?
        } else {
            let condition = match &self.by {
                Some(by) => JoinCondition::parse(by)?,
                None => JoinCondition::cross(),
            };
            info!(%condition, join_type = %self.join_type, "running join");
            join(&left, &right, self.join_type, &condition, &options)?
        };

        write_join_output(out, &output, self.output, self.display_rows)
    }
}

impl JoinArgs {
    /// Options from the options file, overridden by flags.
    fn join_options(&self) -> Result<JoinOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read options file '{}'", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("invalid options file '{}'", path.display()))?
            }
            None => JoinOptions::default(),
        };

        if let Some((left, right)) = &self.suffix {
            options.suffix = (left.clone(), right.clone());
        }
        if self.keep {
            options.keep = true;
        }
        if let Some(relationship) = self.relationship {
            options.relationship = Some(relationship);
        }
        if let Some(unmatched) = self.unmatched {
            options.unmatched = unmatched;
        }
        if let Some(multiple) = self.multiple {
            options.multiple = multiple;
        }
        if let Some(max_rows) = self.max_rows {
            options.max_output_rows = Some(max_rows);
        }

        debug!(?options, "resolved join options");
        Ok(options)
    }
}

impl RunCommand for ValidateKeyArgs {
    fn run(self, out: &mut dyn Write) -> Result<()> {
        let table = read_table(&self.table)?;
        let report = validate_key(&table, self.columns.as_slice())?;
        write_key_report(out, &report, &self.columns, table.rows().len(), self.output)
    }
}

pub fn read_table(path: &Path) -> Result<Table> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read table '{}'", path.display()))?;
    let table = serde_json::from_str(&text)
        .with_context(|| format!("invalid table file '{}'", path.display()))?;
    Ok(table)
}

fn write_join_output(
    out: &mut dyn Write,
    output: &JoinOutput,
    mode: OutputMode,
    display_rows: Option<usize>,
) -> Result<()> {
    match mode {
        OutputMode::Pretty => {
            let mut pretty = PrettyTable::new(&output.table);
            if let Some(rows) = display_rows {
                pretty = pretty.with_max_rows(rows);
            }
            writeln!(out, "{pretty}")?;
            for diagnostic in &output.diagnostics {
                eprintln!("WARNING: {diagnostic}");
            }
        }
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, output)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_key_report(
    out: &mut dyn Write,
    report: &KeyReport,
    columns: &[String],
    num_rows: usize,
    mode: OutputMode,
) -> Result<()> {
    if mode == OutputMode::Json {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
        return Ok(());
    }

    let columns = columns.join(", ");
    if report.is_primary_key() {
        writeln!(out, "({columns}) uniquely identifies all {num_rows} rows")?;
        return Ok(());
    }

    if !report.duplicates.is_empty() {
        writeln!(
            out,
            "{} duplicated key(s) for ({columns}):",
            report.duplicates.len()
        )?;
        for dup in &report.duplicates {
            let rows: Vec<_> = dup.rows.iter().map(|r| r.to_string()).collect();
            writeln!(out, "  {dup}, rows {}", rows.join(", "))?;
        }
    }
    if !report.missing.is_empty() {
        let rows: Vec<_> = report.missing.iter().map(|r| r.to_string()).collect();
        writeln!(
            out,
            "{} row(s) with a missing key component: {}",
            report.missing.len(),
            rows.join(", ")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use clap::Parser;
    use joinery_core::{MultipleMatches, Relationship};

    use super::*;

    static FILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Writes `contents` to a unique file in the temp dir.
    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let n = FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path =
            std::env::temp_dir().join(format!("joinery-{}-{n}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    fn x_table() -> PathBuf {
        temp_file(
            "x.json",
            r#"{"columns":[{"name":"key","type":"int64"},{"name":"val","type":"utf8"}],
                "rows":[[1,"x1"],[2,"x2"],[3,"x3"]]}"#,
        )
    }

    fn y_table() -> PathBuf {
        temp_file(
            "y.json",
            r#"{"columns":[{"name":"key","type":"int64"},{"name":"val","type":"utf8"}],
                "rows":[[1,"y1"],[2,"y2"],[4,"y3"]]}"#,
        )
    }

    fn run_join(extra: &[&str]) -> Result<String> {
        let x = x_table();
        let y = y_table();
        let mut argv = vec![
            "join".to_string(),
            "--left".to_string(),
            x.display().to_string(),
            "--right".to_string(),
            y.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));

        let args = JoinArgs::try_parse_from(argv)?;
        let mut out = Vec::new();
        args.run(&mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn join_json_output() {
        let out = run_join(&["--by", "key", "--type", "full", "--output", "json"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(4, value["table"]["rows"].as_array().unwrap().len());
        assert_eq!(
            serde_json::json!([4, null, "y3"]),
            value["table"]["rows"][3]
        );
    }

    #[test]
    fn join_pretty_output() {
        let out = run_join(&["--by", "key"]).unwrap();
        assert!(out.contains("x1"), "{out}");
        assert!(out.contains("2 rows, 3 columns"), "{out}");
    }

    #[test]
    fn join_unmatched_error() {
        let err = run_join(&["--by", "key", "--unmatched", "error"]).unwrap_err();
        assert!(err.to_string().contains("have no match"), "{err}");
    }

    #[test]
    fn join_bad_condition() {
        let err = run_join(&["--by", "key = key"]).unwrap_err();
        assert!(err.to_string().contains("parse"), "{err}");
    }

    #[test]
    fn flags_override_options_file() {
        let opts = temp_file(
            "opts.json",
            r#"{"multiple": "first", "relationship": "one_to_many"}"#,
        );
        let args = JoinArgs::try_parse_from([
            "join".to_string(),
            "--left".to_string(),
            "unused".to_string(),
            "--right".to_string(),
            "unused".to_string(),
            "--options".to_string(),
            opts.display().to_string(),
            "--multiple".to_string(),
            "last".to_string(),
        ])
        .unwrap();

        let options = args.join_options().unwrap();
        assert_eq!(MultipleMatches::Last, options.multiple);
        assert_eq!(Some(Relationship::OneToMany), options.relationship);
    }

    #[test]
    fn validate_key_report() {
        let table = temp_file(
            "dups.json",
            r#"{"columns":[{"name":"id","type":"int64"}],"rows":[[1],[1],[null],[2]]}"#,
        );
        let args = ValidateKeyArgs::try_parse_from([
            "validate-key".to_string(),
            "--table".to_string(),
            table.display().to_string(),
            "--columns".to_string(),
            "id".to_string(),
        ])
        .unwrap();

        let mut out = Vec::new();
        args.run(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            "1 duplicated key(s) for (id):\n  (1) appears 2 times, rows 0, 1\n1 row(s) with a missing key component: 2\n",
            out
        );
    }
}
