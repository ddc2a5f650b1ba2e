use std::fmt;

use super::{RowStore, Table};

const DEFAULT_MAX_ROWS: usize = 40;

/// Text rendering of a table with aligned columns.
///
/// When a table has more rows than `max_rows`, the first and last halves are
/// printed with an elision marker in between.
#[derive(Debug)]
pub struct PrettyTable<'a> {
    table: &'a Table,
    max_rows: usize,
}

impl<'a> PrettyTable<'a> {
    pub fn new(table: &'a Table) -> Self {
        PrettyTable {
            table,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(2);
        self
    }

    /// Row indices to render, with None marking the elision point.
    fn visible_rows(&self) -> Vec<Option<usize>> {
        let total = self.table.num_rows();
        if total <= self.max_rows {
            return (0..total).map(Some).collect();
        }

        let head = self.max_rows.div_ceil(2);
        let tail = self.max_rows / 2;

        (0..head)
            .map(Some)
            .chain(std::iter::once(None))
            .chain(((total - tail)..total).map(Some))
            .collect()
    }
}

impl fmt::Display for PrettyTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = self.table.schema();
        let visible = self.visible_rows();

        let header: Vec<String> = schema.fields().iter().map(|f| f.name.clone()).collect();
        let types: Vec<String> = schema
            .fields()
            .iter()
            .map(|f| f.datatype.to_string())
            .collect();
        let cells: Vec<Option<Vec<String>>> = visible
            .iter()
            .map(|idx| {
                idx.map(|idx| {
                    (0..schema.num_columns())
                        .map(|col| self.table.value(idx, col).to_string())
                        .collect()
                })
            })
            .collect();

        let mut widths: Vec<usize> = header
            .iter()
            .zip(&types)
            .map(|(h, t)| h.chars().count().max(t.chars().count()))
            .collect();
        for row in cells.iter().flatten() {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let write_line = |f: &mut fmt::Formatter<'_>, vals: &[String]| -> fmt::Result {
            let line = vals
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{v:<w$}"))
                .collect::<Vec<_>>()
                .join(" │ ");
            writeln!(f, "│ {line} │")
        };

        let rule = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");

        write_line(f, &header)?;
        write_line(f, &types)?;
        writeln!(f, "├─{rule}─┤")?;
        for row in &cells {
            match row {
                Some(row) => write_line(f, row)?,
                None => {
                    let dots: Vec<String> = widths.iter().map(|_| "…".to_string()).collect();
                    write_line(f, &dots)?;
                }
            }
        }
        write!(f, "{} rows, {} columns", self.table.num_rows(), schema.num_columns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::{DataType, ScalarValue};
    use crate::table::schema::{Field, Schema};

    #[test]
    fn render_small_table() {
        let schema = Schema::try_new([
            Field::new("key", DataType::Int64),
            Field::new("val", DataType::Utf8),
        ])
        .unwrap();
        let table = Table::try_new(
            schema,
            vec![vec![1.into(), "x1".into()], vec![2.into(), ScalarValue::Null]],
        )
        .unwrap();

        let expected = "\
│ key   │ val  │
│ Int64 │ Utf8 │
├───────┼──────┤
│ 1     │ x1   │
│ 2     │ NA   │
2 rows, 2 columns";
        assert_eq!(expected, table.to_string());
    }

    #[test]
    fn elides_middle_rows() {
        let schema = Schema::try_new([Field::new("a", DataType::Int64)]).unwrap();
        let rows = (0..10).map(|i| vec![ScalarValue::Int64(i)]).collect();
        let table = Table::try_new(schema, rows).unwrap();

        let pretty = PrettyTable::new(&table).with_max_rows(4);
        assert_eq!(
            vec![Some(0), Some(1), None, Some(8), Some(9)],
            pretty.visible_rows()
        );
    }
}
