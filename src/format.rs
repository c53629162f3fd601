use std::fmt::Write;

use anyhow::Result;

use crate::stats::{self, Verdicts};

const COLUMN_WIDTH: usize = 12;
const COLUMN_PADDING: &str = "  ";

fn format_header(verdicts: &Verdicts) -> String {
  let targets = verdicts.targets.iter().map(|t| format!("p={}", t.p));

  let header = ["base", "baseline"]
    .into_iter()
    .map(String::from)
    .chain(targets)
    .map(|col| format!("{col:<COLUMN_WIDTH$}"))
    .collect::<Vec<_>>()
    .join(COLUMN_PADDING);

  format!("{header}\n{}", "=".repeat(header.len()))
}

fn format_row<'a, I: IntoIterator<Item = &'a str>>(base: &'a str, baseline: &'a str, cells: I) -> String {
  [base, baseline]
    .into_iter()
    .chain(cells)
    .enumerate()
    .map(|(i, col)| {
      if i < 2 {
        format!("{col:<COLUMN_WIDTH$}")
      } else {
        format!("{col:>COLUMN_WIDTH$}")
      }
    })
    .collect::<Vec<_>>()
    .join(COLUMN_PADDING)
}

/// Column-aligned verdicts, one block per base experiment and one line per
/// baseline within it.
pub fn format(verdicts: &Verdicts, no_data: &str) -> Result<String> {
  let mut table = String::new();

  writeln!(table, "{}", format_header(verdicts))?;

  for (base, cells) in &verdicts.rows {
    let mut width = 0;

    for (i, (baseline, cells)) in verdicts.by_baseline(cells).enumerate() {
      let cells: Vec<_> = cells.iter().map(|cell| stats::cell_text(cell, no_data)).collect();

      let base = if i == 0 { base.as_str() } else { "" };
      let row = format_row(base, baseline, cells.iter().map(String::as_str));
      writeln!(table, "{row}")?;

      width = width.max(row.len());
    }

    writeln!(table, "{}", "-".repeat(width))?;
  }

  Ok(table)
}
