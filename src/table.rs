use std::{
  io::{Read, Write},
  num::ParseFloatError,
};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Writer};
use thiserror::Error;

use crate::{
  config::Config,
  ext::StringRecordExt,
  outcome,
  series::{BaselineSeries, RunRecord, SeriesSet},
  stats::{self, Verdicts},
};

pub const EXPERIMENT_COLUMN: &str = "experiment";
pub const THROUGHPUT_COLUMN: &str = "average_bitrate";

#[derive(Debug, Error)]
pub enum RowError {
  #[error("missing {0:?} field")]
  MissingField(&'static str),
  #[error("throughput {value:?} of {id:?} is not a number")]
  Throughput {
    id: String,
    value: String,
    #[source]
    source: ParseFloatError,
  },
  #[error("throughput {value} of {id:?} is not a finite, non-negative number")]
  OutOfRange { id: String, value: f64 },
}

/// Reads the run table. Rows that don't hold an id and a throughput are
/// skipped with a warning.
pub fn read_runs<R: Read>(reader: R) -> Result<Vec<RunRecord>> {
  let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);

  let headers = reader.headers().context("headers")?.clone();
  let id_at = headers.column_index(EXPERIMENT_COLUMN)?;
  let throughput_at = headers.column_index(THROUGHPUT_COLUMN)?;

  let mut records = Vec::new();
  let mut row = StringRecord::new();
  while reader.read_record(&mut row).context("read record")? {
    match parse_row(&row, id_at, throughput_at) {
      Ok(record) => records.push(record),
      Err(err) => {
        let line = row.position().map_or(0, |p| p.line());
        log::warn!("skipping line {line}: {err}");
      }
    }
  }

  Ok(records)
}

fn parse_row(row: &StringRecord, id_at: usize, throughput_at: usize) -> Result<RunRecord, RowError> {
  let id = row
    .get(id_at)
    .map(str::trim)
    .filter(|id| !id.is_empty())
    .ok_or(RowError::MissingField(EXPERIMENT_COLUMN))?;
  let value = row
    .get(throughput_at)
    .map(str::trim)
    .filter(|value| !value.is_empty())
    .ok_or(RowError::MissingField(THROUGHPUT_COLUMN))?;

  let throughput: f64 = value.parse().map_err(|source| RowError::Throughput {
    id: id.to_string(),
    value: value.to_string(),
    source,
  })?;
  if !throughput.is_finite() || throughput < 0.0 {
    return Err(RowError::OutOfRange {
      id: id.to_string(),
      value: throughput,
    });
  }

  Ok(RunRecord::new(id, throughput))
}

pub fn write_runs<W: Write>(writer: W, records: &[RunRecord]) -> Result<()> {
  let mut writer = Writer::from_writer(writer);

  writer.write_record([EXPERIMENT_COLUMN, THROUGHPUT_COLUMN])?;
  for record in records {
    writer.write_record([record.id.clone(), record.throughput.to_string()])?;
  }
  writer.flush()?;

  Ok(())
}

/// Per-interval throughput samples of one run.
pub fn write_samples<W: Write>(writer: W, samples: &[f64]) -> Result<()> {
  let mut writer = Writer::from_writer(writer);

  writer.write_record(["time", "bitrate"])?;
  for (time, sample) in samples.iter().enumerate() {
    writer.write_record([time.to_string(), sample.to_string()])?;
  }
  writer.flush()?;

  Ok(())
}

/// One row per base experiment, one `yes`/`no` column per baseline and target
/// probability. Cells without trials hold `config.no_data`.
pub fn write_verdicts<W: Write>(writer: W, verdicts: &Verdicts, config: &Config) -> Result<()> {
  let mut writer = Writer::from_writer(writer);

  let header = std::iter::once("base_experiment".to_string()).chain(verdicts.columns());
  writer.write_record(header)?;

  for (base, cells) in &verdicts.rows {
    let cells = cells.iter().map(|cell| stats::cell_text(cell, &config.no_data));
    let row = std::iter::once(base.clone()).chain(cells);
    writer.write_record(row)?;
  }
  writer.flush()?;

  Ok(())
}

/// Whether each candidate run reached each baseline at its repetition index,
/// one row per run. Cells where the baseline has no run at that index hold
/// `config.no_data`.
pub fn write_outcomes<W: Write>(writer: W, series: &SeriesSet, config: &Config) -> Result<()> {
  let mut writer = Writer::from_writer(writer);

  let header = std::iter::once(EXPERIMENT_COLUMN.to_string())
    .chain(config.baselines.iter().map(|name| format!("better_than_{name}")));
  writer.write_record(header)?;

  let empty = BaselineSeries::default();
  for (base, candidate) in &series.candidates {
    let per_baseline: Vec<_> = config
      .baselines
      .iter()
      .map(|name| outcome::outcomes(candidate, series.baselines.get(name).unwrap_or(&empty)))
      .collect();

    for index in candidate.keys() {
      let cells = per_baseline.iter().map(|outcomes| match outcomes.get(index) {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => config.no_data.clone(),
      });
      let row = std::iter::once(format!("{base}{}{index}", config.separator)).chain(cells);
      writer.write_record(row)?;
    }
  }
  writer.flush()?;

  Ok(())
}

/// The series of base experiment `base` next to every configured baseline,
/// one row per repetition index of the base. Absent baseline values are left
/// empty.
pub fn write_series<W: Write>(writer: W, base: &str, series: &SeriesSet, config: &Config) -> Result<()> {
  let mut writer = Writer::from_writer(writer);

  let header = ["exp_number", base]
    .into_iter()
    .chain(config.baselines.iter().map(String::as_str));
  writer.write_record(header)?;

  for (index, value) in series.candidates.get(base).into_iter().flatten() {
    let baselines = config.baselines.iter().map(|name| {
      series
        .baselines
        .get(name)
        .and_then(|baseline| baseline.value(*index))
        .map_or_else(String::new, |value| value.to_string())
    });

    let row = [index.to_string(), value.to_string()].into_iter().chain(baselines);
    writer.write_record(row)?;
  }
  writer.flush()?;

  Ok(())
}
