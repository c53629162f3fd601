use std::{
  fs::{self, File},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{
  config::Config,
  ext::PathExt,
  outcome::OutcomeTable,
  series::{self, RunRecord, SeriesSet},
  stats::Verdicts,
  table,
};

/// Reads the run table at `input` and regroups it into series.
pub fn load(input: &Path, config: &Config) -> Result<SeriesSet> {
  let records = read_runs(input)?;
  let series = series::build(&records, config);

  log::info!(
    "{} runs: {} base experiments, {} baselines, {} skipped, {} duplicates",
    records.len(),
    series.candidates.len(),
    series.baselines.len(),
    series.skipped.len(),
    series.duplicates
  );

  Ok(series)
}

fn read_runs(input: &Path) -> Result<Vec<RunRecord>> {
  let file = File::open(input).with_context(|| format!("open {input:?}"))?;

  table::read_runs(file).with_context(|| format!("read {input:?}"))
}

/// Runs the hypothesis check on the run table at `input` and writes the verdict
/// table to `output`, and the per-run outcome table to `outcomes_output` when
/// given.
pub fn check(input: &Path, output: &Path, outcomes_output: Option<&Path>, config: &Config) -> Result<Verdicts> {
  let series = load(input, config).context("load")?;

  if let Some(path) = outcomes_output {
    path
      .write_atomic(|file| table::write_outcomes(file, &series, config))
      .with_context(|| format!("write {path:?}"))?;
    log::info!("wrote per-run outcomes to {path:?}");
  }

  let outcomes = OutcomeTable::evaluate(&series, config);

  for (base, pairs) in &outcomes.bases {
    for baseline in pairs.iter().filter(|(_, trials)| trials.n == 0).map(|(name, _)| name) {
      log::warn!("{base} vs {baseline}: no repetition has both runs, marking {:?}", config.no_data);
    }
  }

  let verdicts = Verdicts::evaluate(&outcomes, config);

  output
    .write_atomic(|file| table::write_verdicts(file, &verdicts, config))
    .with_context(|| format!("write {output:?}"))?;
  log::info!("wrote {} verdict rows to {output:?}", verdicts.rows.len());

  Ok(verdicts)
}

/// Writes `<base>.csv` into `output_dir` for every base experiment in the run
/// table at `input`. Bases that aren't plain file names are skipped.
pub fn series(input: &Path, output_dir: &Path, config: &Config) -> Result<Vec<PathBuf>> {
  let series = load(input, config).context("load")?;

  fs::create_dir_all(output_dir).with_context(|| format!("create {output_dir:?}"))?;

  let mut written = Vec::new();
  for base in series.candidates.keys() {
    let path = match output_dir.csv_file(base) {
      Ok(path) => path,
      Err(err) => {
        log::warn!("skipping series of {base:?}: {err}");
        continue;
      }
    };

    path
      .write_atomic(|file| table::write_series(file, base, &series, config))
      .with_context(|| format!("write {path:?}"))?;
    log::info!("wrote series of {base} ({} repetitions)", series.amount(base));

    written.push(path);
  }

  Ok(written)
}
