use std::{collections::BTreeMap, fmt};

use thiserror::Error;

use crate::{
  config::{Config, Target},
  outcome::{OutcomeTable, Trials},
};

/// Outcome of the proportion test for one target probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  /// The candidate wins with at least the target probability.
  Yes,
  No,
}

impl fmt::Display for Verdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Verdict::Yes => f.write_str("yes"),
      Verdict::No => f.write_str("no"),
    }
  }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("insufficient data: no repetition has both a candidate and a baseline run")]
pub struct InsufficientData;

/// A verdict, or the reason none could be reached.
pub type Cell = Result<Verdict, InsufficientData>;

/// `yes`/`no`, or `no_data` for a cell without trials.
pub fn cell_text(cell: &Cell, no_data: &str) -> String {
  match cell {
    Ok(verdict) => verdict.to_string(),
    Err(InsufficientData) => no_data.to_string(),
  }
}

/// `sqrt(n) / scale * (m/n - p)`, the normal approximation of the observed
/// win rate's distance from `p`.
pub fn criterion(trials: Trials, p: f64, scale: f64) -> Result<f64, InsufficientData> {
  if trials.n == 0 {
    return Err(InsufficientData);
  }

  let n = trials.n as f64;
  let m = trials.m as f64;

  Ok(n.sqrt() / scale * (m / n - p))
}

/// One-sided large-sample proportion test: `Yes` iff the criterion for
/// `target.p` is at least the critical value `target.l`.
pub fn proportion_test(trials: Trials, target: Target, scale: f64) -> Cell {
  let criterion = criterion(trials, target.p, scale)?;
  let verdict = if criterion >= target.l { Verdict::Yes } else { Verdict::No };

  log::debug!(
    "n={} m={} p={} l={} criterion={criterion:.4} -> {verdict}",
    trials.n,
    trials.m,
    target.p,
    target.l
  );

  Ok(verdict)
}

/// Verdicts for every base experiment, with one cell per baseline and target
/// probability. Cells are laid out baseline-major, in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdicts {
  pub baselines: Vec<String>,
  pub targets: Vec<Target>,
  pub rows: BTreeMap<String, Vec<Cell>>,
}

impl Verdicts {
  pub fn evaluate(outcomes: &OutcomeTable, config: &Config) -> Self {
    let rows = outcomes
      .bases
      .keys()
      .map(|base| {
        let cells = config
          .baselines
          .iter()
          .flat_map(|baseline| {
            let trials = outcomes.trials(base, baseline);
            config
              .targets
              .iter()
              .map(move |&target| proportion_test(trials, target, config.scale))
          })
          .collect();

        (base.clone(), cells)
      })
      .collect();

    Self {
      baselines: config.baselines.clone(),
      targets: config.targets.clone(),
      rows,
    }
  }

  /// Column names, matching the layout of each row's cells.
  pub fn columns(&self) -> Vec<String> {
    self
      .baselines
      .iter()
      .flat_map(|baseline| {
        self
          .targets
          .iter()
          .map(move |target| format!("better_than_{baseline}_{}", target.p))
      })
      .collect()
  }

  /// A row's cells grouped per baseline.
  pub fn by_baseline<'a>(&'a self, cells: &'a [Cell]) -> impl Iterator<Item = (&'a str, &'a [Cell])> {
    self
      .baselines
      .iter()
      .map(String::as_str)
      .zip(cells.chunks(self.targets.len()))
  }
}
