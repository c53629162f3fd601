use std::collections::BTreeMap;

use crate::{
  config::Config,
  ident::{self, RunId, UnparsableId},
};

/// Throughput by repetition index.
pub type Series = BTreeMap<u32, f64>;

/// One row of the run table: an experiment run id and its average throughput.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
  pub id: String,
  pub throughput: f64,
}

impl RunRecord {
  pub fn new(id: impl Into<String>, throughput: f64) -> Self {
    Self {
      id: id.into(),
      throughput,
    }
  }
}

/// Measurements of one traditional algorithm.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineSeries {
  /// Runs tied to a repetition index.
  pub indexed: Series,
  /// An unindexed run, standing in for every index without its own run.
  pub reference: Option<f64>,
}

impl BaselineSeries {
  pub fn value(&self, index: u32) -> Option<f64> {
    self.indexed.get(&index).copied().or(self.reference)
  }
}

/// The run table regrouped per baseline and per base experiment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSet {
  pub baselines: BTreeMap<String, BaselineSeries>,
  pub candidates: BTreeMap<String, Series>,
  /// Ids that were neither a baseline nor a candidate run, sorted.
  pub skipped: Vec<UnparsableId>,
  /// Records that replaced an earlier record for the same slot.
  pub duplicates: usize,
}

impl SeriesSet {
  /// Number of distinct repetition indices observed for `base`.
  pub fn amount(&self, base: &str) -> usize {
    self.candidates.get(base).map_or(0, Series::len)
  }
}

/// Groups `records` by baseline and base experiment.
///
/// The result does not depend on the order of `records`, except when two
/// records fill the same `(base, index)` or `(baseline, index)` slot: then the
/// later one wins. That only happens on duplicate ingestion and is logged.
pub fn build(records: &[RunRecord], config: &Config) -> SeriesSet {
  let mut set = SeriesSet::default();

  for record in records {
    let replaced = match ident::parse(&record.id, config) {
      Ok(RunId::Baseline { name, index }) => {
        let baseline = set.baselines.entry(name).or_default();
        match index {
          Some(index) => baseline.indexed.insert(index, record.throughput),
          None => baseline.reference.replace(record.throughput),
        }
      }
      Ok(RunId::CandidateRun { base, index }) => set
        .candidates
        .entry(base)
        .or_default()
        .insert(index, record.throughput),
      Err(err) => {
        log::warn!("skipping row: {err}");
        set.skipped.push(err);
        continue;
      }
    };

    if let Some(previous) = replaced {
      log::warn!(
        "duplicate run {:?}: {} replaces {previous}",
        record.id,
        record.throughput
      );
      set.duplicates += 1;
    }
  }

  set.skipped.sort();

  set
}
