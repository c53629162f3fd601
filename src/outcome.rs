use std::collections::BTreeMap;

use crate::{
  config::Config,
  series::{BaselineSeries, Series, SeriesSet},
};

/// Trial counts of one candidate against one baseline: `n` repetitions where
/// both sides were measured, `m` of which the candidate matched or beat the
/// baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trials {
  pub n: usize,
  pub m: usize,
}

/// Whether the candidate reached the baseline's throughput, for every index
/// where both have a value. Indices missing on either side are left out.
pub fn outcomes(candidate: &Series, baseline: &BaselineSeries) -> BTreeMap<u32, bool> {
  candidate
    .iter()
    .filter_map(|(&index, &value)| {
      let reference = baseline.value(index)?;
      Some((index, value >= reference))
    })
    .collect()
}

pub fn trials(candidate: &Series, baseline: &BaselineSeries) -> Trials {
  let outcomes = outcomes(candidate, baseline);

  Trials {
    n: outcomes.len(),
    m: outcomes.values().filter(|&&win| win).count(),
  }
}

/// Trial counts for every base experiment against every configured baseline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeTable {
  /// base experiment -> baseline -> trials
  pub bases: BTreeMap<String, BTreeMap<String, Trials>>,
}

impl OutcomeTable {
  pub fn evaluate(series: &SeriesSet, config: &Config) -> Self {
    let empty = BaselineSeries::default();

    let bases = series
      .candidates
      .iter()
      .map(|(base, candidate)| {
        let pairs = config
          .baselines
          .iter()
          .map(|name| {
            let baseline = series.baselines.get(name).unwrap_or(&empty);
            (name.clone(), trials(candidate, baseline))
          })
          .collect();

        (base.clone(), pairs)
      })
      .collect();

    Self { bases }
  }

  pub fn trials(&self, base: &str, baseline: &str) -> Trials {
    self
      .bases
      .get(base)
      .and_then(|pairs| pairs.get(baseline))
      .copied()
      .unwrap_or_default()
  }
}
