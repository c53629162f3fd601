use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
  #[error("at least one baseline name is required")]
  NoBaselines,
  #[error("at least one target probability is required")]
  NoTargets,
  #[error("repetition separator must not be empty")]
  EmptySeparator,
  #[error("target probability {0} is outside (0, 1)")]
  Probability(f64),
  #[error("critical value {0} is not finite")]
  CriticalValue(f64),
  #[error("baseline {0:?} is listed more than once")]
  DuplicateBaseline(String),
  #[error("target probability {0} is listed more than once")]
  DuplicateTarget(f64),
  #[error("scale must be positive, got {0}")]
  Scale(f64),
}

/// A target win probability `p` paired with the one-sided normal critical
/// value `l` the test criterion is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
  pub p: f64,
  pub l: f64,
}

/// Every adjustable constant of the aggregation. Any subset of the fields can
/// be overridden from a TOML file; the rest keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Names of the traditional algorithms, in output column order.
  pub baselines: Vec<String>,
  /// Marks the repetition index in a run id, as in `<base>_e_<n>`.
  pub separator: String,
  /// Optional marker between a baseline name and the rest of its id, as in
  /// `cubic_t`.
  pub baseline_marker: String,
  /// Target probabilities and critical values, in output column order.
  pub targets: Vec<Target>,
  /// Stands in for `sqrt(p(1-p))` in the test criterion.
  pub scale: f64,
  /// Written into verdict cells that have no trials.
  pub no_data: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      baselines: ["cubic", "bbr", "bic", "htcp", "highspeed", "illinoise"]
        .into_iter()
        .map(String::from)
        .collect(),
      separator: "_e_".to_string(),
      baseline_marker: "_t".to_string(),
      targets: vec![
        Target { p: 0.9, l: -1.64 },
        Target { p: 0.8, l: -1.28 },
        Target { p: 0.7, l: -1.03 },
        Target { p: 0.6, l: -0.84 },
      ],
      scale: 0.3,
      no_data: "n/a".to_string(),
    }
  }
}

impl Config {
  /// Loads the defaults, overridden by `path` when one is given.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let config = match path {
      Some(path) => {
        let text = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
        Self::from_toml(&text).with_context(|| format!("parse {path:?}"))?
      }
      None => Self::default(),
    };

    config.validate()?;
    log::debug!("using {config:?}");

    Ok(config)
  }

  pub fn from_toml(text: &str) -> Result<Self> {
    Ok(toml::from_str(text)?)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.baselines.is_empty() {
      return Err(ConfigError::NoBaselines);
    }
    if self.targets.is_empty() {
      return Err(ConfigError::NoTargets);
    }
    if self.separator.is_empty() {
      return Err(ConfigError::EmptySeparator);
    }
    if let Some(target) = self.targets.iter().find(|t| !(t.p > 0.0 && t.p < 1.0)) {
      return Err(ConfigError::Probability(target.p));
    }
    if let Some(target) = self.targets.iter().find(|t| !t.l.is_finite()) {
      return Err(ConfigError::CriticalValue(target.l));
    }
    // Verdict columns are named after (baseline, p) and must stay unique.
    for (i, name) in self.baselines.iter().enumerate() {
      if self.baselines[..i].contains(name) {
        return Err(ConfigError::DuplicateBaseline(name.clone()));
      }
    }
    for (i, target) in self.targets.iter().enumerate() {
      if self.targets[..i].iter().any(|t| t.p == target.p) {
        return Err(ConfigError::DuplicateTarget(target.p));
      }
    }
    if !(self.scale > 0.0) {
      return Err(ConfigError::Scale(self.scale));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let config = Config::default();
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.baselines.len(), 6);
    assert_eq!(config.targets[3], Target { p: 0.6, l: -0.84 });
  }

  #[test]
  fn toml_overrides_only_given_fields() {
    let config = Config::from_toml(
      r#"
        baselines = ["cubic", "bbr"]

        [[targets]]
        p = 0.9
        l = -1.64
      "#,
    )
    .unwrap();

    assert_eq!(config.baselines, ["cubic", "bbr"]);
    assert_eq!(config.targets, [Target { p: 0.9, l: -1.64 }]);
    assert_eq!(config.separator, "_e_");
    assert_eq!(config.scale, 0.3);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(Config::from_toml("separater = \"_r_\"").is_err());
  }

  #[test]
  fn invalid_values_are_rejected() {
    let mut config = Config::default();
    config.targets.push(Target { p: 1.0, l: 0.0 });
    assert_eq!(config.validate(), Err(ConfigError::Probability(1.0)));

    let config = Config { scale: 0.0, ..Config::default() };
    assert_eq!(config.validate(), Err(ConfigError::Scale(0.0)));

    let config = Config { separator: String::new(), ..Config::default() };
    assert_eq!(config.validate(), Err(ConfigError::EmptySeparator));

    let config = Config { baselines: vec![], ..Config::default() };
    assert_eq!(config.validate(), Err(ConfigError::NoBaselines));
  }

  #[test]
  fn duplicate_columns_are_rejected() {
    let config = Config {
      baselines: vec!["cubic".to_string(), "bbr".to_string(), "cubic".to_string()],
      ..Config::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::DuplicateBaseline("cubic".to_string())));

    let config = Config::from_toml(
      r#"
        [[targets]]
        p = 0.9
        l = -1.64

        [[targets]]
        p = 0.9
        l = -1.28
      "#,
    )
    .unwrap();
    assert_eq!(config.validate(), Err(ConfigError::DuplicateTarget(0.9)));
  }

  #[test]
  fn non_finite_critical_value_is_rejected() {
    let config = Config {
      targets: vec![Target { p: 0.9, l: f64::NEG_INFINITY }],
      ..Config::default()
    };

    assert_eq!(config.validate(), Err(ConfigError::CriticalValue(f64::NEG_INFINITY)));
  }
}
