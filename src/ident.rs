use thiserror::Error;

use crate::config::Config;

/// A classified experiment run id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunId {
  /// A run of a traditional algorithm. Without an index it is a single
  /// reference measurement shared by every repetition.
  Baseline { name: String, index: Option<u32> },
  /// One repetition of a candidate configuration.
  CandidateRun { base: String, index: u32 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq, PartialOrd, Ord)]
#[error("unparsable experiment run id {0:?}")]
pub struct UnparsableId(pub String);

/// Classifies `id` against the configured baseline names and repetition
/// separator.
///
/// Baseline names take priority: a stem equal to a baseline name (optionally
/// followed by the baseline marker) is a baseline even when it also carries a
/// repetition index. Names are matched on the whole stem, never as a
/// substring, since `bic` is contained in `cubic`.
pub fn parse(id: &str, config: &Config) -> Result<RunId, UnparsableId> {
  let (stem, index) = split_index(id, &config.separator);

  if let Some(name) = baseline_name(stem, config) {
    return Ok(RunId::Baseline {
      name: name.to_string(),
      index,
    });
  }

  match index {
    Some(index) if !stem.is_empty() => Ok(RunId::CandidateRun {
      base: stem.to_string(),
      index,
    }),
    _ => Err(UnparsableId(id.to_string())),
  }
}

/// Splits `<stem><separator><n>` into its stem and positive index. Ids that
/// don't end in such a suffix are returned whole.
fn split_index<'a>(id: &'a str, separator: &str) -> (&'a str, Option<u32>) {
  let Some(at) = id.rfind(separator) else {
    return (id, None);
  };

  let digits = &id[at + separator.len()..];
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return (id, None);
  }

  match digits.parse::<u32>() {
    Ok(index) if index > 0 => (&id[..at], Some(index)),
    _ => (id, None),
  }
}

fn baseline_name<'c>(stem: &str, config: &'c Config) -> Option<&'c str> {
  let unmarked = stem.strip_suffix(config.baseline_marker.as_str());

  config
    .baselines
    .iter()
    .map(String::as_str)
    .find(|&name| stem == name || unmarked == Some(name))
}
