use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use regex::Regex;

use crate::{
  ext::PathExt,
  series::RunRecord,
  table,
};

/// Name of the run table written next to the per-run sample tables.
pub const RUNS_FILE: &str = "runs";

/// One throughput sample per reporting interval of `iperf3 -f K`.
const RATE_PATTERN: &str = r"(\d+(?:\.\d+)?) KBytes/sec";

/// Turns a directory of iperf logs into the run table and one sample table
/// per run.
pub struct Ingest {
  input_dir: PathBuf,
  output_dir: PathBuf,
  rate: Regex,
}

impl Ingest {
  pub fn new(input_dir: PathBuf, output_dir: PathBuf) -> Result<Self> {
    Ok(Self {
      input_dir,
      output_dir,
      rate: Regex::new(RATE_PATTERN).context("rate pattern")?,
    })
  }

  /// Writes `<run_id>_iperf.csv` for every log with samples, then the run
  /// table. Returns the run table's rows, sorted by run id. Logs that can't be
  /// read or hold no samples are skipped.
  pub fn ingest(&self) -> Result<Vec<RunRecord>> {
    fs::create_dir_all(&self.output_dir).with_context(|| format!("create {:?}", self.output_dir))?;

    let mut seen = BTreeMap::new();
    let mut records = Vec::new();
    for path in self.logs().context("logs")? {
      let (run_id, samples) = match self.read_log(&path) {
        Ok(read) => read,
        Err(err) => {
          log::warn!("skipping {path:?}: {err:#}");
          continue;
        }
      };

      let Some(average) = average(&samples) else {
        log::warn!("no throughput samples in {path:?}, skipping");
        continue;
      };
      log::info!("{run_id}: {} samples, average {average} KBytes/sec", samples.len());

      if let Some(first) = note_run(&mut seen, &run_id, &path) {
        log::warn!("{path:?} repeats run {run_id:?} of {first:?}, its samples replace the earlier ones");
      }

      let samples_file = match self.output_dir.csv_file(&format!("{run_id}_iperf")) {
        Ok(file) => file,
        Err(err) => {
          log::warn!("skipping {path:?}: {err}");
          continue;
        }
      };
      samples_file
        .write_atomic(|file| table::write_samples(file, &samples))
        .with_context(|| format!("write samples of {run_id}"))?;

      records.push(RunRecord::new(run_id, average));
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));

    self
      .output_dir
      .csv_file(RUNS_FILE)?
      .write_atomic(|file| table::write_runs(file, &records))
      .context("write runs")?;

    Ok(records)
  }

  /// The run id and interval samples of one log.
  fn read_log(&self, path: &Path) -> Result<(String, Vec<f64>)> {
    let run_id = path.run_id()?;
    let text = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;

    Ok((run_id, self.samples(&text)))
  }

  /// Throughput of every reporting interval in an iperf log. The closing
  /// `sender`/`receiver` summary lines are not intervals.
  pub fn samples(&self, text: &str) -> Vec<f64> {
    text
      .lines()
      .filter(|line| !line.contains("sender") && !line.contains("receiver"))
      .filter_map(|line| self.rate.captures(line))
      .filter_map(|captures| captures[1].parse::<f64>().ok())
      .collect()
  }

  /// `*.txt` files in the input directory and below, sorted.
  fn logs(&self) -> Result<Vec<PathBuf>> {
    let mut logs = Vec::new();
    collect_logs(&self.input_dir, &mut logs)?;
    logs.sort();

    Ok(logs)
  }
}

fn collect_logs(dir: &Path, logs: &mut Vec<PathBuf>) -> Result<()> {
  for entry in fs::read_dir(dir).with_context(|| format!("read dir {dir:?}"))? {
    let path = entry.context("dir entry")?.path();

    if path.is_dir() {
      collect_logs(&path, logs)?;
    } else if path.extension().is_some_and(|ext| ext == "txt") {
      logs.push(path);
    }
  }

  Ok(())
}

/// Records that `run_id` came from `path`. Returns the earlier log of the same
/// run id, if any.
fn note_run(seen: &mut BTreeMap<String, PathBuf>, run_id: &str, path: &Path) -> Option<PathBuf> {
  match seen.get(run_id) {
    Some(first) => Some(first.clone()),
    None => {
      seen.insert(run_id.to_string(), path.to_path_buf());
      None
    }
  }
}

/// Integer mean of `samples`, truncated.
pub fn average(samples: &[f64]) -> Option<f64> {
  if samples.is_empty() {
    return None;
  }

  Some((samples.iter().sum::<f64>() / samples.len() as f64).trunc())
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  const LOG: &str = "\
Connecting to host 192.168.1.1, port 5201
[  5] local 192.168.1.2 port 43210 connected to 192.168.1.1 port 5201
[ ID] Interval           Transfer     Bitrate         Retr  Cwnd
[  5]   0.00-1.00   sec  11.2 MBytes  11468 KBytes/sec    0    411 KBytes
[  5]   1.00-2.00   sec  11.6 MBytes  11904 KBytes/sec    0    411 KBytes
[  5]   2.00-3.00   sec  11.1 MBytes  11345 KBytes/sec   12    290 KBytes
- - - - - - - - - - - - - - - - - - - - - - - - -
[ ID] Interval           Transfer     Bitrate         Retr
[  5]   0.00-3.00   sec  33.9 MBytes  11572 KBytes/sec   12             sender
[  5]   0.00-3.00   sec  33.6 MBytes  11470 KBytes/sec                  receiver
";

  fn ingest(dir: &TempDir) -> Ingest {
    Ingest::new(dir.path().join("logs"), dir.path().join("csv")).unwrap()
  }

  #[test]
  fn interval_samples() {
    let dir = TempDir::new().unwrap();

    assert_eq!(ingest(&dir).samples(LOG), [11468.0, 11904.0, 11345.0]);
    assert_eq!(ingest(&dir).samples("[  5] 0.00-1.00 sec 1.5 KBytes/sec"), [1.5]);
    assert!(ingest(&dir).samples("nothing to see").is_empty());
  }

  #[test]
  fn averages_truncate() {
    assert_eq!(average(&[11468.0, 11904.0, 11345.0]), Some(11572.0));
    assert_eq!(average(&[1.0, 2.0]), Some(1.0));
    assert_eq!(average(&[]), None);
  }

  #[test]
  fn writes_run_table() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir_all(logs.join("cubic")).unwrap();
    fs::write(logs.join("cubic/experiment_cubic_e_1_output.txt"), LOG).unwrap();
    fs::write(logs.join("myalgo_e_1.txt"), "[  5] 0.00-1.00 sec 1 MBytes 900 KBytes/sec").unwrap();
    fs::write(logs.join("empty_e_1.txt"), "iperf3: error - unable to connect").unwrap();
    fs::write(logs.join("notes.md"), "100 KBytes/sec").unwrap();

    let records = ingest(&dir).ingest().unwrap();

    assert_eq!(
      records,
      [RunRecord::new("cubic_e_1", 11572.0), RunRecord::new("myalgo_e_1", 900.0)]
    );

    let csv = dir.path().join("csv");
    assert_eq!(
      fs::read_to_string(csv.join("runs.csv")).unwrap(),
      "experiment,average_bitrate\ncubic_e_1,11572\nmyalgo_e_1,900\n"
    );
    assert_eq!(
      fs::read_to_string(csv.join("cubic_e_1_iperf.csv")).unwrap(),
      "time,bitrate\n0,11468\n1,11904\n2,11345\n"
    );
    assert!(!csv.join("empty_e_1_iperf.csv").exists());
  }

  #[test]
  fn unreadable_logs_are_skipped() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir_all(&logs).unwrap();
    fs::write(logs.join("myalgo_e_1.txt"), "[  5] 0.00-1.00 sec 1 MBytes 900 KBytes/sec").unwrap();
    fs::write(logs.join("zz_e_1.txt"), b"\xff\xfe 100 KBytes/sec").unwrap();
    fs::write(logs.join("experiment__output.txt"), "[  5] 0.00-1.00 sec 1 MBytes 5 KBytes/sec").unwrap();

    let records = ingest(&dir).ingest().unwrap();

    assert_eq!(records, [RunRecord::new("myalgo_e_1", 900.0)]);
    assert_eq!(
      fs::read_to_string(dir.path().join("csv/runs.csv")).unwrap(),
      "experiment,average_bitrate\nmyalgo_e_1,900\n"
    );
  }

  #[test]
  fn repeated_run_ids_are_noticed() {
    let mut seen = BTreeMap::new();

    assert_eq!(note_run(&mut seen, "cubic_e_1", Path::new("a/cubic_e_1.txt")), None);
    assert_eq!(note_run(&mut seen, "myalgo_e_1", Path::new("a/myalgo_e_1.txt")), None);
    assert_eq!(
      note_run(&mut seen, "cubic_e_1", Path::new("b/experiment_cubic_e_1_output.txt")),
      Some(PathBuf::from("a/cubic_e_1.txt"))
    );
  }

  #[test]
  fn repeated_run_ids_keep_both_rows() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir_all(logs.join("a")).unwrap();
    fs::create_dir_all(logs.join("b")).unwrap();
    fs::write(logs.join("a/cubic_e_1.txt"), "[  5] 0.00-1.00 sec 1 MBytes 100 KBytes/sec").unwrap();
    fs::write(logs.join("b/cubic_e_1.txt"), "[  5] 0.00-1.00 sec 1 MBytes 200 KBytes/sec").unwrap();

    let records = ingest(&dir).ingest().unwrap();

    assert_eq!(
      records,
      [RunRecord::new("cubic_e_1", 100.0), RunRecord::new("cubic_e_1", 200.0)]
    );
    assert_eq!(
      fs::read_to_string(dir.path().join("csv/cubic_e_1_iperf.csv")).unwrap(),
      "time,bitrate\n0,200\n"
    );
  }
}
