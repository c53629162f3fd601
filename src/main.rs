mod config;
mod ext;
mod format;
mod ident;
mod ingest;
mod outcome;
mod pipeline;
mod series;
mod stats;
mod table;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use self::{config::Config, ingest::Ingest};

#[derive(Parser)]
#[command(about = "Checks whether a congestion-control candidate beats traditional algorithms")]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Extracts per-run average throughput from a directory of iperf logs.
  Ingest {
    /// Directory searched for `*.txt` iperf logs.
    #[arg(long, default_value = "./test_output")]
    input_dir: PathBuf,
    /// Where the run table and the per-run sample tables are written.
    #[arg(long, default_value = "./test_output/csv_files")]
    output_dir: PathBuf,
  },
  /// Tests each base experiment against each baseline and writes the verdicts.
  Check {
    /// Run table with `experiment` and `average_bitrate` columns.
    #[arg(long, default_value = "./test_output/csv_files/runs.csv")]
    input: PathBuf,
    /// Verdict table to write.
    #[arg(long, default_value = "./test_output/result/verdicts.csv")]
    output: PathBuf,
    /// Also write whether each candidate run beat each baseline.
    #[arg(long)]
    outcomes: Option<PathBuf>,
    /// TOML file overriding baselines, separators and targets.
    #[arg(long)]
    config: Option<PathBuf>,
  },
  /// Writes each base experiment's series next to the baselines' series.
  Series {
    /// Run table with `experiment` and `average_bitrate` columns.
    #[arg(long, default_value = "./test_output/csv_files/runs.csv")]
    input: PathBuf,
    /// Directory receiving one `<base>.csv` per base experiment.
    #[arg(long, default_value = "./test_output/result")]
    output_dir: PathBuf,
    /// TOML file overriding baselines, separators and targets.
    #[arg(long)]
    config: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  match Args::parse().command {
    Command::Ingest { input_dir, output_dir } => {
      if !input_dir.is_dir() {
        anyhow::bail!("{input_dir:?} is not a directory");
      }

      let records = Ingest::new(input_dir, output_dir)
        .context("Ingest::new")?
        .ingest()
        .context("ingest")?;
      log::info!("ingested {} runs", records.len());
    }
    Command::Check {
      input,
      output,
      outcomes,
      config,
    } => {
      let config = Config::load(config.as_deref()).context("config")?;

      let verdicts = pipeline::check(&input, &output, outcomes.as_deref(), &config).context("check")?;

      print!("{}", format::format(&verdicts, &config.no_data).context("format")?);
    }
    Command::Series { input, output_dir, config } => {
      let config = Config::load(config.as_deref()).context("config")?;

      pipeline::series(&input, &output_dir, &config).context("series")?;
    }
  }

  Ok(())
}
