use std::{
  fs::{self, File},
  io::Write,
  path::{Component, Path, PathBuf},
};

use anyhow::{Context, Result};
use csv::StringRecord;
use tempfile::NamedTempFile;

#[extend::ext]
pub impl Path {
  /// Fills a temporary file next to `self` with `write`, then moves it over
  /// `self`. On error the target is left untouched. Missing parent
  /// directories are created.
  fn write_atomic<F: FnOnce(&mut File) -> Result<()>>(&self, write: F) -> Result<()> {
    let dir = match self.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };

    fs::create_dir_all(dir).with_context(|| format!("create {dir:?}"))?;
    let mut file = NamedTempFile::new_in(dir).context("tempfile")?;
    write(file.as_file_mut())?;
    file.as_file_mut().flush().context("flush")?;
    file.persist(self).context("persist")?;

    Ok(())
  }

  /// The experiment run id an iperf log was written for: its file stem, minus
  /// an `experiment_` prefix and `_output` suffix.
  fn run_id(&self) -> Result<String> {
    let stem = self.file_stem().context("file stem")?.to_string_lossy();
    let stem = stem.strip_prefix("experiment_").unwrap_or(&*stem);
    let stem = stem.strip_suffix("_output").unwrap_or(stem);

    if stem.is_empty() {
      anyhow::bail!("no run id in {self:?}");
    }

    Ok(stem.to_string())
  }

  /// `self/<name>.csv`. Fails unless `name` is a single plain file name, so
  /// the result always lies directly inside `self`.
  fn csv_file(&self, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    let plain = matches!(components.next(), Some(Component::Normal(_)))
      && components.next().is_none()
      && !name.contains(['/', '\\']);

    if !plain {
      anyhow::bail!("{name:?} is not a plain file name");
    }

    Ok(self.join(format!("{name}.csv")))
  }
}

#[extend::ext]
pub impl StringRecord {
  /// Position of the column named `name` in a header record.
  fn column_index(&self, name: &str) -> Result<usize> {
    self
      .iter()
      .position(|header| header.trim() == name)
      .with_context(|| format!("no {name:?} column in header {self:?}"))
  }
}
