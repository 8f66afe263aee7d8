//! Scratch directories for runs.
//!
//! A run writes its artifacts into an anonymous temporary directory and syncs
//! them to the store from there. The directory is owned by a [`ScratchDir`]
//! guard and removed when the guard goes away, whether the run returned,
//! failed or panicked.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::consts::SCRATCH_DIR_PREFIX;
use crate::error::{Result, StoreError};

/// Factory for a run's scratch directories, returned by
/// [`FilesystemStore::get_local_output_dir_fn`](crate::store::FilesystemStore::get_local_output_dir_fn).
#[derive(Debug, Clone)]
pub struct LocalOutputDir {
  run_id: String,
  temp_dir: Option<PathBuf>,
}

impl LocalOutputDir {
  /// `temp_dir` is the parent for new directories; `None` means the system temp root.
  pub fn new(run_id: impl Into<String>, temp_dir: Option<PathBuf>) -> Self {
    Self {
      run_id: run_id.into(),
      temp_dir,
    }
  }

  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  pub fn temp_dir(&self) -> Option<&Path> {
    self.temp_dir.as_deref()
  }

  /// Create a fresh, uniquely named directory.
  pub fn acquire(&self) -> Result<ScratchDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_DIR_PREFIX);

    let dir = match &self.temp_dir {
      Some(parent) => {
        std::fs::create_dir_all(parent).map_err(StoreError::Scratch)?;
        builder.tempdir_in(parent)
      }
      None => builder.tempdir(),
    }
    .map_err(StoreError::Scratch)?;

    debug!(run_id = %self.run_id, path = ?dir.path(), "acquired scratch directory");

    Ok(ScratchDir {
      dir: Some(dir),
      run_id: self.run_id.clone(),
    })
  }

  /// Run `f` with a fresh scratch directory that is deleted once `f` is done.
  ///
  /// The directory is removed on success, on error and during unwinding.
  pub fn scoped<T, E, F>(&self, f: F) -> std::result::Result<T, E>
  where
    F: FnOnce(&Path) -> std::result::Result<T, E>,
    E: From<StoreError>,
  {
    let scratch = self.acquire()?;
    let result = f(scratch.path());
    match result {
      Ok(value) => {
        scratch.close()?;
        Ok(value)
      }
      // The guard's drop removes the directory; the closure's error wins.
      Err(e) => Err(e),
    }
  }
}

/// A scratch directory held by one run.
#[derive(Debug)]
pub struct ScratchDir {
  dir: Option<TempDir>,
  run_id: String,
}

impl ScratchDir {
  pub fn path(&self) -> &Path {
    // Only `close` and `drop` take the directory out, and both consume self.
    self
      .dir
      .as_ref()
      .map(TempDir::path)
      .unwrap_or_else(|| Path::new(""))
  }

  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  /// Delete the directory now and report failures instead of logging them.
  pub fn close(mut self) -> Result<()> {
    match self.dir.take() {
      Some(dir) => {
        let path = dir.path().to_path_buf();
        dir.close().map_err(StoreError::Scratch)?;
        debug!(run_id = %self.run_id, path = ?path, "removed scratch directory");
        Ok(())
      }
      None => Ok(()),
    }
  }
}

impl Drop for ScratchDir {
  fn drop(&mut self) {
    if let Some(dir) = self.dir.take() {
      let path = dir.path().to_path_buf();
      if let Err(e) = dir.close() {
        warn!(run_id = %self.run_id, path = ?path, error = %e, "failed to remove scratch directory");
      } else {
        debug!(run_id = %self.run_id, path = ?path, "removed scratch directory");
      }
    }
  }
}
