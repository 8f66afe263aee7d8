//! Local-disk backend.
//!
//! Remote paths are resolved under a root directory (`/` for a real store).
//! Uploads go to a temp file next to the target and are renamed into place so
//! a reader never sees a half-written artifact.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;

use super::RemoteFilesystem;
use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct LocalFilesystem {
  root: PathBuf,
}

impl LocalFilesystem {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Map a remote path onto the local disk.
  pub fn resolve(&self, path: &str) -> PathBuf {
    let mut out = self.root.clone();
    for part in path.split('/').filter(|p| !p.is_empty()) {
      out.push(part);
    }
    out
  }
}

impl RemoteFilesystem for LocalFilesystem {
  fn exists(&self, path: &str) -> Result<bool> {
    self
      .resolve(path)
      .try_exists()
      .map_err(|e| StoreError::remote(path, e))
  }

  fn mkdirs(&self, path: &str) -> Result<()> {
    fs::create_dir_all(self.resolve(path)).map_err(|e| StoreError::remote(path, e))
  }

  fn upload(&self, path: &str, reader: &mut dyn Read) -> Result<()> {
    let target = self.resolve(path);
    let parent = target
      .parent()
      .ok_or_else(|| StoreError::remote(path, "cannot upload to the filesystem root"))?;
    fs::create_dir_all(parent).map_err(|e| StoreError::remote(path, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| StoreError::remote(path, e))?;
    let bytes = io::copy(reader, &mut temp).map_err(|e| StoreError::remote(path, e))?;
    temp
      .persist(&target)
      .map_err(|e| StoreError::remote(path, e.error))?;

    trace!(path = %path, bytes, "wrote file");
    Ok(())
  }

  fn read(&self, path: &str) -> Result<Vec<u8>> {
    fs::read(self.resolve(path)).map_err(|e| StoreError::remote(path, e))
  }

  fn delete(&self, path: &str, recursive: bool) -> Result<()> {
    let target = self.resolve(path);
    let result = if target.is_dir() {
      if recursive {
        fs::remove_dir_all(&target)
      } else {
        fs::remove_dir(&target)
      }
    } else {
      fs::remove_file(&target)
    };

    match result {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(StoreError::remote(path, e)),
    }
  }
}
