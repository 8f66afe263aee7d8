//! Shared helpers for library integration tests.

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use runstore_lib::remote::{Connector, LocalFilesystem, RemoteFilesystem};
use runstore_lib::{Result, StoreError};
use tempfile::TempDir;

pub use super::fixtures::{set_mtime, write_file};

/// Isolated store root plus a parent for scratch directories.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn store_root(&self) -> PathBuf {
    let p = self.temp.path().join("store");
    fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn scratch_root(&self) -> PathBuf {
    self.temp.path().join("scratch")
  }
}

/// Local-disk remote that can be told to fail uploads and counts the ones that went through.
#[derive(Debug, Clone, Default)]
pub struct FlakyDisk {
  root: PathBuf,
  failing: Arc<Mutex<HashSet<String>>>,
  uploads: Arc<Mutex<Vec<String>>>,
}

impl FlakyDisk {
  pub fn new(root: PathBuf) -> Self {
    Self {
      root,
      ..Default::default()
    }
  }

  pub fn connector(&self) -> Connector {
    let disk = self.clone();
    Connector::new("flaky-disk", move || Ok(Box::new(disk.clone()) as Box<dyn RemoteFilesystem>))
  }

  pub fn fail_on(&self, path: &str) {
    self.failing.lock().unwrap().insert(path.to_string());
  }

  pub fn heal(&self) {
    self.failing.lock().unwrap().clear();
  }

  pub fn upload_count(&self, path: &str) -> usize {
    self.uploads.lock().unwrap().iter().filter(|p| *p == path).count()
  }

  fn inner(&self) -> LocalFilesystem {
    LocalFilesystem::new(self.root.clone())
  }
}

impl RemoteFilesystem for FlakyDisk {
  fn exists(&self, path: &str) -> Result<bool> {
    self.inner().exists(path)
  }

  fn mkdirs(&self, path: &str) -> Result<()> {
    self.inner().mkdirs(path)
  }

  fn upload(&self, path: &str, reader: &mut dyn Read) -> Result<()> {
    if self.failing.lock().unwrap().contains(path) {
      return Err(StoreError::Remote {
        path: path.to_string(),
        message: "datanode went away".to_string(),
      });
    }
    self.inner().upload(path, reader)?;
    self.uploads.lock().unwrap().push(path.to_string());
    Ok(())
  }

  fn read(&self, path: &str) -> Result<Vec<u8>> {
    self.inner().read(path)
  }

  fn delete(&self, path: &str, recursive: bool) -> Result<()> {
    self.inner().delete(path, recursive)
  }
}
