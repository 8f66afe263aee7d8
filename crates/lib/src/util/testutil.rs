//! Test utilities for runstore-lib.
//!
//! A recording remote filesystem with injectable upload failures, and helpers
//! for laying out scratch directories.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::sync::{Arc, Mutex};

use crate::error::{Result, StoreError};
use crate::remote::{Connector, RemoteFilesystem};

#[path = "../../tests/library/fixtures.rs"]
mod fixtures;

pub use fixtures::{set_mtime, write_file};

#[derive(Debug, Default)]
struct RecordingState {
  files: BTreeMap<String, Vec<u8>>,
  uploads: Vec<String>,
  fail_paths: HashSet<String>,
  connects: usize,
}

/// In-memory remote that records every upload.
///
/// Clones share state, so a test can keep one copy for assertions while the
/// connector hands others to a sync session.
#[derive(Debug, Clone, Default)]
pub struct RecordingFilesystem {
  state: Arc<Mutex<RecordingState>>,
}

impl RecordingFilesystem {
  pub fn connector(&self) -> Connector {
    let remote = self.clone();
    Connector::new("recording", move || {
      remote.state.lock().unwrap().connects += 1;
      Ok(Box::new(remote.clone()) as Box<dyn RemoteFilesystem>)
    })
  }

  /// Make uploads to `path` fail until [`clear_failures`](Self::clear_failures).
  pub fn fail_on(&self, path: &str) {
    self.state.lock().unwrap().fail_paths.insert(path.to_string());
  }

  pub fn clear_failures(&self) {
    self.state.lock().unwrap().fail_paths.clear();
  }

  pub fn upload_count(&self, path: &str) -> usize {
    self.state.lock().unwrap().uploads.iter().filter(|p| *p == path).count()
  }

  pub fn uploads(&self) -> Vec<String> {
    self.state.lock().unwrap().uploads.clone()
  }

  pub fn content(&self, path: &str) -> Option<Vec<u8>> {
    self.state.lock().unwrap().files.get(path).cloned()
  }

  pub fn connects(&self) -> usize {
    self.state.lock().unwrap().connects
  }
}

impl RemoteFilesystem for RecordingFilesystem {
  fn exists(&self, path: &str) -> Result<bool> {
    let state = self.state.lock().unwrap();
    let dir = format!("{}/", path.trim_end_matches('/'));
    Ok(state.files.keys().any(|p| p == path || p.starts_with(&dir)))
  }

  fn mkdirs(&self, _path: &str) -> Result<()> {
    Ok(())
  }

  fn upload(&self, path: &str, reader: &mut dyn Read) -> Result<()> {
    let mut state = self.state.lock().unwrap();
    if state.fail_paths.contains(path) {
      return Err(StoreError::remote(path, "injected failure"));
    }
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    state.files.insert(path.to_string(), data);
    state.uploads.push(path.to_string());
    Ok(())
  }

  fn read(&self, path: &str) -> Result<Vec<u8>> {
    self
      .state
      .lock()
      .unwrap()
      .files
      .get(path)
      .cloned()
      .ok_or_else(|| StoreError::remote(path, "not found"))
  }

  fn delete(&self, path: &str, _recursive: bool) -> Result<()> {
    let dir = format!("{}/", path.trim_end_matches('/'));
    self
      .state
      .lock()
      .unwrap()
      .files
      .retain(|p, _| p != path && !p.starts_with(&dir));
    Ok(())
  }
}
