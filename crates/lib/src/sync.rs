//! Incremental upload of a run's scratch directory.
//!
//! A [`SyncSession`] belongs to one run. Each [`sync`](SyncSession::sync) call
//! walks the scratch directory and uploads every regular file that is new or
//! whose modification time moved forward since the last successful upload.
//! The session remembers what it uploaded in an [`UploadLedger`], so calling it
//! again without local changes transfers nothing, and a call that failed
//! half-way can simply be repeated.
//!
//! The ledger lives in memory only. A new process starts with an empty ledger
//! and re-uploads everything on its first call.
//!
//! Change detection looks at whole-second modification times only. A file
//! rewritten with new content inside the same second as its last upload is not
//! picked up until it is touched again.

use std::collections::HashMap;
use std::fs::{File, Metadata};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, StoreError};
use crate::remote::{Connector, RemoteFilesystem};

/// Local file path → modification time (Unix seconds) of its last successful upload.
#[derive(Debug, Default, Clone)]
pub struct UploadLedger {
  entries: HashMap<PathBuf, i64>,
}

impl UploadLedger {
  pub fn new() -> Self {
    Self::default()
  }

  /// Unknown paths and paths modified strictly after their recorded upload.
  pub fn needs_upload(&self, path: &Path, modified: i64) -> bool {
    match self.entries.get(path) {
      Some(&last) => modified > last,
      None => true,
    }
  }

  pub fn record(&mut self, path: PathBuf, modified: i64) {
    self.entries.insert(path, modified);
  }

  pub fn get(&self, path: &Path) -> Option<i64> {
    self.entries.get(path).copied()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// What a single sync call did.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  /// Remote paths written, in walk order.
  pub uploaded: Vec<String>,
  /// Files left alone because the ledger already covered them.
  pub skipped: usize,
  /// Total size of the uploaded files.
  pub bytes: u64,
}

impl SyncReport {
  pub fn is_noop(&self) -> bool {
    self.uploaded.is_empty()
  }
}

/// Sync state for one run: the ledger and a lazily opened remote handle.
///
/// Both are private to the session; give every run its own. `sync` takes
/// `&mut self`, so sharing a session between threads needs a lock around it.
#[derive(Debug)]
pub struct SyncSession {
  run_id: String,
  remote_root: String,
  connector: Connector,
  fs: Option<Box<dyn RemoteFilesystem>>,
  ledger: UploadLedger,
}

impl SyncSession {
  pub fn new(run_id: impl Into<String>, remote_root: impl Into<String>, connector: Connector) -> Self {
    Self {
      run_id: run_id.into(),
      remote_root: remote_root.into(),
      connector,
      fs: None,
      ledger: UploadLedger::new(),
    }
  }

  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  /// Remote directory mirroring the scratch directory.
  pub fn remote_root(&self) -> &str {
    &self.remote_root
  }

  pub fn ledger(&self) -> &UploadLedger {
    &self.ledger
  }

  pub fn is_connected(&self) -> bool {
    self.fs.is_some()
  }

  /// Push new and changed files under `local_run_path` to the remote root.
  ///
  /// Stops at the first failed upload. Files uploaded earlier in the same call
  /// are already in the ledger and are skipped when the call is repeated.
  pub fn sync(&mut self, local_run_path: &Path) -> Result<SyncReport> {
    let fs = match self.fs.take() {
      Some(fs) => fs,
      None => {
        let fs = self.connector.connect()?;
        info!(run_id = %self.run_id, endpoint = %self.connector.describe(), "opened sync connection");
        fs
      }
    };
    let fs: &dyn RemoteFilesystem = &**self.fs.insert(fs);

    let mut report = SyncReport::default();

    for entry in WalkDir::new(local_run_path).follow_links(false).sort_by_file_name() {
      let entry = entry.map_err(|e| StoreError::Walk {
        path: local_run_path.to_path_buf(),
        message: e.to_string(),
      })?;
      if !entry.file_type().is_file() {
        continue;
      }

      let local_path = entry.path();
      let metadata = entry.metadata().map_err(|e| StoreError::Walk {
        path: local_path.to_path_buf(),
        message: e.to_string(),
      })?;
      let modified = modified_secs(&metadata)?;

      if !self.ledger.needs_upload(local_path, modified) {
        report.skipped += 1;
        continue;
      }

      let remote_path = remote_target(&self.remote_root, local_run_path, local_path)?;
      upload_file(fs, local_path, &remote_path).map_err(|e| StoreError::Upload {
        local: local_path.to_path_buf(),
        remote: remote_path.clone(),
        source: Box::new(e),
      })?;

      debug!(run_id = %self.run_id, local = ?local_path, remote = %remote_path, modified, "uploaded");
      self.ledger.record(local_path.to_path_buf(), modified);
      report.uploaded.push(remote_path);
      report.bytes += metadata.len();
    }

    info!(
      run_id = %self.run_id,
      uploaded = report.uploaded.len(),
      skipped = report.skipped,
      "sync complete"
    );
    Ok(report)
  }
}

/// Re-root `file` from `local_root` onto `remote_root`.
pub fn remote_target(remote_root: &str, local_root: &Path, file: &Path) -> Result<String> {
  let relative = file.strip_prefix(local_root).map_err(|_| StoreError::Walk {
    path: file.to_path_buf(),
    message: format!("not under {}", local_root.display()),
  })?;

  let mut target = remote_root.trim_end_matches('/').to_string();
  for part in relative.components() {
    // Lossy conversion would let two local files share one store path.
    let part = part.as_os_str().to_str().ok_or_else(|| StoreError::Walk {
      path: file.to_path_buf(),
      message: "non-UTF-8 path has no store equivalent".to_string(),
    })?;
    target.push('/');
    target.push_str(part);
  }
  Ok(target)
}

fn modified_secs(metadata: &Metadata) -> Result<i64> {
  let modified = metadata.modified()?;
  Ok(match modified.duration_since(UNIX_EPOCH) {
    Ok(d) => d.as_secs() as i64,
    Err(e) => -(e.duration().as_secs() as i64),
  })
}

fn upload_file(fs: &dyn RemoteFilesystem, local: &Path, remote: &str) -> Result<()> {
  let mut file = File::open(local)?;
  fs.upload(remote, &mut file)
}
