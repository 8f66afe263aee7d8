//! Artifact stores.
//!
//! A store owns a validated location and knows how to reach its backend. Runs
//! get two things from it: a scratch-directory factory and a sync session that
//! mirrors the scratch directory into the store.
//!
//! # Layout
//!
//! ```text
//! <prefix_path>/
//! └── <run_id>/               # one subtree per run, mirrors the scratch dir
//!     ├── checkpoint/
//!     ├── logs/
//!     └── ...
//! ```
//!
//! Backends are a closed set. [`StoreKind`] maps declared scheme prefixes to
//! constructors and [`Store`] wraps whichever one a location selects.

pub mod hdfs;
pub mod local;
pub mod options;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::consts::{CHECKPOINT_DIR, LOGS_DIR};
use crate::error::{Result, StoreError};
use crate::location::{StoreLocation, parse_url};
use crate::remote::{self, Connector, RemoteFilesystem};
use crate::scratch::LocalOutputDir;
use crate::sync::SyncSession;

pub use hdfs::HdfsStore;
pub use local::LocalFilesystemStore;
pub use options::StoreOptions;

/// Capabilities every store offers, whatever the backend.
pub trait FilesystemStore {
  fn location(&self) -> &StoreLocation;

  /// Parent directory for scratch directories, if configured.
  fn temp_dir(&self) -> Option<&Path>;

  /// Factory for fresh remote handles.
  fn connector(&self) -> Connector;

  /// The store's own remote handle, connected on first use and reused after.
  fn get_filesystem(&self) -> Result<Arc<dyn RemoteFilesystem>>;

  /// The location string the store was built from.
  fn prefix_path(&self) -> &str {
    self.location().url()
  }

  /// Scheme and authority in front of every store path, e.g. `hdfs://nn:8020`.
  fn path_prefix(&self) -> &str {
    self.location().url_prefix()
  }

  /// `<path>/<run_id>`, after checking the run id with [`check_run_id`].
  fn get_run_path(&self, run_id: &str) -> Result<String> {
    check_run_id(run_id)?;
    Ok(remote::join(self.location().path(), run_id))
  }

  fn get_checkpoint_path(&self, run_id: &str) -> Result<String> {
    Ok(remote::join(&self.get_run_path(run_id)?, CHECKPOINT_DIR))
  }

  fn get_logs_path(&self, run_id: &str) -> Result<String> {
    Ok(remote::join(&self.get_run_path(run_id)?, LOGS_DIR))
  }

  /// A store path with the URL prefix put back, for engines that want URLs.
  fn get_full_path(&self, path: &str) -> String {
    self.location().full_path(path)
  }

  fn get_local_output_dir_fn(&self, run_id: &str) -> LocalOutputDir {
    LocalOutputDir::new(run_id, self.temp_dir().map(Path::to_path_buf))
  }

  /// A new sync session for `run_id`, rooted at [`get_run_path`](Self::get_run_path).
  fn sync_fn(&self, run_id: &str) -> Result<SyncSession> {
    Ok(SyncSession::new(run_id, self.get_run_path(run_id)?, self.connector()))
  }

  fn exists(&self, path: &str) -> Result<bool> {
    self.get_filesystem()?.exists(path)
  }

  fn read(&self, path: &str) -> Result<Vec<u8>> {
    self.get_filesystem()?.read(path)
  }
}

/// Reject run ids that would leave `<path>/<run_id>`: empty ones, absolute
/// ones and any with an empty, `.` or `..` segment. Nested ids like
/// `sweep-3/trial-7` are fine.
pub fn check_run_id(run_id: &str) -> Result<()> {
  let invalid = |reason: &str| StoreError::InvalidRunId {
    run_id: run_id.to_string(),
    reason: reason.to_string(),
  };

  if run_id.is_empty() {
    return Err(invalid("must not be empty"));
  }
  for segment in run_id.split(['/', '\\']) {
    match segment {
      "" => return Err(invalid("must be relative, without empty segments")),
      "." | ".." => return Err(invalid("must not contain '.' or '..' segments")),
      _ => {}
    }
  }
  Ok(())
}

/// A concrete backend, selectable by its scheme prefix.
pub trait StoreBackend: FilesystemStore + Sized {
  /// Canonical scheme prefix, e.g. `hdfs://`.
  const FS_PREFIX: &'static str;

  fn from_options(options: &StoreOptions) -> Result<Self>;

  fn filesystem_prefix() -> &'static str {
    Self::FS_PREFIX
  }
}

/// State shared by every backend: location, scratch root, connector and the
/// lazily opened store-level handle.
#[derive(Debug)]
pub struct StoreBase {
  location: StoreLocation,
  temp_dir: Option<PathBuf>,
  connector: Connector,
  filesystem: Mutex<Option<Arc<dyn RemoteFilesystem>>>,
}

impl StoreBase {
  pub fn new(location: StoreLocation, temp_dir: Option<PathBuf>, connector: Connector) -> Self {
    Self {
      location,
      temp_dir,
      connector,
      filesystem: Mutex::new(None),
    }
  }

  pub fn location(&self) -> &StoreLocation {
    &self.location
  }

  pub fn temp_dir(&self) -> Option<&Path> {
    self.temp_dir.as_deref()
  }

  pub fn connector(&self) -> Connector {
    self.connector.clone()
  }

  pub fn get_filesystem(&self) -> Result<Arc<dyn RemoteFilesystem>> {
    let mut cached = self.filesystem.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(fs) = cached.as_ref() {
      return Ok(Arc::clone(fs));
    }

    let fs: Arc<dyn RemoteFilesystem> = Arc::from(self.connector.connect()?);
    debug!(endpoint = %self.connector.describe(), "opened store connection");
    *cached = Some(Arc::clone(&fs));
    Ok(fs)
  }
}

/// Registered backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
  Local,
  Hdfs,
}

impl StoreKind {
  pub const ALL: [StoreKind; 2] = [StoreKind::Local, StoreKind::Hdfs];

  pub fn prefix(self) -> &'static str {
    match self {
      StoreKind::Local => LocalFilesystemStore::filesystem_prefix(),
      StoreKind::Hdfs => HdfsStore::filesystem_prefix(),
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      StoreKind::Local => "local",
      StoreKind::Hdfs => "hdfs",
    }
  }

  /// Pick the backend for a location; bare paths go to the local backend.
  pub fn for_location(url: &str) -> Result<StoreKind> {
    let parsed = parse_url(url)?;
    match parsed.prefix {
      None => Ok(StoreKind::Local),
      Some(prefix) => StoreKind::ALL
        .into_iter()
        .find(|kind| kind.prefix() == prefix)
        .ok_or_else(|| StoreError::invalid_location(url, format!("no store backend for scheme {}", prefix))),
    }
  }
}

impl std::fmt::Display for StoreKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Any registered backend.
#[derive(Debug)]
pub enum Store {
  Local(LocalFilesystemStore),
  Hdfs(HdfsStore),
}

impl Store {
  /// Build the backend selected by `options.prefix_path`.
  pub fn open(options: &StoreOptions) -> Result<Self> {
    let store = match StoreKind::for_location(&options.prefix_path)? {
      StoreKind::Local => Store::Local(LocalFilesystemStore::from_options(options)?),
      StoreKind::Hdfs => Store::Hdfs(HdfsStore::from_options(options)?),
    };
    debug!(kind = %store.kind(), prefix_path = %options.prefix_path, "opened store");
    Ok(store)
  }

  pub fn kind(&self) -> StoreKind {
    match self {
      Store::Local(_) => StoreKind::Local,
      Store::Hdfs(_) => StoreKind::Hdfs,
    }
  }

  fn backend(&self) -> &dyn FilesystemStore {
    match self {
      Store::Local(store) => store,
      Store::Hdfs(store) => store,
    }
  }
}

impl FilesystemStore for Store {
  fn location(&self) -> &StoreLocation {
    self.backend().location()
  }

  fn temp_dir(&self) -> Option<&Path> {
    self.backend().temp_dir()
  }

  fn connector(&self) -> Connector {
    self.backend().connector()
  }

  fn get_filesystem(&self) -> Result<Arc<dyn RemoteFilesystem>> {
    self.backend().get_filesystem()
  }
}
