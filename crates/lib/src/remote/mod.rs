//! Remote filesystem handles.
//!
//! A store never talks to its backend directly; it goes through a
//! [`RemoteFilesystem`] produced by a [`Connector`]. Connectors capture the
//! connection parameters once and can be called any number of times, each call
//! yielding an independent handle.
//!
//! Remote paths are POSIX strings rooted at `/`, whatever the local OS.

pub mod hdfs;
pub mod local;

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use hdfs::HdfsFilesystem;
pub use local::LocalFilesystem;

/// Primitives a backend has to offer for the store and the sync engine.
pub trait RemoteFilesystem: fmt::Debug + Send + Sync {
  /// Whether a file or directory exists at `path`.
  fn exists(&self, path: &str) -> Result<bool>;

  /// Create `path` and any missing parents.
  fn mkdirs(&self, path: &str) -> Result<()>;

  /// Write everything from `reader` to `path`, replacing any existing file.
  fn upload(&self, path: &str, reader: &mut dyn Read) -> Result<()>;

  /// Read a whole file.
  fn read(&self, path: &str) -> Result<Vec<u8>>;

  fn delete(&self, path: &str, recursive: bool) -> Result<()>;
}

/// Connection parameters captured at store construction.
///
/// Explicit constructor arguments have already been merged over values parsed
/// from the location URL by the time these are built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectParams {
  pub host: String,
  pub port: u16,
  pub user: Option<String>,
  pub kerb_ticket: Option<String>,
  #[serde(default)]
  pub extra_conf: BTreeMap<String, String>,
}

type ConnectFn = dyn Fn() -> Result<Box<dyn RemoteFilesystem>> + Send + Sync;

/// Pure factory for remote handles.
///
/// Cheap to clone; every [`connect`](Connector::connect) opens a new handle.
/// Callers that want one handle per session cache it themselves.
#[derive(Clone)]
pub struct Connector {
  describe: String,
  connect: Arc<ConnectFn>,
}

impl Connector {
  pub fn new<F>(describe: impl Into<String>, connect: F) -> Self
  where
    F: Fn() -> Result<Box<dyn RemoteFilesystem>> + Send + Sync + 'static,
  {
    Self {
      describe: describe.into(),
      connect: Arc::new(connect),
    }
  }

  pub fn connect(&self) -> Result<Box<dyn RemoteFilesystem>> {
    (self.connect)()
  }

  /// Human-readable endpoint, for logs.
  pub fn describe(&self) -> &str {
    &self.describe
  }
}

impl fmt::Debug for Connector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Connector").field("describe", &self.describe).finish()
  }
}

/// Join a relative path onto a remote directory with `/` separators.
///
/// Empty components are dropped so that joining `""` returns `base` unchanged.
pub fn join(base: &str, relative: &str) -> String {
  let mut out = base.trim_end_matches('/').to_string();
  for part in relative.split(['/', '\\']).filter(|p| !p.is_empty()) {
    out.push('/');
    out.push_str(part);
  }
  if out.is_empty() {
    out.push('/');
  }
  out
}
