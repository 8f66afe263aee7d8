//! Store construction options.
//!
//! Options come from three layers, later ones winning: a JSON file, the
//! `RUNSTORE_*` environment variables, and whatever the caller sets explicitly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

pub const ENV_PREFIX_PATH: &str = "RUNSTORE_PREFIX_PATH";
pub const ENV_HDFS_USER: &str = "RUNSTORE_HDFS_USER";
pub const ENV_KERB_TICKET: &str = "RUNSTORE_KERB_TICKET";
pub const ENV_TEMP_DIR: &str = "RUNSTORE_TEMP_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreOptions {
  /// Location string, `[<scheme>://][<host>[:<port>]]<path>`.
  pub prefix_path: String,
  #[serde(default)]
  pub host: Option<String>,
  #[serde(default)]
  pub port: Option<u16>,
  #[serde(default)]
  pub user: Option<String>,
  /// Credential for authenticated backends.
  #[serde(default)]
  pub kerb_ticket: Option<String>,
  /// Backend-specific overrides.
  #[serde(default)]
  pub extra_conf: BTreeMap<String, String>,
  /// Parent of scratch directories; the system temp root when unset.
  #[serde(default)]
  pub temp_dir: Option<PathBuf>,
}

impl StoreOptions {
  pub fn new(prefix_path: impl Into<String>) -> Self {
    Self {
      prefix_path: prefix_path.into(),
      ..Default::default()
    }
  }

  /// Load options from a JSON file.
  pub fn from_file(path: &Path) -> Result<Self> {
    let config_err = |message: String| StoreError::Config {
      path: path.to_path_buf(),
      message,
    };
    let content = fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| config_err(e.to_string()))
  }

  /// Override fields from `RUNSTORE_*` environment variables that are set.
  pub fn apply_env(mut self) -> Self {
    if let Ok(prefix_path) = std::env::var(ENV_PREFIX_PATH) {
      self.prefix_path = prefix_path;
    }
    if let Ok(user) = std::env::var(ENV_HDFS_USER) {
      self.user = Some(user);
    }
    if let Ok(ticket) = std::env::var(ENV_KERB_TICKET) {
      self.kerb_ticket = Some(ticket);
    }
    if let Ok(temp_dir) = std::env::var(ENV_TEMP_DIR) {
      self.temp_dir = Some(PathBuf::from(temp_dir));
    }
    self
  }

  pub fn with_host(mut self, host: impl Into<String>) -> Self {
    self.host = Some(host.into());
    self
  }

  pub fn with_port(mut self, port: u16) -> Self {
    self.port = Some(port);
    self
  }

  pub fn with_user(mut self, user: impl Into<String>) -> Self {
    self.user = Some(user.into());
    self
  }

  pub fn with_kerb_ticket(mut self, ticket: impl Into<String>) -> Self {
    self.kerb_ticket = Some(ticket.into());
    self
  }

  pub fn with_extra_conf(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.extra_conf.insert(key.into(), value.into());
    self
  }

  pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
    self.temp_dir = Some(temp_dir.into());
    self
  }
}
