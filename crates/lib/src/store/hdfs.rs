//! HDFS store.
//!
//! Built from a `prefix_path` in one of these forms:
//!
//! 1. `hdfs://namenode01:8020/user/test/runs`
//! 2. `hdfs:///user/test/runs`
//! 3. `/user/test/runs`
//!
//! Engine-facing URLs keep whatever prefix the location had (`hdfs://` when
//! none was given). Host and port for the connection come from the explicit
//! options first, then from the URL, and fall back to `default` and `0`.
//! Nothing connects until a handle is first needed.

use std::path::Path;
use std::sync::Arc;

use super::{FilesystemStore, StoreBackend, StoreBase, StoreOptions};
use crate::consts::HDFS_PREFIX;
use crate::error::Result;
use crate::location::StoreLocation;
use crate::remote::{ConnectParams, Connector, HdfsFilesystem, RemoteFilesystem};

#[derive(Debug)]
pub struct HdfsStore {
  base: StoreBase,
  params: ConnectParams,
}

impl HdfsStore {
  pub fn new(prefix_path: &str) -> Result<Self> {
    Self::from_options(&StoreOptions::new(prefix_path))
  }

  /// Connection parameters after merging options over the URL.
  pub fn connect_params(&self) -> &ConnectParams {
    &self.params
  }

  /// The WebHDFS endpoint connections go to.
  pub fn endpoint(&self) -> String {
    HdfsFilesystem::endpoint(&self.params)
  }
}

impl StoreBackend for HdfsStore {
  const FS_PREFIX: &'static str = HDFS_PREFIX;

  fn from_options(options: &StoreOptions) -> Result<Self> {
    let location = StoreLocation::resolve(&options.prefix_path, Self::FS_PREFIX)?;

    let params = ConnectParams {
      host: location.resolve_host(options.host.as_deref()),
      port: location.resolve_port(options.port),
      user: options.user.clone(),
      kerb_ticket: options.kerb_ticket.clone(),
      extra_conf: options.extra_conf.clone(),
    };

    let connect_params = params.clone();
    let connector = Connector::new(HdfsFilesystem::endpoint(&params), move || {
      Ok(Box::new(HdfsFilesystem::connect(&connect_params)?) as Box<dyn RemoteFilesystem>)
    });

    Ok(Self {
      base: StoreBase::new(location, options.temp_dir.clone(), connector),
      params,
    })
  }
}

impl FilesystemStore for HdfsStore {
  fn location(&self) -> &StoreLocation {
    self.base.location()
  }

  fn temp_dir(&self) -> Option<&Path> {
    self.base.temp_dir()
  }

  fn connector(&self) -> Connector {
    self.base.connector()
  }

  fn get_filesystem(&self) -> Result<Arc<dyn RemoteFilesystem>> {
    self.base.get_filesystem()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::StoreError;

  #[test]
  fn full_url_feeds_connection() {
    let store = HdfsStore::new("hdfs://namenode01:8020/user/test/runs").unwrap();
    assert_eq!(store.location().path(), "/user/test/runs");
    assert_eq!(store.path_prefix(), "hdfs://namenode01:8020");
    assert_eq!(store.connect_params().host, "namenode01");
    assert_eq!(store.connect_params().port, 8020);
  }

  #[test]
  fn bare_path_defaults_host_and_port() {
    let store = HdfsStore::new("/user/test/runs").unwrap();
    assert_eq!(store.path_prefix(), "hdfs://");
    assert_eq!(store.connect_params().host, "default");
    assert_eq!(store.connect_params().port, 0);
    assert_eq!(store.endpoint(), "http://localhost:9870");
  }

  #[test]
  fn explicit_options_win_over_url() {
    let options = StoreOptions::new("hdfs://nn:8020/user/test/runs")
      .with_host("nn-standby")
      .with_port(9871)
      .with_user("alice")
      .with_kerb_ticket("token")
      .with_extra_conf("dfs.replication", "2");
    let store = HdfsStore::from_options(&options).unwrap();

    let params = store.connect_params();
    assert_eq!(params.host, "nn-standby");
    assert_eq!(params.port, 9871);
    assert_eq!(params.user.as_deref(), Some("alice"));
    assert_eq!(params.kerb_ticket.as_deref(), Some("token"));
    assert_eq!(params.extra_conf.get("dfs.replication").unwrap(), "2");
    // Engine-facing URLs still use the location as written.
    assert_eq!(store.path_prefix(), "hdfs://nn:8020");
  }

  #[test]
  fn mismatched_namespace_is_rejected() {
    let err = HdfsStore::new("s3://bucket/key").unwrap_err();
    assert!(matches!(err, StoreError::InvalidLocation { .. }));
  }

  #[test]
  fn construction_is_lazy_and_connect_errors_surface() {
    let options = StoreOptions::new("hdfs://127.0.0.1:1/runs").with_extra_conf("dfs.webhdfs.timeout.secs", "2");
    let store = HdfsStore::from_options(&options).unwrap();

    let err = store.get_filesystem().unwrap_err();
    assert!(matches!(err, StoreError::BackendUnavailable { .. }));
  }

  #[test]
  fn declares_prefix() {
    assert_eq!(HdfsStore::filesystem_prefix(), "hdfs://");
  }
}
