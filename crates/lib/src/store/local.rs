//! Local-disk store.
//!
//! Accepts `file:///abs/path` or a bare path. Relative bare paths are made
//! absolute against the current directory before parsing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{FilesystemStore, StoreBackend, StoreBase, StoreOptions};
use crate::consts::FILE_PREFIX;
use crate::error::{Result, StoreError};
use crate::location::StoreLocation;
use crate::remote::{Connector, LocalFilesystem, RemoteFilesystem};

#[derive(Debug)]
pub struct LocalFilesystemStore {
  base: StoreBase,
}

impl LocalFilesystemStore {
  pub fn new(prefix_path: &str) -> Result<Self> {
    Self::from_options(&StoreOptions::new(prefix_path))
  }
}

impl StoreBackend for LocalFilesystemStore {
  const FS_PREFIX: &'static str = FILE_PREFIX;

  fn from_options(options: &StoreOptions) -> Result<Self> {
    let url = absolutize(&options.prefix_path)?;
    let location = StoreLocation::resolve(&url, Self::FS_PREFIX)?;

    if location.host().is_some() || location.port().is_some() {
      return Err(StoreError::invalid_location(
        &url,
        "local stores take no host or port, use file:///<path>",
      ));
    }

    let connector = Connector::new(Self::FS_PREFIX, || {
      Ok(Box::new(LocalFilesystem::new("/")) as Box<dyn RemoteFilesystem>)
    });

    Ok(Self {
      base: StoreBase::new(location, options.temp_dir.clone(), connector),
    })
  }
}

impl FilesystemStore for LocalFilesystemStore {
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

fn absolutize(url: &str) -> Result<String> {
  if url.contains("://") || url.is_empty() || Path::new(url).is_absolute() {
    return Ok(url.to_string());
  }
  let absolute: PathBuf = std::path::absolute(url)?;
  Ok(absolute.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(windows)]
  #[test]
  fn accepts_drive_letter_path() {
    let store = LocalFilesystemStore::new(r"C:\data\runs").unwrap();
    assert_eq!(store.location().host(), None);
    assert_eq!(store.location().path(), r"C:\data\runs");
    assert_eq!(store.get_run_path("r1").unwrap(), r"C:\data\runs/r1");
  }

  #[test]
  fn accepts_file_url_and_bare_path() {
    let store = LocalFilesystemStore::new("file:///data/runs").unwrap();
    assert_eq!(store.location().path(), "/data/runs");
    assert_eq!(store.path_prefix(), "file://");
    assert_eq!(store.get_full_path("/data/runs/r1"), "file:///data/runs/r1");

    let bare = LocalFilesystemStore::new("/data/runs").unwrap();
    assert_eq!(bare.location().path(), "/data/runs");
    assert_eq!(bare.path_prefix(), "file://");
  }

  #[test]
  fn relative_path_is_made_absolute() {
    let store = LocalFilesystemStore::new("runs/out").unwrap();
    let cwd = std::env::current_dir().unwrap();
    assert_eq!(
      store.location().path(),
      cwd.join("runs").join("out").to_string_lossy()
    );
  }

  #[test]
  fn rejects_foreign_scheme() {
    let err = LocalFilesystemStore::new("hdfs:///data").unwrap_err();
    assert!(matches!(err, StoreError::InvalidLocation { .. }));
  }

  #[test]
  fn rejects_authority() {
    let err = LocalFilesystemStore::new("file://host:22/data").unwrap_err();
    assert!(matches!(err, StoreError::InvalidLocation { .. }));
  }

  #[test]
  fn declares_prefix() {
    assert_eq!(LocalFilesystemStore::filesystem_prefix(), "file://");
  }
}
