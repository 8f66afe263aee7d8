//! Scratch-directory fixtures shared by the unit tests (`util::testutil`) and
//! the library integration tests. Std only, so both crates can compile it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Write `content` to `root/relative`, creating parents.
pub fn write_file(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}

pub fn set_mtime(path: &Path, time: SystemTime) {
  File::options().write(true).open(path).unwrap().set_modified(time).unwrap();
}
