//! Error types for runstore-lib.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by stores, remote filesystems and sync sessions.
///
/// Nothing in this crate retries or swallows these; they are handed to the
/// caller as-is.
#[derive(Debug, Error)]
pub enum StoreError {
  /// Malformed location string, scheme mismatch or empty path. Raised while
  /// constructing a store and never worth retrying.
  #[error("Invalid store location '{url}': {reason}")]
  InvalidLocation { url: String, reason: String },

  /// A run id that would not stay inside its own subtree of the store.
  #[error("Invalid run id '{run_id}': {reason}")]
  InvalidRunId { run_id: String, reason: String },

  /// The remote filesystem could not be reached or refused our credentials.
  #[error("Backend unavailable at {endpoint}: {message}")]
  BackendUnavailable { endpoint: String, message: String },

  /// A single file transfer failed during sync.
  #[error("Failed to upload {} to {remote}: {source}", local.display())]
  Upload {
    local: PathBuf,
    remote: String,
    #[source]
    source: Box<StoreError>,
  },

  /// A remote operation other than the connection check failed.
  #[error("Remote operation on '{path}' failed: {message}")]
  Remote { path: String, message: String },

  #[error("Failed to manage scratch directory: {0}")]
  Scratch(#[source] io::Error),

  #[error("Failed to walk {}: {message}", path.display())]
  Walk { path: PathBuf, message: String },

  #[error("Failed to load configuration from {}: {message}", path.display())]
  Config { path: PathBuf, message: String },

  #[error("IO error: {0}")]
  Io(#[from] io::Error),
}

impl StoreError {
  pub(crate) fn invalid_location(url: &str, reason: impl Into<String>) -> Self {
    StoreError::InvalidLocation {
      url: url.to_string(),
      reason: reason.into(),
    }
  }

  pub(crate) fn remote(path: &str, message: impl ToString) -> Self {
    StoreError::Remote {
      path: path.to_string(),
      message: message.to_string(),
    }
  }

  /// Whether retrying the same call later could succeed.
  pub fn is_retryable(&self) -> bool {
    !matches!(
      self,
      StoreError::InvalidLocation { .. } | StoreError::InvalidRunId { .. } | StoreError::Config { .. }
    )
  }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
