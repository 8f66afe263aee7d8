//! runstore-lib: artifact stores for training runs
//!
//! A run writes its artifacts into a local scratch directory and periodically
//! mirrors that directory into a durable store:
//! - `location`: parsing and validation of store location strings
//! - `scratch`: scratch directories removed when their run is done
//! - `remote`: handles onto the durable backend (local disk, WebHDFS)
//! - `sync`: incremental, retry-safe upload of a scratch directory
//! - `store`: the store contract, its backends and the backend registry

pub mod consts;
pub mod error;
pub mod location;
pub mod remote;
pub mod scratch;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Result, StoreError};
pub use location::{ParsedUrl, StoreLocation, check_url, parse_url};
pub use scratch::{LocalOutputDir, ScratchDir};
pub use store::{
  FilesystemStore, HdfsStore, LocalFilesystemStore, Store, StoreBackend, StoreKind, StoreOptions, check_run_id,
};
pub use sync::{SyncReport, SyncSession, UploadLedger};
