use runstore_lib::{FilesystemStore, Store, StoreError, StoreKind, StoreOptions, parse_url};

#[test]
fn parse_examples() {
  let full = parse_url("hdfs://nn:8020/a/b").unwrap();
  assert_eq!(full.prefix.as_deref(), Some("hdfs://"));
  assert_eq!(full.host.as_deref(), Some("nn"));
  assert_eq!(full.port, Some(8020));
  assert_eq!(full.path.as_deref(), Some("/a/b"));

  let no_host = parse_url("hdfs:///a/b").unwrap();
  assert_eq!(no_host.prefix.as_deref(), Some("hdfs://"));
  assert_eq!(no_host.host, None);
  assert_eq!(no_host.path.as_deref(), Some("/a/b"));

  let bare = parse_url("/a/b").unwrap();
  assert_eq!(bare.prefix, None);
  assert_eq!(bare.path.as_deref(), Some("/a/b"));
}

#[test]
fn open_picks_backend_by_scheme() {
  let hdfs = Store::open(&StoreOptions::new("hdfs://namenode01:8020/user/test/runs")).unwrap();
  assert_eq!(hdfs.kind(), StoreKind::Hdfs);
  assert_eq!(hdfs.prefix_path(), "hdfs://namenode01:8020/user/test/runs");

  let local = Store::open(&StoreOptions::new("/user/test/runs")).unwrap();
  assert_eq!(local.kind(), StoreKind::Local);
}

#[test]
fn open_rejects_unregistered_scheme() {
  let err = Store::open(&StoreOptions::new("s3://bucket/key")).unwrap_err();
  assert!(matches!(err, StoreError::InvalidLocation { .. }));
  assert!(!err.is_retryable());
}

#[test]
fn open_rejects_location_without_path() {
  let err = Store::open(&StoreOptions::new("hdfs://namenode01:8020")).unwrap_err();
  assert!(matches!(err, StoreError::InvalidLocation { .. }));
}

#[test]
fn hdfs_store_reports_unreachable_backend() {
  let options = StoreOptions::new("hdfs://127.0.0.1:1/runs").with_extra_conf("dfs.webhdfs.timeout.secs", "2");
  let store = Store::open(&options).unwrap();

  let err = store.exists("/runs").unwrap_err();
  assert!(matches!(err, StoreError::BackendUnavailable { .. }));
}
