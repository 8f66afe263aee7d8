use std::fs;
use std::time::{Duration, SystemTime};

use runstore_lib::{FilesystemStore, LocalFilesystemStore, StoreBackend, StoreError, StoreOptions, SyncSession};

use super::common::{FlakyDisk, TestEnv, set_mtime, write_file};

fn open_store(env: &TestEnv) -> LocalFilesystemStore {
  let options = StoreOptions::new(env.store_root().to_string_lossy()).with_temp_dir(env.scratch_root());
  LocalFilesystemStore::from_options(&options).unwrap()
}

#[test]
fn run_mirrors_scratch_into_store() {
  let env = TestEnv::new();
  let store = open_store(&env);
  let mut session = store.sync_fn("run42").unwrap();

  let scratch_path = store
    .get_local_output_dir_fn("run42")
    .scoped(|scratch| {
      write_file(scratch, "checkpoint/epoch-1.ckpt", b"weights-1");
      write_file(scratch, "logs/train.log", b"epoch 1 loss 0.9\n");
      session.sync(scratch)?;

      write_file(scratch, "checkpoint/epoch-2.ckpt", b"weights-2");
      let report = session.sync(scratch)?;
      assert_eq!(report.uploaded.len(), 1);
      assert_eq!(report.skipped, 2);
      Ok::<_, StoreError>(scratch.to_path_buf())
    })
    .unwrap();

  assert!(!scratch_path.exists());

  let run = env.store_root().join("run42");
  assert_eq!(fs::read(run.join("checkpoint").join("epoch-1.ckpt")).unwrap(), b"weights-1");
  assert_eq!(fs::read(run.join("checkpoint").join("epoch-2.ckpt")).unwrap(), b"weights-2");
  assert_eq!(fs::read(run.join("logs").join("train.log")).unwrap(), b"epoch 1 loss 0.9\n");

  assert!(store.exists(&store.get_checkpoint_path("run42").unwrap()).unwrap());
  assert!(store.exists(&store.get_logs_path("run42").unwrap()).unwrap());
}

#[test]
fn nested_file_lands_under_run_subtree() {
  let env = TestEnv::new();
  let store = open_store(&env);

  let scratch = store.get_local_output_dir_fn("run42").acquire().unwrap();
  write_file(scratch.path(), "sub/dir/file.txt", b"x");

  let report = store.sync_fn("run42").unwrap().sync(scratch.path()).unwrap();
  let expected = format!("{}/run42/sub/dir/file.txt", env.store_root().to_string_lossy());
  assert_eq!(report.uploaded, vec![expected]);
  assert!(env.store_root().join("run42/sub/dir/file.txt").is_file());
}

#[test]
fn rewritten_checkpoint_is_uploaded_again() {
  let env = TestEnv::new();
  let store = open_store(&env);
  let scratch = store.get_local_output_dir_fn("run1").acquire().unwrap();
  let mut session = store.sync_fn("run1").unwrap();

  let ckpt = write_file(scratch.path(), "model.ckpt", b"v1");
  write_file(scratch.path(), "config.json", b"{}");
  assert_eq!(session.sync(scratch.path()).unwrap().uploaded.len(), 2);

  fs::write(&ckpt, b"v2").unwrap();
  set_mtime(&ckpt, SystemTime::now() + Duration::from_secs(10));

  let report = session.sync(scratch.path()).unwrap();
  assert_eq!(report.uploaded.len(), 1);
  assert!(report.uploaded[0].ends_with("/run1/model.ckpt"));
  assert_eq!(fs::read(env.store_root().join("run1").join("model.ckpt")).unwrap(), b"v2");
}

#[test]
fn retry_after_partial_failure_uploads_only_the_failed_file() {
  let env = TestEnv::new();
  let disk = FlakyDisk::new(env.store_root());
  let scratch = env.temp.path().join("work");
  write_file(&scratch, "f1.bin", b"one");
  write_file(&scratch, "f2.bin", b"two");

  disk.fail_on("/runs/r1/f2.bin");
  let mut session = SyncSession::new("r1", "/runs/r1", disk.connector());

  let err = session.sync(&scratch).unwrap_err();
  assert!(matches!(err, StoreError::Upload { .. }));
  assert!(err.is_retryable());

  disk.heal();
  let report = session.sync(&scratch).unwrap();
  assert_eq!(report.uploaded, vec!["/runs/r1/f2.bin"]);

  assert_eq!(disk.upload_count("/runs/r1/f1.bin"), 1);
  assert_eq!(disk.upload_count("/runs/r1/f2.bin"), 1);
}

#[test]
fn scratch_is_removed_when_the_run_fails() {
  let env = TestEnv::new();
  let store = open_store(&env);
  let mut seen = None;

  let result: Result<(), StoreError> = store.get_local_output_dir_fn("run7").scoped(|scratch| {
    seen = Some(scratch.to_path_buf());
    write_file(scratch, "partial.ckpt", b"...");
    Err(StoreError::Remote {
      path: "/runs/run7".to_string(),
      message: "trainer crashed".to_string(),
    })
  });

  assert!(result.is_err());
  let seen = seen.unwrap();
  assert!(seen.starts_with(env.scratch_root()));
  assert!(!seen.exists());
}

#[test]
fn new_session_reuploads_everything() {
  let env = TestEnv::new();
  let disk = FlakyDisk::new(env.store_root());
  let scratch = env.temp.path().join("work");
  write_file(&scratch, "a.txt", b"a");

  SyncSession::new("r1", "/runs/r1", disk.connector()).sync(&scratch).unwrap();
  SyncSession::new("r1", "/runs/r1", disk.connector()).sync(&scratch).unwrap();

  assert_eq!(disk.upload_count("/runs/r1/a.txt"), 2);
}
