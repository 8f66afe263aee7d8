use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::warn;

use runstore_lib::{FilesystemStore, SyncReport};

use crate::StoreArgs;
use crate::cmd::cancel::{CancelFlag, INTERRUPTED_EXIT_CODE};
use crate::cmd::open_store;
use crate::output::{
  OutputFormat, format_bytes, format_duration, print_info, print_json, print_success, print_upload, print_warning,
};

/// Sync `local` into the run once, or on every `watch` interval until interrupted.
pub fn cmd_sync(
  args: &StoreArgs,
  run_id: &str,
  local: &Path,
  watch: Option<Duration>,
  format: OutputFormat,
) -> Result<i32> {
  let local = dunce::canonicalize(local).with_context(|| format!("Failed to resolve {}", local.display()))?;
  if !local.is_dir() {
    bail!("{} is not a directory", local.display());
  }
  let local = local.as_path();

  let store = open_store(args)?;
  let mut session = store.sync_fn(run_id)?;

  let Some(interval) = watch else {
    let start = Instant::now();
    let report = session
      .sync(local)
      .with_context(|| format!("Failed to sync {} to {}", local.display(), session.remote_root()))?;
    print_report(&report, start.elapsed(), format)?;
    return Ok(0);
  };

  let cancel = CancelFlag::install()?;
  print_info(&format!(
    "Watching {} every {}",
    local.display(),
    humantime::format_duration(interval)
  ));
  loop {
    let start = Instant::now();
    match session.sync(local) {
      Ok(report) => print_report(&report, start.elapsed(), format)?,
      Err(e) if !e.is_retryable() => return Err(e).context("Sync failed"),
      Err(e) => {
        warn!(run_id, error = %e, "periodic sync failed, retrying next interval");
        print_warning(&format!("Sync failed: {}", e));
      }
    }
    if cancel.sleep(interval) {
      print_info("Stopped watching");
      return Ok(INTERRUPTED_EXIT_CODE);
    }
  }
}

pub fn print_report(report: &SyncReport, elapsed: Duration, format: OutputFormat) -> Result<()> {
  if format.is_json() {
    return print_json(report);
  }

  if report.is_noop() {
    print_info(&format!("Nothing to upload ({} unchanged)", report.skipped));
    return Ok(());
  }

  print_success(&format!(
    "Uploaded {} file(s), {} in {} ({} unchanged)",
    report.uploaded.len(),
    format_bytes(report.bytes),
    format_duration(elapsed),
    report.skipped
  ));
  for remote in &report.uploaded {
    print_upload(remote);
  }
  Ok(())
}
