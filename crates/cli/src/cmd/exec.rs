//! `runstore exec`: run a command against a scratch directory that is mirrored
//! into the store while the command runs and once more after it exits.
//!
//! SIGINT/SIGTERM do not kill `runstore` outright: the command is stopped, its
//! output gets a final sync and the scratch directory is removed.

use std::path::Path;
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use runstore_lib::consts::{OUTPUT_DIR_ENV, RUN_ID_ENV};
use runstore_lib::{FilesystemStore, SyncSession};

use crate::StoreArgs;
use crate::cmd::cancel::{CancelFlag, INTERRUPTED_EXIT_CODE};
use crate::cmd::open_store;
use crate::cmd::sync::print_report;
use crate::output::{OutputFormat, print_info, print_warning};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long an interrupted command gets to exit on its own before it is killed.
const CANCEL_GRACE: Duration = Duration::from_secs(3);

pub fn cmd_exec(args: &StoreArgs, run_id: &str, interval: Duration, command: &[String]) -> Result<i32> {
  let (program, program_args) = command.split_first().context("No command given")?;

  let store = open_store(args)?;
  let mut session = store.sync_fn(run_id)?;
  print_info(&format!("Run {} syncs to {}", run_id, store.get_full_path(session.remote_root())));

  let cancel = CancelFlag::install()?;
  let status = store
    .get_local_output_dir_fn(run_id)
    .scoped(|scratch| -> Result<ExitStatus> {
      info!(run_id, scratch = ?scratch, program = %program, "starting run");
      let mut child = Command::new(program)
        .args(program_args)
        .env(OUTPUT_DIR_ENV, scratch)
        .env(RUN_ID_ENV, run_id)
        .spawn()
        .with_context(|| format!("Failed to start {}", program))?;

      let status = supervise(&mut child, &mut session, scratch, interval, &cancel)?;
      debug!(run_id, %status, "run exited");

      let start = Instant::now();
      let report = session
        .sync(scratch)
        .with_context(|| format!("Final sync of run {} failed", run_id))?;
      print_report(&report, start.elapsed(), OutputFormat::Text)?;
      Ok(status)
    })?;

  if cancel.is_cancelled() {
    print_warning(&format!("Interrupted; {} stopped with {}", program, status));
    return Ok(INTERRUPTED_EXIT_CODE);
  }
  if !status.success() {
    print_warning(&format!("{} exited with {}", program, status));
  }
  Ok(exit_code(status))
}

/// Wait for `child`, syncing every `interval` meanwhile.
///
/// A failed periodic sync is logged and retried on the next tick. Once
/// `cancel` is set, periodic syncs stop and the child gets [`CANCEL_GRACE`] to
/// exit before it is killed.
fn supervise(
  child: &mut Child,
  session: &mut SyncSession,
  scratch: &Path,
  interval: Duration,
  cancel: &CancelFlag,
) -> Result<ExitStatus> {
  let mut next_sync = Instant::now() + interval;
  let mut kill_at: Option<Instant> = None;
  loop {
    let waited = match child.try_wait() {
      Ok(waited) => waited,
      Err(e) => {
        let _ = child.kill();
        return Err(e).context("Failed to wait for child process");
      }
    };
    if let Some(status) = waited {
      return Ok(status);
    }

    match kill_at {
      None if cancel.is_cancelled() => {
        warn!(run_id = session.run_id(), grace = ?CANCEL_GRACE, "interrupted, waiting for the command to exit");
        kill_at = Some(Instant::now() + CANCEL_GRACE);
      }
      Some(deadline) if Instant::now() >= deadline => {
        warn!(run_id = session.run_id(), "command still running, killing it");
        let _ = child.kill();
        return child.wait().context("Failed to wait for child process");
      }
      Some(_) => {}
      None => {
        if Instant::now() >= next_sync {
          match session.sync(scratch) {
            Ok(report) => debug!(uploaded = report.uploaded.len(), skipped = report.skipped, "periodic sync"),
            Err(e) => warn!(run_id = session.run_id(), error = %e, "periodic sync failed, retrying next interval"),
          }
          next_sync = Instant::now() + interval;
        }
      }
    }
    thread::sleep(POLL_INTERVAL.min(interval));
  }
}

fn exit_code(status: ExitStatus) -> i32 {
  if let Some(code) = status.code() {
    return code;
  }
  #[cfg(unix)]
  {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = status.signal() {
      return 128 + signal;
    }
  }
  1
}
