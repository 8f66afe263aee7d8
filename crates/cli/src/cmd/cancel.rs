//! Ctrl-C / SIGTERM handling for the long-running commands.
//!
//! The default signal disposition kills the process on the spot, which skips
//! the scratch directory's cleanup. Commands that own a run install this flag
//! instead and wind down through their normal return path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::warn;

/// Exit code reported after an interrupted run, as a shell would for SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

const SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
  /// Route SIGINT and SIGTERM into a new flag. Call at most once per process.
  pub fn install() -> Result<Self> {
    let flag = Self::default();
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || {
      warn!("signal received, stopping");
      handler_flag.cancel();
    })
    .context("Failed to install signal handler")?;
    Ok(flag)
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }

  /// Sleep for `duration` or until cancelled. Returns whether it was cancelled.
  pub fn sleep(&self, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
      if self.is_cancelled() {
        return true;
      }
      let now = Instant::now();
      if now >= deadline {
        return false;
      }
      thread::sleep(SLICE.min(deadline - now));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sleep_runs_full_duration_when_not_cancelled() {
    let flag = CancelFlag::default();
    let start = Instant::now();
    assert!(!flag.sleep(Duration::from_millis(150)));
    assert!(start.elapsed() >= Duration::from_millis(150));
  }

  #[test]
  fn sleep_returns_early_once_cancelled() {
    let flag = CancelFlag::default();
    let remote = flag.clone();
    let canceller = thread::spawn(move || {
      thread::sleep(Duration::from_millis(50));
      remote.cancel();
    });

    let start = Instant::now();
    assert!(flag.sleep(Duration::from_secs(30)));
    assert!(start.elapsed() < Duration::from_secs(5));
    canceller.join().unwrap();
  }
}
