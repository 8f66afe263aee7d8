//! Terminal output for the `runstore` commands.
//!
//! Status lines carry a colored symbol; reports can be printed as JSON instead.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KB", "MB", "GB"];

  if bytes < 1024 {
    return format!("{} B", bytes);
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", value, UNITS[unit])
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    format!("{}m {}s", secs / 60, secs % 60)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!("{} {}", symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()), message);
}

pub fn print_info(message: &str) {
  println!("{} {}", symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()), message);
}

/// Problems go to stderr so `--output json` stays parseable.
pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// One uploaded file, by its store path.
pub fn print_upload(remote: &str) {
  println!(
    "  {} {}",
    symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.cyan()),
    remote
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
