use anyhow::Result;
use serde::Serialize;

use runstore_lib::{FilesystemStore, StoreKind};

use crate::StoreArgs;
use crate::cmd::open_store;
use crate::output::{OutputFormat, print_info, print_json, print_stat};

#[derive(Debug, Serialize)]
struct InfoOutput {
  kind: StoreKind,
  prefix_path: String,
  path_prefix: String,
  path: String,
  endpoint: String,
  temp_dir: Option<String>,
  run: RunLayout,
}

#[derive(Debug, Serialize)]
struct RunLayout {
  run_id: String,
  run_path: String,
  checkpoint_path: String,
  logs_path: String,
  run_url: String,
}

/// Describe the store without connecting to it.
pub fn cmd_info(args: &StoreArgs, run_id: &str, format: OutputFormat) -> Result<i32> {
  let store = open_store(args)?;

  let run_path = store.get_run_path(run_id)?;
  let out = InfoOutput {
    kind: store.kind(),
    prefix_path: store.prefix_path().to_string(),
    path_prefix: store.path_prefix().to_string(),
    path: store.location().path().to_string(),
    endpoint: store.connector().describe().to_string(),
    temp_dir: store.temp_dir().map(|p| p.display().to_string()),
    run: RunLayout {
      run_id: run_id.to_string(),
      checkpoint_path: store.get_checkpoint_path(run_id)?,
      logs_path: store.get_logs_path(run_id)?,
      run_url: store.get_full_path(&run_path),
      run_path,
    },
  };

  if format.is_json() {
    print_json(&out)?;
    return Ok(0);
  }

  print_info(&format!("{} store at {}", out.kind, out.prefix_path));
  print_stat("url prefix", &out.path_prefix);
  print_stat("path", &out.path);
  print_stat("endpoint", &out.endpoint);
  print_stat(
    "scratch root",
    out.temp_dir.as_deref().unwrap_or("(system temp directory)"),
  );
  println!();
  print_info(&format!("Run {}", out.run.run_id));
  print_stat("run", &out.run.run_path);
  print_stat("checkpoints", &out.run.checkpoint_path);
  print_stat("logs", &out.run.logs_path);
  print_stat("url", &out.run.run_url);
  Ok(0)
}
