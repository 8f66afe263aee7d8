mod cmd;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::{OutputFormat, print_error};

/// runstore - stage training-run artifacts locally and mirror them into a durable store
#[derive(Parser)]
#[command(name = "runstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Where the store lives and how to reach it.
///
/// Precedence: flags, then RUNSTORE_* environment variables, then --config.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
  /// Store location, e.g. hdfs://namenode01:8020/user/test/runs or /data/runs
  pub location: Option<String>,

  /// JSON file with store options
  #[arg(long)]
  pub config: Option<PathBuf>,

  /// Namenode host (overrides the location)
  #[arg(long)]
  pub host: Option<String>,

  /// Namenode port (overrides the location)
  #[arg(long)]
  pub port: Option<u16>,

  /// User to act as on the backend
  #[arg(long)]
  pub user: Option<String>,

  /// Credential for authenticated backends
  #[arg(long)]
  pub kerb_ticket: Option<String>,

  /// Backend option as KEY=VALUE (repeatable)
  #[arg(long = "conf", value_parser = cmd::parse_key_value)]
  pub extra_conf: Vec<(String, String)>,

  /// Parent directory for scratch directories
  #[arg(long)]
  pub temp_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
  /// Show how a location string is parsed
  Parse {
    /// Location string to parse
    url: String,

    /// Validate against this scheme prefix (e.g. hdfs://)
    #[arg(long)]
    expect: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Show the resolved store and the layout of a run
  Info {
    #[command(flatten)]
    store: StoreArgs,

    /// Run id used to illustrate the layout
    #[arg(long, default_value = "<run_id>")]
    run_id: String,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Upload new and changed files from a local directory into a run
  Sync {
    #[command(flatten)]
    store: StoreArgs,

    /// Run the files belong to
    #[arg(long)]
    run_id: String,

    /// Local directory to mirror
    #[arg(long)]
    local: PathBuf,

    /// Keep syncing on an interval until interrupted
    #[arg(long)]
    watch: bool,

    /// Time between syncs with --watch (e.g. 30s, 5m)
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    interval: Duration,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Run a command with a scratch directory that is synced into a run
  Exec {
    #[command(flatten)]
    store: StoreArgs,

    /// Run the artifacts belong to
    #[arg(long)]
    run_id: String,

    /// Time between syncs while the command runs (e.g. 30s, 5m)
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Command and arguments to run
    #[arg(last = true, required = true)]
    command: Vec<String>,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Parse { url, expect, output } => cmd::cmd_parse(&url, expect.as_deref(), output),
    Commands::Info { store, run_id, output } => cmd::cmd_info(&store, &run_id, output),
    Commands::Sync {
      store,
      run_id,
      local,
      watch,
      interval,
      output,
    } => cmd::cmd_sync(&store, &run_id, &local, watch.then_some(interval), output),
    Commands::Exec {
      store,
      run_id,
      interval,
      command,
    } => cmd::cmd_exec(&store, &run_id, interval, &command),
  };

  match result {
    Ok(code) => std::process::exit(code),
    Err(e) => {
      print_error(&format!("{:#}", e));
      std::process::exit(1);
    }
  }
}
