mod cancel;
mod exec;
mod info;
mod parse;
mod sync;

pub use exec::cmd_exec;
pub use info::cmd_info;
pub use parse::cmd_parse;
pub use sync::cmd_sync;

use anyhow::{Context, Result, bail};

use runstore_lib::{Store, StoreOptions};

use crate::StoreArgs;

/// Layer config file, environment and flags into store options.
pub fn store_options(args: &StoreArgs) -> Result<StoreOptions> {
  let options = match &args.config {
    Some(path) => StoreOptions::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?,
    None => StoreOptions::default(),
  };
  let mut options = options.apply_env();

  if let Some(location) = &args.location {
    options.prefix_path = location.clone();
  }
  if let Some(host) = &args.host {
    options = options.with_host(host);
  }
  if let Some(port) = args.port {
    options = options.with_port(port);
  }
  if let Some(user) = &args.user {
    options = options.with_user(user);
  }
  if let Some(ticket) = &args.kerb_ticket {
    options = options.with_kerb_ticket(ticket);
  }
  for (key, value) in &args.extra_conf {
    options = options.with_extra_conf(key, value);
  }
  if let Some(temp_dir) = &args.temp_dir {
    options = options.with_temp_dir(temp_dir);
  }

  if options.prefix_path.is_empty() {
    bail!("No store location given; pass one, set RUNSTORE_PREFIX_PATH or use --config");
  }
  Ok(options)
}

pub fn open_store(args: &StoreArgs) -> Result<Store> {
  let options = store_options(args)?;
  Store::open(&options).with_context(|| format!("Failed to open store at {}", options.prefix_path))
}

/// `KEY=VALUE` for `--conf`.
pub fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
  match raw.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
  }
}
