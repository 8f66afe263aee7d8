use anyhow::{Context, Result};
use serde::Serialize;

use runstore_lib::{check_url, parse_url};

use crate::output::{OutputFormat, print_json, print_stat, print_success};

#[derive(Debug, Serialize)]
struct ParseOutput<'a> {
  url: &'a str,
  prefix: Option<String>,
  host: Option<String>,
  port: Option<u16>,
  path: Option<String>,
  path_offset: usize,
  before_path: &'a str,
}

pub fn cmd_parse(url: &str, expect: Option<&str>, format: OutputFormat) -> Result<i32> {
  let parsed = parse_url(url).with_context(|| format!("Failed to parse {}", url))?;
  if let Some(expected) = expect {
    check_url(url, parsed.prefix.as_deref(), parsed.path.as_deref(), expected)?;
  }

  let out = ParseOutput {
    url,
    before_path: &url[..parsed.path_offset],
    path_offset: parsed.path_offset,
    prefix: parsed.prefix,
    host: parsed.host,
    port: parsed.port,
    path: parsed.path,
  };

  if format.is_json() {
    print_json(&out)?;
    return Ok(0);
  }

  let none = || "-".to_string();
  match expect {
    Some(expected) => print_success(&format!("{} is a valid {} location", url, expected)),
    None => print_success(&format!("Parsed {}", url)),
  }
  print_stat("prefix", &out.prefix.clone().unwrap_or_else(none));
  print_stat("host", &out.host.clone().unwrap_or_else(none));
  print_stat("port", &out.port.map(|p| p.to_string()).unwrap_or_else(none));
  print_stat("path", &out.path.clone().unwrap_or_else(none));
  print_stat("before path", out.before_path);
  Ok(0)
}
