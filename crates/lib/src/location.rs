//! Store location parsing.
//!
//! A store location has the shape `[<scheme>://][<host>[:<port>]]<path>`:
//!
//! ```text
//! hdfs://namenode01:8020/user/test/runs   scheme, host, port and path
//! hdfs:///user/test/runs                  scheme and path
//! /user/test/runs                         path only
//! ```
//!
//! Parsing never looks at the backend; validation checks the scheme against the
//! canonical prefix of the store being built.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::consts::{DEFAULT_HOST, DEFAULT_PORT};
use crate::error::{Result, StoreError};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?:(.+://))?(?:([^/:]+))?(?:[:]([0-9]+))?(?:(.+))?$")
    .unwrap_or_else(|e| panic!("store URL regex is invalid: {e}"))
});

/// Raw pieces of a location string, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
  pub prefix: Option<String>,
  pub host: Option<String>,
  pub port: Option<u16>,
  pub path: Option<String>,
  /// Byte index of the path in the original string, or its length when there
  /// is no path. `&url[..path_offset]` is everything before the path.
  pub path_offset: usize,
}

/// Split a location string into scheme prefix, host, port and path.
pub fn parse_url(url: &str) -> Result<ParsedUrl> {
  // A drive-letter path like `C:\runs` would otherwise read as host `C`.
  if !url.contains("://") && Path::new(url).is_absolute() {
    return Ok(ParsedUrl {
      prefix: None,
      host: None,
      port: None,
      path: Some(url.to_string()),
      path_offset: 0,
    });
  }

  let caps = URL_PATTERN
    .captures(url)
    .ok_or_else(|| StoreError::invalid_location(url, "does not look like a location"))?;

  let port = match caps.get(3) {
    Some(m) => Some(
      m.as_str()
        .parse::<u16>()
        .map_err(|e| StoreError::invalid_location(url, format!("bad port '{}': {}", m.as_str(), e)))?,
    ),
    None => None,
  };

  let path = caps.get(4);

  Ok(ParsedUrl {
    prefix: caps.get(1).map(|m| m.as_str().to_string()),
    host: caps.get(2).map(|m| m.as_str().to_string()),
    port,
    path: path.map(|m| m.as_str().to_string()),
    path_offset: path.map(|m| m.start()).unwrap_or(url.len()),
  })
}

/// Reject a location whose scheme differs from `expected_prefix` or which has no path.
pub fn check_url(url: &str, prefix: Option<&str>, path: Option<&str>, expected_prefix: &str) -> Result<()> {
  if let Some(prefix) = prefix
    && prefix != expected_prefix
  {
    return Err(StoreError::invalid_location(
      url,
      format!("mismatched namespace, found {} but expected {}", prefix, expected_prefix),
    ));
  }

  if path.is_none_or(str::is_empty) {
    return Err(StoreError::invalid_location(url, "failed to parse a path"));
  }

  Ok(())
}

/// A validated location, fixed for the lifetime of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
  url: String,
  scheme_prefix: Option<String>,
  host: Option<String>,
  port: Option<u16>,
  path: String,
  path_offset: usize,
  url_prefix: String,
}

impl StoreLocation {
  /// Parse `url` and validate it against the canonical prefix of a backend.
  pub fn resolve(url: &str, expected_prefix: &str) -> Result<Self> {
    let parsed = parse_url(url)?;
    check_url(url, parsed.prefix.as_deref(), parsed.path.as_deref(), expected_prefix)?;

    let url_prefix = match parsed.prefix {
      Some(_) => url[..parsed.path_offset].to_string(),
      None => expected_prefix.to_string(),
    };

    Ok(Self {
      url: url.to_string(),
      scheme_prefix: parsed.prefix,
      host: parsed.host,
      port: parsed.port,
      path: parsed.path.unwrap_or_default(),
      path_offset: parsed.path_offset,
      url_prefix,
    })
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  pub fn scheme_prefix(&self) -> Option<&str> {
    self.scheme_prefix.as_deref()
  }

  pub fn host(&self) -> Option<&str> {
    self.host.as_deref()
  }

  pub fn port(&self) -> Option<u16> {
    self.port
  }

  /// The backend-local path, without scheme or authority.
  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn path_offset(&self) -> usize {
    self.path_offset
  }

  /// Everything in front of the path: `hdfs://nn:8020` for a full URL, the
  /// canonical prefix when the location was a bare path.
  pub fn url_prefix(&self) -> &str {
    &self.url_prefix
  }

  /// Re-attach the URL prefix to a backend-local path.
  pub fn full_path(&self, path: &str) -> String {
    format!("{}{}", self.url_prefix, path)
  }

  /// Explicit host, else the one in the URL, else `"default"`.
  pub fn resolve_host(&self, explicit: Option<&str>) -> String {
    explicit
      .or(self.host.as_deref())
      .unwrap_or(DEFAULT_HOST)
      .to_string()
  }

  /// Explicit port, else the one in the URL, else `0`.
  pub fn resolve_port(&self, explicit: Option<u16>) -> u16 {
    explicit.or(self.port).unwrap_or(DEFAULT_PORT)
  }
}
