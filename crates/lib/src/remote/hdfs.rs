//! HDFS backend over the WebHDFS REST API.
//!
//! The namenode answers metadata calls itself and redirects `CREATE`/`OPEN` to
//! a datanode. Redirects are followed by hand: the body must only be sent to
//! the datanode, never to the namenode.
//!
//! Endpoint resolution:
//! - `extra_conf["dfs.namenode.http-address"]` wins when set (`host:port` or a URL);
//! - otherwise `http://{host}:{port}`, with host `default` meaning `localhost`
//!   and port `0` meaning `9870`.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

use super::{ConnectParams, RemoteFilesystem};
use crate::consts::{
  CONF_HTTP_ADDRESS, CONF_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_PORT, WEBHDFS_DEFAULT_HOST, WEBHDFS_DEFAULT_PORT,
  WEBHDFS_PATH,
};
use crate::error::{Result, StoreError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct BooleanResponse {
  boolean: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LocationResponse {
  location: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemoteExceptionBody {
  remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
  exception: String,
  message: String,
}

#[derive(Debug, Clone)]
pub struct HdfsFilesystem {
  client: Client,
  endpoint: String,
  user: Option<String>,
  delegation: Option<String>,
}

impl HdfsFilesystem {
  /// Base URL of the namenode's HTTP server for these parameters.
  pub fn endpoint(params: &ConnectParams) -> String {
    if let Some(addr) = params.extra_conf.get(CONF_HTTP_ADDRESS) {
      let addr = addr.trim_end_matches('/');
      if addr.contains("://") {
        return addr.to_string();
      }
      return format!("http://{}", addr);
    }

    let host = if params.host.is_empty() || params.host == DEFAULT_HOST {
      WEBHDFS_DEFAULT_HOST
    } else {
      params.host.as_str()
    };
    let port = if params.port == DEFAULT_PORT {
      WEBHDFS_DEFAULT_PORT
    } else {
      params.port
    };
    format!("http://{}:{}", host, port)
  }

  /// Build a handle without touching the network.
  pub fn new(params: &ConnectParams) -> Result<Self> {
    let endpoint = Self::endpoint(params);
    let unavailable = |message: String| StoreError::BackendUnavailable {
      endpoint: endpoint.clone(),
      message,
    };

    let timeout = match params.extra_conf.get(CONF_TIMEOUT_SECS) {
      Some(raw) => Duration::from_secs(
        raw
          .parse()
          .map_err(|_| unavailable(format!("invalid {} '{}'", CONF_TIMEOUT_SECS, raw)))?,
      ),
      None => DEFAULT_TIMEOUT,
    };

    let client = Client::builder()
      .redirect(reqwest::redirect::Policy::none())
      .timeout(timeout)
      .build()
      .map_err(|e| unavailable(e.to_string()))?;

    Ok(Self {
      client,
      endpoint: endpoint.clone(),
      user: params.user.clone(),
      delegation: params.kerb_ticket.clone(),
    })
  }

  /// Build a handle and check that the namenode answers and accepts our credentials.
  pub fn connect(params: &ConnectParams) -> Result<Self> {
    let fs = Self::new(params)?;
    fs.check_root()?;
    info!(endpoint = %fs.endpoint, user = ?fs.user, "connected to WebHDFS");
    Ok(fs)
  }

  pub fn endpoint_url(&self) -> &str {
    &self.endpoint
  }

  fn check_root(&self) -> Result<()> {
    let unavailable = |message: String| StoreError::BackendUnavailable {
      endpoint: self.endpoint.clone(),
      message,
    };

    let url = self.op_url("/", "GETFILESTATUS", &[]).map_err(|e| unavailable(e.to_string()))?;
    let response = self
      .client
      .get(url)
      .send()
      .map_err(|e| unavailable(e.to_string()))?;

    match response.status() {
      s if s.is_success() => Ok(()),
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(unavailable(format!(
        "authentication failed: {}",
        error_message(response)
      ))),
      _ => Err(unavailable(error_message(response))),
    }
  }

  /// `{endpoint}/webhdfs/v1{path}?op={op}&user.name=..&delegation=..&{extra}`
  pub fn op_url(&self, path: &str, op: &str, extra: &[(&str, &str)]) -> Result<Url> {
    let mut url = Url::parse(&self.endpoint).map_err(|e| StoreError::remote(path, e))?;

    let path = if path.starts_with('/') {
      path.to_string()
    } else {
      format!("/{}", path)
    };
    url.set_path(&format!("{}{}", WEBHDFS_PATH, path));

    {
      let mut query = url.query_pairs_mut();
      query.append_pair("op", op);
      if let Some(user) = &self.user {
        query.append_pair("user.name", user);
      }
      if let Some(token) = &self.delegation {
        query.append_pair("delegation", token);
      }
      for (k, v) in extra {
        query.append_pair(k, v);
      }
    }

    Ok(url)
  }

  fn send(&self, method: Method, path: &str, op: &str, extra: &[(&str, &str)]) -> Result<Response> {
    let url = self.op_url(path, op, extra)?;
    debug!(%method, op, path, "webhdfs request");
    self
      .client
      .request(method, url)
      .send()
      .map_err(|e| StoreError::remote(path, e))
  }

  /// Datanode URL from a namenode redirect, either a 307 `Location` header or
  /// a `noredirect` JSON body.
  fn redirect_target(path: &str, response: Response) -> Result<String> {
    let status = response.status();
    if status.is_redirection() {
      return response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| StoreError::remote(path, "redirect without a Location header"));
    }
    if status.is_success() {
      let body: LocationResponse = response.json().map_err(|e| StoreError::remote(path, e))?;
      return Ok(body.location);
    }
    Err(StoreError::remote(path, error_message(response)))
  }
}

impl RemoteFilesystem for HdfsFilesystem {
  fn exists(&self, path: &str) -> Result<bool> {
    let response = self.send(Method::GET, path, "GETFILESTATUS", &[])?;
    match response.status() {
      s if s.is_success() => Ok(true),
      StatusCode::NOT_FOUND => Ok(false),
      _ => Err(StoreError::remote(path, error_message(response))),
    }
  }

  fn mkdirs(&self, path: &str) -> Result<()> {
    let response = self.send(Method::PUT, path, "MKDIRS", &[])?;
    if !response.status().is_success() {
      return Err(StoreError::remote(path, error_message(response)));
    }
    let body: BooleanResponse = response.json().map_err(|e| StoreError::remote(path, e))?;
    if !body.boolean {
      return Err(StoreError::remote(path, "namenode refused to create directory"));
    }
    Ok(())
  }

  fn upload(&self, path: &str, reader: &mut dyn Read) -> Result<()> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data).map_err(|e| StoreError::remote(path, e))?;

    let response = self.send(Method::PUT, path, "CREATE", &[("overwrite", "true")])?;
    let location = Self::redirect_target(path, response)?;

    let size = data.len();
    let response = self
      .client
      .put(location)
      .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
      .body(data)
      .send()
      .map_err(|e| StoreError::remote(path, e))?;

    if !response.status().is_success() {
      return Err(StoreError::remote(path, error_message(response)));
    }

    debug!(path, bytes = size, "uploaded to datanode");
    Ok(())
  }

  fn read(&self, path: &str) -> Result<Vec<u8>> {
    let response = self.send(Method::GET, path, "OPEN", &[])?;
    let response = if response.status().is_redirection() {
      let location = Self::redirect_target(path, response)?;
      self
        .client
        .get(location)
        .send()
        .map_err(|e| StoreError::remote(path, e))?
    } else {
      response
    };

    if !response.status().is_success() {
      return Err(StoreError::remote(path, error_message(response)));
    }
    let bytes = response.bytes().map_err(|e| StoreError::remote(path, e))?;
    Ok(bytes.to_vec())
  }

  fn delete(&self, path: &str, recursive: bool) -> Result<()> {
    let recursive = if recursive { "true" } else { "false" };
    let response = self.send(Method::DELETE, path, "DELETE", &[("recursive", recursive)])?;
    if !response.status().is_success() {
      return Err(StoreError::remote(path, error_message(response)));
    }
    Ok(())
  }
}

/// Best description of a failed response: the `RemoteException` if the server
/// sent one, else the status line.
fn error_message(response: Response) -> String {
  let status = response.status();
  match response.text() {
    Ok(text) => match serde_json::from_str::<RemoteExceptionBody>(&text) {
      Ok(body) => format!(
        "HTTP {}: {}: {}",
        status, body.remote_exception.exception, body.remote_exception.message
      ),
      Err(_) if text.trim().is_empty() => format!("HTTP {}", status),
      Err(_) => format!("HTTP {}: {}", status, text.trim()),
    },
    Err(_) => format!("HTTP {}", status),
  }
}
