//! Async HTTP client for the Donor Management DB tasks API.

use std::future::Future;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::Config;

use super::api_types::ApiTask;

/// Donor tasks requested in one page. No pagination beyond a single page is
/// attempted; very large donor collections are out of scope.
pub const PAGE_LIMIT: u32 = 500;

/// A hung donor DB must not hang this service.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Network, timeout, or non-2xx failure talking to the donor DB.
///
/// Always produced at this boundary; callers branch on it rather than
/// unwinding through the cache or endpoint layers.
#[derive(Debug, Error)]
#[error("donor DB request failed: {message}")]
pub struct TransportError {
  message: String,
}

impl TransportError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

impl From<reqwest::Error> for TransportError {
  fn from(err: reqwest::Error) -> Self {
    Self {
      message: err.to_string(),
    }
  }
}

/// The donor DB operations the cache layer is built on.
///
/// The production implementation is [`DonorClient`]; tests substitute a fake
/// to script upstream behavior and count calls.
pub trait DonorApi: Send + Sync {
  /// Fetch one page of tasks. The list endpoint does not include contacts.
  fn list_tasks(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<ApiTask>, TransportError>> + Send;

  /// Fetch one task with its contacts. `Ok(None)` on an upstream 404 only;
  /// any other failure is a transport error.
  fn get_task(
    &self,
    id: u64,
  ) -> impl Future<Output = Result<Option<ApiTask>, TransportError>> + Send;

  /// Push a status change upstream. `donor_status` must already be in the
  /// donor vocabulary.
  fn update_status(
    &self,
    id: u64,
    donor_status: &str,
  ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// reqwest-backed donor DB client.
#[derive(Clone)]
pub struct DonorClient {
  http: reqwest::Client,
  base_url: String,
}

impl DonorClient {
  pub fn new(config: &Config) -> Result<Self> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(key) = Config::get_donor_api_key() {
      let mut value = reqwest::header::HeaderValue::from_str(&key)
        .map_err(|e| eyre!("Invalid DONOR_DB_API_KEY: {}", e))?;
      value.set_sensitive(true);
      headers.insert("X-API-Key", value);
    }

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| eyre!("Failed to create donor DB client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.donor.url.trim_end_matches('/').to_string(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }
}

impl DonorApi for DonorClient {
  async fn list_tasks(&self, limit: u32) -> Result<Vec<ApiTask>, TransportError> {
    let resp = self
      .http
      .get(self.url("/api/v1/tasks"))
      .query(&[("limit", limit)])
      .send()
      .await?;
    if !resp.status().is_success() {
      return Err(TransportError::new(format!(
        "donor DB returned {} listing tasks",
        resp.status()
      )));
    }
    Ok(resp.json().await?)
  }

  async fn get_task(&self, id: u64) -> Result<Option<ApiTask>, TransportError> {
    let resp = self
      .http
      .get(self.url(&format!("/api/v1/tasks/{}", id)))
      .send()
      .await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !resp.status().is_success() {
      return Err(TransportError::new(format!(
        "donor DB returned {} for task {}",
        resp.status(),
        id
      )));
    }
    Ok(Some(resp.json().await?))
  }

  async fn update_status(&self, id: u64, donor_status: &str) -> Result<(), TransportError> {
    // Completion has a dedicated endpoint; everything else goes through the
    // generic update call.
    let resp = if donor_status == "completed" {
      self
        .http
        .post(self.url(&format!("/api/v1/tasks/{}/complete", id)))
        .send()
        .await?
    } else {
      self
        .http
        .put(self.url(&format!("/api/v1/tasks/{}", id)))
        .json(&serde_json::json!({ "status": donor_status }))
        .send()
        .await?
    };
    if !resp.status().is_success() {
      return Err(TransportError::new(format!(
        "donor DB returned {} updating task {}",
        resp.status(),
        id
      )));
    }
    Ok(())
  }
}
