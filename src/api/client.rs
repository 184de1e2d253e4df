use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::types::{ConflictSummary, KpiSnapshot, Notification, TourSummary};
use super::FieldApi;
use crate::config::Config;

/// HTTP client for the field-operations API
#[derive(Clone)]
pub struct HttpFieldApi {
  client: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl HttpFieldApi {
  pub fn new(config: &Config) -> Result<Self> {
    Self::with_base_url(
      config.api.base_url.clone(),
      config.api_timeout(),
      Config::get_api_token(),
    )
  }

  pub fn with_base_url(base_url: Url, timeout: Duration, token: Option<String>) -> Result<Self> {
    if base_url.cannot_be_a_base() {
      return Err(eyre!("API base URL {} cannot carry a path", base_url));
    }

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create API client: {}", e))?;

    Ok(Self {
      client,
      base_url,
      token,
    })
  }

  /// Build an endpoint URL below the base, percent-encoding each segment.
  fn endpoint(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| eyre!("API base URL {} cannot carry a path", self.base_url))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
    let url = self.endpoint(segments)?;

    let response = self
      .authorize(self.client.get(url.clone()))
      .send()
      .await
      .map_err(|e| eyre!("GET {} failed: {}", url, e))?
      .error_for_status()
      .map_err(|e| eyre!("GET {} returned an error: {}", url, e))?;

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))
  }

  async fn post_notes(&self, segments: &[&str], notes: &str) -> Result<()> {
    let url = self.endpoint(segments)?;
    let body = serde_json::json!({ "notes": notes });

    self
      .authorize(self.client.post(url.clone()))
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("POST {} failed: {}", url, e))?
      .error_for_status()
      .map_err(|e| eyre!("POST {} returned an error: {}", url, e))?;

    Ok(())
  }
}

#[async_trait]
impl FieldApi for HttpFieldApi {
  async fn kpis(&self) -> Result<KpiSnapshot> {
    self.get_json(&["dashboard", "kpis"]).await
  }

  async fn urgent_conflicts(&self) -> Result<Vec<ConflictSummary>> {
    self.get_json(&["dashboard", "conflicts", "urgent"]).await
  }

  async fn active_tours(&self) -> Result<Vec<TourSummary>> {
    self.get_json(&["dashboard", "tours", "active"]).await
  }

  async fn notifications(&self) -> Result<Vec<Notification>> {
    self.get_json(&["notifications"]).await
  }

  async fn approve_conflict(&self, conflict_id: &str, notes: &str) -> Result<()> {
    self
      .post_notes(&["conflicts", conflict_id, "approve"], notes)
      .await
  }

  async fn reject_conflict(&self, conflict_id: &str, notes: &str) -> Result<()> {
    self
      .post_notes(&["conflicts", conflict_id, "reject"], notes)
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn api(base: &str) -> HttpFieldApi {
    HttpFieldApi::with_base_url(Url::parse(base).unwrap(), Duration::from_secs(1), None).unwrap()
  }

  #[test]
  fn test_endpoint_with_trailing_slash() {
    let url = api("https://ops.example.com/api/")
      .endpoint(&["dashboard", "kpis"])
      .unwrap();
    assert_eq!(url.as_str(), "https://ops.example.com/api/dashboard/kpis");
  }

  #[test]
  fn test_endpoint_without_trailing_slash() {
    let url = api("https://ops.example.com/api")
      .endpoint(&["conflicts", "c1", "approve"])
      .unwrap();
    assert_eq!(url.as_str(), "https://ops.example.com/api/conflicts/c1/approve");
  }

  #[test]
  fn test_endpoint_encodes_ids() {
    let url = api("https://ops.example.com/")
      .endpoint(&["conflicts", "a/b c", "reject"])
      .unwrap();
    assert_eq!(url.as_str(), "https://ops.example.com/conflicts/a%2Fb%20c/reject");
  }

  #[test]
  fn test_rejects_non_hierarchical_base() {
    let base = Url::parse("mailto:ops@example.com").unwrap();
    assert!(HttpFieldApi::with_base_url(base, Duration::from_secs(1), None).is_err());
  }

  #[tokio::test]
  async fn test_unreachable_server_is_an_error() {
    // Port 9 (discard) on localhost is not expected to serve HTTP
    let api = api("http://127.0.0.1:9/");
    assert!(api.kpis().await.is_err());
    assert!(api.approve_conflict("c1", "ok").await.is_err());
  }
}
