// bistro_server/src/services/ai_client.rs

//! Client for the external AI search / recommendation service.
//!
//! The service only returns product ids; callers load the products themselves and decide
//! on a fallback when the service is unavailable.

use crate::errors::AppError;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
  text: &'a str,
  limit: i64,
}

#[derive(Clone)]
pub struct AiClient {
  client: reqwest::Client,
  base_url: String,
}

impl AiClient {
  pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
    Self {
      client,
      base_url: base_url.into(),
    }
  }

  /// `POST {base}/search`, returning matching product ids in relevance order.
  #[instrument(name = "service::ai_search", skip(self), err(Display))]
  pub async fn search(&self, text: &str, limit: i64) -> Result<Vec<i64>, AppError> {
    let response = self
      .client
      .post(format!("{}/search", self.base_url))
      .json(&SearchRequest { text, limit })
      .send()
      .await
      .map_err(|e| AppError::Upstream(format!("AI search request failed: {}", e)))?;
    read_ids(response, "search").await
  }

  /// `GET {base}/related-products/{id}?limit=N`.
  #[instrument(name = "service::ai_related_products", skip(self), err(Display))]
  pub async fn related_products(&self, product_id: i64, limit: i64) -> Result<Vec<i64>, AppError> {
    let response = self
      .client
      .get(format!("{}/related-products/{}", self.base_url, product_id))
      .query(&[("limit", limit)])
      .send()
      .await
      .map_err(|e| AppError::Upstream(format!("AI related-products request failed: {}", e)))?;
    read_ids(response, "related-products").await
  }
}

async fn read_ids(response: reqwest::Response, operation: &str) -> Result<Vec<i64>, AppError> {
  let status = response.status();
  if !status.is_success() {
    let detail = response.text().await.unwrap_or_default();
    return Err(AppError::Upstream(format!(
      "AI {} returned HTTP {}: {}",
      operation, status, detail
    )));
  }
  let ids: Vec<i64> = response
    .json()
    .await
    .map_err(|e| AppError::Upstream(format!("Unreadable AI {} response: {}", operation, e)))?;
  debug!(operation, count = ids.len(), "AI service answered.");
  Ok(ids)
}
