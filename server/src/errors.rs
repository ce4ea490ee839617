// bistro_server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use bistro_core::CommerceError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Upstream Service Error: {0}")]
  Upstream(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  /// Storage or engine failure surfaced by an order workflow.
  #[error("Workflow Error: {source}")]
  Workflow { source: CommerceError },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<CommerceError> for AppError {
  fn from(err: CommerceError) -> Self {
    match err {
      CommerceError::Validation(message) => AppError::Validation(message),
      CommerceError::ProductNotFound(_) | CommerceError::OrderNotFound(_) | CommerceError::VoucherNotClaimable => {
        AppError::NotFound(err.to_string())
      }
      CommerceError::InsufficientStock { .. }
      | CommerceError::VoucherNotFound
      | CommerceError::VoucherAlreadyUsed
      | CommerceError::VoucherExpired
      | CommerceError::VoucherAlreadyClaimed
      | CommerceError::InvalidTransition { .. } => AppError::Validation(err.to_string()),
      CommerceError::Gateway(message) => AppError::Gateway(message),
      CommerceError::Storage { .. } | CommerceError::Workflow { .. } => AppError::Workflow { source: err },
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(format!("{:#}", other)),
    }
  }
}

impl AppError {
  /// Message safe to show to the client. Server-side failures get a fixed text.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::Forbidden(m) | AppError::NotFound(m) => m.clone(),
      AppError::Gateway(_) => "Payment gateway error, please try again later".to_string(),
      AppError::Upstream(_) => "Upstream service unavailable".to_string(),
      AppError::Config(_) => "Configuration issue".to_string(),
      AppError::Sqlx(_) | AppError::Workflow { .. } => "Database operation failed".to_string(),
      AppError::Internal(_) => "An internal error occurred".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Gateway(_)
      | AppError::Upstream(_)
      | AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::debug!(application_error = %self, status = status.as_u16(), "Rejecting request");
    }
    HttpResponse::build(status).json(json!({ "error": self.public_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use bistro_core::domain::OrderStatus;

  #[test]
  fn business_rule_violations_are_bad_requests() {
    for err in [
      CommerceError::InsufficientStock { product_id: 7 },
      CommerceError::VoucherAlreadyUsed,
      CommerceError::VoucherExpired,
      CommerceError::VoucherNotFound,
      CommerceError::VoucherAlreadyClaimed,
      CommerceError::InvalidTransition {
        from: OrderStatus::Cancelled,
        to: OrderStatus::Paid,
      },
    ] {
      assert_eq!(AppError::from(err).status_code(), StatusCode::BAD_REQUEST);
    }
  }

  #[test]
  fn missing_entities_are_not_found() {
    assert_eq!(
      AppError::from(CommerceError::OrderNotFound(3)).status_code(),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      AppError::from(CommerceError::VoucherNotClaimable).status_code(),
      StatusCode::NOT_FOUND
    );
  }

  #[test]
  fn storage_failures_hide_their_detail() {
    let err = AppError::from(CommerceError::storage(anyhow::anyhow!("connection reset by peer")));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.public_message(), "Database operation failed");
  }

  #[actix_rt::test]
  async fn error_body_is_a_single_error_field() {
    let response = AppError::from(CommerceError::InsufficientStock { product_id: 7 }).error_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, json!({ "error": "insufficient stock for product ID 7" }));
  }
}
