// bistro-core/src/error.rs
use crate::domain::OrderStatus;
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the pipeline engine itself, independent of any business rule.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Pipeline '{pipeline}' has no handler for step '{step_name}'")]
  HandlerMissing { pipeline: &'static str, step_name: String },
}

/// Every failure the order, payment and inventory workflows can report.
///
/// The messages are client-facing for the business-rule variants; `Storage` and
/// `Workflow` carry internal detail and must not be echoed to callers.
#[derive(Debug, Error)]
pub enum CommerceError {
  #[error("{0}")]
  Validation(String),

  #[error("product not found: ID {0}")]
  ProductNotFound(i64),

  #[error("order not found: ID {0}")]
  OrderNotFound(i64),

  #[error("insufficient stock for product ID {product_id}")]
  InsufficientStock { product_id: i64 },

  #[error("voucher does not exist or does not belong to you")]
  VoucherNotFound,

  #[error("voucher has already been used")]
  VoucherAlreadyUsed,

  #[error("voucher has expired")]
  VoucherExpired,

  #[error("voucher is not available for claiming")]
  VoucherNotClaimable,

  #[error("voucher has already been claimed")]
  VoucherAlreadyClaimed,

  #[error("cannot change order status from {from} to {to}")]
  InvalidTransition { from: OrderStatus, to: OrderStatus },

  #[error("payment gateway error: {0}")]
  Gateway(String),

  #[error("storage failure: {source}")]
  Storage {
    #[source]
    source: AnyhowError,
  },

  #[error("workflow failure: {source}")]
  Workflow {
    #[from]
    source: PipelineError,
  },
}

impl CommerceError {
  /// Wraps a driver-level failure (sqlx, I/O, ...) as `CommerceError::Storage`.
  pub fn storage(err: impl Into<AnyhowError>) -> Self {
    CommerceError::Storage { source: err.into() }
  }
}

pub type CommerceResult<T, E = CommerceError> = std::result::Result<T, E>;
