// bistro_server/src/models/voucher.rs

use crate::errors::AppError;
use bistro_core::domain::DiscountType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Voucher {
  pub id: i64,
  pub code: String,
  pub description: String,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  pub hunt_start_time: DateTime<Utc>,
  pub hunt_end_time: DateTime<Utc>,
  pub valid_duration_days: i32,
  /// Informational only; discounts apply to the whole cart.
  pub applicable_product_ids: Option<Vec<i32>>,
  pub created_at: DateTime<Utc>,
}

pub const VOUCHER_COLUMNS: &str = "v.id, v.code, v.description, v.discount_type, v.discount_value, v.hunt_start_time, \
   v.hunt_end_time, v.valid_duration_days, v.applicable_product_ids, v.created_at";

/// A claim in the user's wallet, with the template it was claimed from.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserVoucherView {
  pub id: i64,
  pub user_id: i64,
  pub voucher_id: i64,
  pub claimed_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub is_used: bool,
  pub code: String,
  pub description: String,
  pub discount_type: DiscountType,
  pub discount_value: i64,
}

#[derive(Debug, Deserialize)]
pub struct VoucherPayload {
  pub code: String,
  #[serde(default)]
  pub description: String,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  pub hunt_start_time: DateTime<Utc>,
  pub hunt_end_time: DateTime<Utc>,
  pub valid_duration_days: i32,
  pub applicable_product_ids: Option<Vec<i32>>,
}

impl VoucherPayload {
  pub fn validate(&self) -> Result<(), AppError> {
    if self.code.trim().is_empty() {
      return Err(AppError::Validation("Voucher code is required".to_string()));
    }
    if self.discount_value <= 0 || self.valid_duration_days <= 0 {
      return Err(AppError::Validation(
        "Discount value and valid duration must be positive".to_string(),
      ));
    }
    if self.discount_type == DiscountType::Percentage && self.discount_value > 100 {
      return Err(AppError::Validation("Percentage discount cannot exceed 100".to_string()));
    }
    if self.hunt_end_time < self.hunt_start_time {
      return Err(AppError::Validation("Claim window ends before it starts".to_string()));
    }
    Ok(())
  }
}
