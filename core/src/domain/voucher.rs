// bistro-core/src/domain/voucher.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "discount_type", rename_all = "snake_case")
)]
pub enum DiscountType {
  Percentage,
  FixedAmount,
}

/// Discount granted on `subtotal`, always within `0..=subtotal`.
///
/// Percentage discounts round down. Fixed amounts are capped at the subtotal.
pub fn compute_discount(kind: DiscountType, value: i64, subtotal: i64) -> i64 {
  if subtotal <= 0 || value <= 0 {
    return 0;
  }
  let raw = match kind {
    DiscountType::Percentage => {
      let scaled = i128::from(subtotal) * i128::from(value) / 100;
      i64::try_from(scaled).unwrap_or(i64::MAX)
    }
    DiscountType::FixedAmount => value,
  };
  raw.min(subtotal)
}

/// An admin-defined voucher as seen by the claim guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherTemplate {
  pub id: i64,
  pub code: String,
  pub discount_type: DiscountType,
  pub discount_value: i64,
  pub hunt_start_time: DateTime<Utc>,
  pub hunt_end_time: DateTime<Utc>,
  pub valid_duration_days: i32,
}

impl VoucherTemplate {
  /// The claim window is inclusive on both ends.
  pub fn is_claimable_at(&self, now: DateTime<Utc>) -> bool {
    self.hunt_start_time <= now && now <= self.hunt_end_time
  }

  pub fn claim_expiry(&self, claimed_at: DateTime<Utc>) -> DateTime<Utc> {
    claimed_at + Duration::days(i64::from(self.valid_duration_days))
  }
}

/// A user's claim joined with its template, read under a row lock during checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedClaim {
  pub user_voucher_id: i64,
  pub is_used: bool,
  pub expires_at: DateTime<Utc>,
  pub discount_type: DiscountType,
  pub discount_value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClaim {
  pub user_id: i64,
  pub voucher_id: i64,
  pub claimed_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimedVoucher {
  pub id: i64,
  pub user_id: i64,
  pub voucher_id: i64,
  pub claimed_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub is_used: bool,
}
