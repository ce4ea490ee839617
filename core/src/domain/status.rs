// bistro-core/src/domain/status.rs

//! Order statuses and the inventory classification every workflow consults.

use crate::error::CommerceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
  feature = "postgres",
  derive(sqlx::Type),
  sqlx(type_name = "order_status", rename_all = "snake_case")
)]
pub enum OrderStatus {
  /// Direct or bank-transfer order waiting for an admin to move it along.
  Pending,
  /// Created for a redirect gateway, waiting for its callback.
  PendingPayment,
  Paid,
  Shipped,
  Completed,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::PendingPayment,
    OrderStatus::Paid,
    OrderStatus::Shipped,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::PendingPayment => "pending_payment",
      OrderStatus::Paid => "paid",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Completed => "completed",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  /// Statuses whose line items must already be subtracted from inventory.
  pub const fn deducts_stock(self) -> bool {
    matches!(self, OrderStatus::Shipped | OrderStatus::Completed)
  }

  /// Whether an admin may move an order from `self` to `target`.
  ///
  /// `cancelled` never reopens. `completed` only accepts `cancelled` (a return).
  /// Re-applying the current status is allowed and treated as a no-op by callers.
  pub fn can_transition_to(self, target: OrderStatus) -> bool {
    if self == target {
      return true;
    }
    match self {
      OrderStatus::Cancelled => false,
      OrderStatus::Completed => target == OrderStatus::Cancelled,
      _ => true,
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = CommerceError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| CommerceError::Validation(format!("invalid order status: '{}'", s)))
  }
}

/// What happened to an order that might move its line items in or out of inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockTrigger {
  /// The order's status is being set to the given value.
  StatusChange(OrderStatus),
  /// Payment for the order was captured (immediate capture or a successful gateway callback).
  PaymentCaptured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockEffect {
  /// Reserve every line item.
  Deduct,
  /// Put every line item back.
  Restore,
  Unchanged,
}

impl StockEffect {
  /// The order's deduction flag after this effect has been applied.
  pub fn deducted_after(self, already_deducted: bool) -> bool {
    match self {
      StockEffect::Deduct => true,
      StockEffect::Restore => false,
      StockEffect::Unchanged => already_deducted,
    }
  }
}

/// The single place that decides whether inventory moves.
///
/// `already_deducted` is the order's persisted deduction flag, so an order deducted at
/// capture time is never deducted again when it ships, and an order cancelled before any
/// deduction restores nothing.
pub fn stock_effect(already_deducted: bool, trigger: StockTrigger) -> StockEffect {
  match (already_deducted, trigger) {
    (false, StockTrigger::PaymentCaptured) => StockEffect::Deduct,
    (false, StockTrigger::StatusChange(target)) if target.deducts_stock() => StockEffect::Deduct,
    (true, StockTrigger::StatusChange(OrderStatus::Cancelled)) => StockEffect::Restore,
    _ => StockEffect::Unchanged,
  }
}
