// bistro-core/src/domain/order.rs

use super::status::OrderStatus;
use crate::error::CommerceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the customer pays, which fixes the order's initial status and when stock is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPath {
  /// Plain order placement (cash on delivery).
  Direct,
  BankTransfer,
  /// Redirect to the hosted gateway page; settled by its callback.
  Gateway,
  /// Synchronous capture, used by the demo payment endpoint.
  ImmediateCapture,
}

impl CheckoutPath {
  pub fn initial_status(self) -> OrderStatus {
    match self {
      CheckoutPath::Direct | CheckoutPath::BankTransfer => OrderStatus::Pending,
      CheckoutPath::Gateway => OrderStatus::PendingPayment,
      CheckoutPath::ImmediateCapture => OrderStatus::Paid,
    }
  }

  pub fn captures_payment(self) -> bool {
    self == CheckoutPath::ImmediateCapture
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
  pub product_id: i64,
  pub quantity: i32,
}

/// Collapses repeated products into one line, keeping first-seen order.
pub fn merge_lines(lines: &[LineRequest]) -> Vec<LineRequest> {
  let mut merged: Vec<LineRequest> = Vec::with_capacity(lines.len());
  let mut index: BTreeMap<i64, usize> = BTreeMap::new();
  for line in lines {
    match index.get(&line.product_id) {
      Some(&at) => merged[at].quantity = merged[at].quantity.saturating_add(line.quantity),
      None => {
        index.insert(line.product_id, merged.len());
        merged.push(*line);
      }
    }
  }
  merged
}

/// A line with its price snapshot taken at order time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricedLine {
  pub product_id: i64,
  pub quantity: i32,
  pub unit_price: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductStock {
  pub product_id: i64,
  pub price: i64,
  pub quantity: i32,
}

/// Who the order is for. `user_id` is `None` for guest checkouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  pub user_id: Option<i64>,
  pub name: String,
  pub phone: String,
  pub shipping_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
  pub user_id: Option<i64>,
  pub customer_name: String,
  pub customer_phone: String,
  pub shipping_address: String,
  /// Amount payable after the discount.
  pub total_amount: i64,
  pub discount_amount: i64,
  pub status: OrderStatus,
  pub applied_voucher_id: Option<i64>,
  pub stock_deducted: bool,
}

/// The fields of an order the workflows read while holding its row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLock {
  pub order_id: i64,
  pub status: OrderStatus,
  pub stock_deducted: bool,
  pub applied_voucher_id: Option<i64>,
}

/// The opaque order id handed to the payment gateway: `<prefix>_<orderID>_<requestID>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReference {
  pub order_id: i64,
  pub request_id: String,
}

impl OrderReference {
  pub fn new(order_id: i64, request_id: impl Into<String>) -> Self {
    Self {
      order_id,
      request_id: request_id.into(),
    }
  }

  pub fn format(&self, prefix: &str) -> String {
    format!("{}_{}_{}", prefix, self.order_id, self.request_id)
  }

  pub fn parse(raw: &str, prefix: &str) -> Result<Self, CommerceError> {
    let invalid = || CommerceError::Validation(format!("invalid order reference: '{}'", raw));

    let rest = raw
      .strip_prefix(prefix)
      .and_then(|r| r.strip_prefix('_'))
      .ok_or_else(invalid)?;
    let (id_part, request_id) = rest.split_once('_').ok_or_else(invalid)?;
    if id_part.is_empty() || !id_part.bytes().all(|b| b.is_ascii_digit()) || request_id.is_empty() {
      return Err(invalid());
    }
    let order_id: i64 = id_part.parse().map_err(|_| invalid())?;
    if order_id <= 0 {
      return Err(invalid());
    }
    Ok(Self::new(order_id, request_id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reference_parses_order_id_out_of_gateway_string() {
    let reference = OrderReference::new(42, "3f1c9a");
    let raw = reference.format("BISTROBLISS");
    assert_eq!(raw, "BISTROBLISS_42_3f1c9a");
    assert_eq!(OrderReference::parse(&raw, "BISTROBLISS").unwrap(), reference);
  }

  #[test]
  fn reference_rejects_foreign_or_malformed_strings() {
    for raw in [
      "OTHER_42_abc",
      "BISTROBLISS_42",
      "BISTROBLISS__abc",
      "BISTROBLISS_-4_abc",
      "BISTROBLISS_4x_abc",
      "BISTROBLISS_0_abc",
      "BISTROBLISS42_abc",
    ] {
      assert!(OrderReference::parse(raw, "BISTROBLISS").is_err(), "{} should be rejected", raw);
    }
  }

  #[test]
  fn duplicate_products_are_merged() {
    let merged = merge_lines(&[
      LineRequest { product_id: 7, quantity: 1 },
      LineRequest { product_id: 3, quantity: 2 },
      LineRequest { product_id: 7, quantity: 4 },
    ]);
    assert_eq!(
      merged,
      vec![
        LineRequest { product_id: 7, quantity: 5 },
        LineRequest { product_id: 3, quantity: 2 },
      ]
    );
  }

  #[test]
  fn initial_status_follows_checkout_path() {
    assert_eq!(CheckoutPath::Direct.initial_status(), OrderStatus::Pending);
    assert_eq!(CheckoutPath::BankTransfer.initial_status(), OrderStatus::Pending);
    assert_eq!(CheckoutPath::Gateway.initial_status(), OrderStatus::PendingPayment);
    assert_eq!(CheckoutPath::ImmediateCapture.initial_status(), OrderStatus::Paid);
  }
}
