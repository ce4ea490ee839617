// bistro_server/src/models/order.rs

use bistro_core::domain::{LineRequest, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderSummary {
  pub id: i64,
  pub user_id: Option<i64>,
  pub username: Option<String>,
  pub customer_name: String,
  pub customer_phone: String,
  pub shipping_address: String,
  pub total_amount: i64,
  pub discount_amount: i64,
  pub voucher_code: Option<String>,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

/// Column list for `OrderSummary`, expecting `orders o`, `users u` and `vouchers v` joins.
pub const ORDER_SUMMARY_COLUMNS: &str = "o.id, o.user_id, u.username, o.customer_name, o.customer_phone, \
   o.shipping_address, o.total_amount, o.discount_amount, v.code AS voucher_code, o.status, o.created_at";

pub const ORDER_SUMMARY_JOINS: &str = "FROM orders o \
   LEFT JOIN users u ON u.id = o.user_id \
   LEFT JOIN user_vouchers uv ON uv.id = o.applied_voucher_id \
   LEFT JOIN vouchers v ON v.id = uv.voucher_id";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItemView {
  pub id: i64,
  pub order_id: i64,
  pub product_id: i64,
  pub product_name: String,
  pub product_image: String,
  pub quantity: i32,
  pub price_at_purchase: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: OrderSummary,
  pub items: Vec<OrderItemView>,
}

/// Body shared by the direct-order and payment endpoints. The customer's account is taken
/// from the bearer token, never from here.
#[derive(Debug, Deserialize)]
pub struct CheckoutPayload {
  pub customer_name: String,
  pub customer_phone: String,
  pub shipping_address: String,
  pub cart_items: Vec<LineRequest>,
  pub applied_user_voucher_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusPayload {
  pub status: String,
}
