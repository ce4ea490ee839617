// bistro_server/src/models/cart.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A cart row joined with its product.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
  pub product_id: i64,
  pub name: String,
  pub slug: String,
  pub image: String,
  pub price: i64,
  pub quantity: i32,
  /// Units currently in stock.
  pub available: i32,
}

#[derive(Debug, Deserialize)]
pub struct CartItemPayload {
  pub product_id: i64,
  pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CartQuantityPayload {
  pub quantity: i32,
}
