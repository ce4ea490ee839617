// bistro_server/src/models/product.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub slug: String,
  pub price: i64,
  pub quantity: i32,
  pub image: String,
  pub description: String,
  pub details: String,
  pub category_id: Option<i64>,
  pub calories: i32,
  pub protein_grams: i32,
  pub carb_grams: i32,
  pub fat_grams: i32,
  pub created_at: DateTime<Utc>,
}

/// Admin create/update body.
#[derive(Debug, Deserialize)]
pub struct ProductPayload {
  pub name: String,
  pub slug: String,
  pub price: i64,
  pub quantity: i32,
  #[serde(default)]
  pub image: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub details: String,
  pub category_id: Option<i64>,
  #[serde(default)]
  pub calories: i32,
  #[serde(default)]
  pub protein_grams: i32,
  #[serde(default)]
  pub carb_grams: i32,
  #[serde(default)]
  pub fat_grams: i32,
}

impl ProductPayload {
  pub fn validate(&self) -> Result<(), AppError> {
    if self.name.trim().is_empty() || self.slug.trim().is_empty() {
      return Err(AppError::Validation("Product name and slug are required".to_string()));
    }
    if self.price < 0 || self.quantity < 0 {
      return Err(AppError::Validation("Price and quantity cannot be negative".to_string()));
    }
    Ok(())
  }
}

/// Column list shared by every product query.
pub const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.price, p.quantity, p.image, p.description, p.details, \
   p.category_id, p.calories, p.protein_grams, p.carb_grams, p.fat_grams, p.created_at";

#[cfg(test)]
mod tests {
  use super::*;

  fn payload(price: i64, quantity: i32) -> ProductPayload {
    serde_json::from_value(serde_json::json!({
      "name": "Pho Bo",
      "slug": "pho-bo",
      "price": price,
      "quantity": quantity,
      "category_id": null
    }))
    .unwrap()
  }

  #[test]
  fn optional_fields_default() {
    let p = payload(45_000, 10);
    assert!(p.validate().is_ok());
    assert_eq!(p.calories, 0);
    assert!(p.image.is_empty());
  }

  #[test]
  fn negative_stock_or_price_is_rejected() {
    assert!(payload(-1, 10).validate().is_err());
    assert!(payload(45_000, -3).validate().is_err());
  }
}
