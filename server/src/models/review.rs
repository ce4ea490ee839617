// bistro_server/src/models/review.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
  pub id: i64,
  pub product_id: i64,
  pub product_name: String,
  pub user_id: i64,
  pub username: String,
  pub rating: i32,
  pub comment: String,
  pub admin_reply: Option<String>,
  pub created_at: DateTime<Utc>,
}

pub const REVIEW_COLUMNS: &str = "r.id, r.product_id, p.name AS product_name, r.user_id, u.username, r.rating, \
   r.comment, r.admin_reply, r.created_at";

pub const REVIEW_JOINS: &str = "FROM product_reviews r \
   JOIN products p ON p.id = r.product_id \
   JOIN users u ON u.id = r.user_id";

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
  pub rating: i32,
  #[serde(default)]
  pub comment: String,
}

impl ReviewPayload {
  pub fn validate(&self) -> Result<(), AppError> {
    if !(1..=5).contains(&self.rating) {
      return Err(AppError::Validation("Rating must be between 1 and 5".to_string()));
    }
    Ok(())
  }
}

#[derive(Debug, Deserialize)]
pub struct ReplyPayload {
  pub reply: String,
}
