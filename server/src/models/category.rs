// bistro_server/src/models/category.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
  pub id: i64,
  pub name: String,
  pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
  pub name: String,
  pub slug: String,
}
