// bistro_server/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub is_admin: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
  pub username: String,
  pub email: String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub id: i64,
  pub email: String,
  pub token: String,
  pub username: String,
  pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
  pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
  pub token: String,
  pub password: String,
}
