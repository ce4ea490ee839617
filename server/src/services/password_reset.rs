// bistro_server/src/services/password_reset.rs

//! Forgot-password flow. Only the SHA-256 of a reset token is stored; the token itself
//! leaves the server once, inside the email.

use crate::errors::{AppError, Result};
use crate::services::auth_service;
use crate::services::mailer::{password_reset_email, Mailer};
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

pub struct ResetToken {
  /// Sent to the user.
  pub token: String,
  /// Stored in `password_reset_tokens`.
  pub token_hash: String,
}

pub fn generate_reset_token() -> ResetToken {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = hex::encode(bytes);
  let token_hash = hash_token(&token);
  ResetToken { token, token_hash }
}

pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

pub struct ResetMailSettings<'a> {
  pub sender: &'a str,
  pub frontend_url: &'a str,
}

/// Stores a fresh token for the account and emails the link. Unknown emails are a silent no-op
/// so the endpoint does not reveal which addresses are registered.
#[instrument(name = "service::request_password_reset", skip_all, err(Display))]
pub async fn request_password_reset(
  pool: &PgPool,
  mailer: &dyn Mailer,
  settings: ResetMailSettings<'_>,
  email: &str,
  now: DateTime<Utc>,
) -> Result<()> {
  let user_id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
    .bind(email)
    .fetch_optional(pool)
    .await?;
  let Some(user_id) = user_id else {
    info!("Password reset requested for unknown email.");
    return Ok(());
  };

  let reset = generate_reset_token();
  sqlx::query("INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
    .bind(user_id)
    .bind(&reset.token_hash)
    .bind(now + Duration::minutes(RESET_TOKEN_TTL_MINUTES))
    .execute(pool)
    .await?;

  let message = password_reset_email(settings.sender, settings.frontend_url, email, &reset.token);
  if let Err(e) = mailer.send(&message).await {
    warn!(error = %e, user_id, "Password reset email could not be sent.");
  }
  Ok(())
}

/// Sets a new password if `token` is known and unexpired, then drops every token of that user.
#[instrument(name = "service::reset_password", skip_all, err(Display))]
pub async fn reset_password(pool: &PgPool, token: &str, new_password: &str, now: DateTime<Utc>) -> Result<()> {
  let invalid = || AppError::Validation("Invalid or expired reset token".to_string());

  let mut tx = pool.begin().await?;
  let row: Option<(i64, DateTime<Utc>)> =
    sqlx::query_as("SELECT user_id, expires_at FROM password_reset_tokens WHERE token_hash = $1 FOR UPDATE")
      .bind(hash_token(token))
      .fetch_optional(&mut *tx)
      .await?;
  let (user_id, expires_at) = row.ok_or_else(invalid)?;
  if now > expires_at {
    return Err(invalid());
  }

  let password_hash = auth_service::hash_password(new_password)?;
  sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
    .bind(&password_hash)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
  sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
  tx.commit().await?;

  info!(user_id, "Password reset completed.");
  Ok(())
}
