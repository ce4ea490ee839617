// bistro_server/src/web/handlers/voucher_handlers.rs

//! The user's voucher wallet: hunting (claiming) vouchers during their window, listing
//! and clearing out claims.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::{AppError, Result};
use crate::models::voucher::VOUCHER_COLUMNS;
use crate::models::{UserVoucherView, Voucher};
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[derive(Debug, Default, Deserialize)]
pub struct WalletQuery {
  pub show_used: Option<String>,
}

/// Vouchers inside their claim window that the user does not own yet.
#[instrument(name = "handler::claimable_vouchers", skip(app_state, user), fields(user_id = user.user_id))]
pub async fn claimable_vouchers_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let vouchers: Vec<Voucher> = sqlx::query_as(&format!(
    "SELECT {} FROM vouchers v \
     WHERE $1 BETWEEN v.hunt_start_time AND v.hunt_end_time \
     AND NOT EXISTS (SELECT 1 FROM user_vouchers uv WHERE uv.voucher_id = v.id AND uv.user_id = $2) \
     ORDER BY v.hunt_end_time",
    VOUCHER_COLUMNS
  ))
  .bind(Utc::now())
  .bind(user.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(vouchers))
}

#[instrument(name = "handler::claim_voucher", skip(app_state, user, voucher_id), fields(user_id = user.user_id, voucher_id = %voucher_id))]
pub async fn claim_voucher_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  voucher_id: web::Path<i64>,
) -> Result<HttpResponse> {
  let claim = app_state
    .workflows
    .claim_voucher(*voucher_id, user.user_id, Utc::now())
    .await?;
  info!(user_voucher_id = claim.id, expires_at = %claim.expires_at, "Voucher claimed.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Voucher claimed successfully",
      "user_voucher_id": claim.id,
      "expires_at": claim.expires_at,
  })))
}

/// Usable claims by default; `show_used=true` also lists used and expired ones.
#[instrument(name = "handler::user_vouchers", skip(app_state, user, query), fields(user_id = user.user_id))]
pub async fn user_vouchers_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<WalletQuery>,
) -> Result<HttpResponse> {
  let show_used = query.show_used.as_deref() == Some("true");
  let vouchers: Vec<UserVoucherView> = sqlx::query_as(
    "SELECT uv.id, uv.user_id, uv.voucher_id, uv.claimed_at, uv.expires_at, uv.is_used, \
     v.code, v.description, v.discount_type, v.discount_value \
     FROM user_vouchers uv JOIN vouchers v ON v.id = uv.voucher_id \
     WHERE uv.user_id = $1 AND ($2 OR (uv.is_used = FALSE AND uv.expires_at > $3)) \
     ORDER BY uv.expires_at ASC",
  )
  .bind(user.user_id)
  .bind(show_used)
  .bind(Utc::now())
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(vouchers))
}

/// Only used or expired claims can be removed from the wallet.
#[instrument(
    name = "handler::delete_user_voucher",
    skip(app_state, user, user_voucher_id),
    fields(user_id = user.user_id, user_voucher_id = %user_voucher_id)
)]
pub async fn delete_user_voucher_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  user_voucher_id: web::Path<i64>,
) -> Result<HttpResponse> {
  let result = sqlx::query(
    "DELETE FROM user_vouchers WHERE id = $1 AND user_id = $2 AND (is_used = TRUE OR expires_at < $3)",
  )
  .bind(*user_voucher_id)
  .bind(user.user_id)
  .bind(Utc::now())
  .execute(&app_state.db_pool)
  .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::Forbidden(
      "This voucher cannot be removed. It may still be valid or may not belong to you.".to_string(),
    ));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Voucher removed from your wallet" })))
}
