// bistro_server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::db::is_foreign_key_violation;
use crate::errors::{AppError, Result};
use crate::models::{CartItemPayload, CartLine, CartQuantityPayload};
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[instrument(name = "handler::get_cart", skip(app_state, user), fields(user_id = user.user_id))]
pub async fn get_cart_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse> {
  let lines: Vec<CartLine> = sqlx::query_as(
    "SELECT p.id AS product_id, p.name, p.slug, p.image, p.price, c.quantity, p.quantity AS available \
     FROM carts c JOIN products p ON p.id = c.product_id \
     WHERE c.user_id = $1 ORDER BY p.name",
  )
  .bind(user.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(lines))
}

/// Adds to the line if the product is already in the cart.
#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, user, req_payload),
    fields(user_id = user.user_id, product_id = req_payload.product_id, quantity = req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req_payload: web::Json<CartItemPayload>,
) -> Result<HttpResponse> {
  if req_payload.quantity <= 0 {
    return Err(AppError::Validation("Quantity must be positive".to_string()));
  }
  sqlx::query(
    "INSERT INTO carts (user_id, product_id, quantity) VALUES ($1, $2, $3) \
     ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = carts.quantity + EXCLUDED.quantity",
  )
  .bind(user.user_id)
  .bind(req_payload.product_id)
  .bind(req_payload.quantity)
  .execute(&app_state.db_pool)
  .await
  .map_err(|e| {
    if is_foreign_key_violation(&e) {
      AppError::NotFound(format!("Product not found: ID {}", req_payload.product_id))
    } else {
      AppError::Sqlx(e)
    }
  })?;

  info!("Cart line added.");
  Ok(HttpResponse::Created().json(json!({ "message": "Added to cart" })))
}

/// A quantity of zero or less removes the line.
#[instrument(
    name = "handler::update_cart_item",
    skip(app_state, user, product_id, req_payload),
    fields(user_id = user.user_id, product_id = %product_id, quantity = req_payload.quantity)
)]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  product_id: web::Path<i64>,
  req_payload: web::Json<CartQuantityPayload>,
) -> Result<HttpResponse> {
  if req_payload.quantity <= 0 {
    delete_line(&app_state, user.user_id, *product_id).await?;
    return Ok(HttpResponse::NoContent().finish());
  }
  let result = sqlx::query("UPDATE carts SET quantity = $1 WHERE user_id = $2 AND product_id = $3")
    .bind(req_payload.quantity)
    .bind(user.user_id)
    .bind(*product_id)
    .execute(&app_state.db_pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Product is not in your cart".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Cart updated" })))
}

#[instrument(
    name = "handler::remove_from_cart",
    skip(app_state, user, product_id),
    fields(user_id = user.user_id, product_id = %product_id)
)]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  product_id: web::Path<i64>,
) -> Result<HttpResponse> {
  delete_line(&app_state, user.user_id, *product_id).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::clear_cart", skip(app_state, user), fields(user_id = user.user_id))]
pub async fn clear_cart_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse> {
  sqlx::query("DELETE FROM carts WHERE user_id = $1")
    .bind(user.user_id)
    .execute(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

async fn delete_line(app_state: &AppState, user_id: i64, product_id: i64) -> Result<()> {
  sqlx::query("DELETE FROM carts WHERE user_id = $1 AND product_id = $2")
    .bind(user_id)
    .bind(product_id)
    .execute(&app_state.db_pool)
    .await?;
  Ok(())
}
