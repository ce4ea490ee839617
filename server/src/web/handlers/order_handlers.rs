// bistro_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use bistro_core::domain::{CheckoutPath, Customer, OrderStatus};
use bistro_core::{CheckoutReceipt, CheckoutRequest};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::errors::{AppError, Result};
use crate::models::order::{ORDER_SUMMARY_COLUMNS, ORDER_SUMMARY_JOINS};
use crate::models::{CheckoutPayload, OrderItemView, OrderSummary, OrderWithItems};
use crate::state::AppState;
use crate::web::{AuthenticatedUser, MaybeUser};

/// Turns a checkout body into a workflow request. The account comes from the token only.
pub(crate) fn checkout_request(path: CheckoutPath, payload: CheckoutPayload, user: &MaybeUser) -> Result<CheckoutRequest> {
  let name = payload.customer_name.trim();
  let phone = payload.customer_phone.trim();
  let address = payload.shipping_address.trim();
  if name.is_empty() || phone.is_empty() || address.is_empty() {
    return Err(AppError::Validation(
      "Customer name, phone and shipping address are required".to_string(),
    ));
  }
  Ok(CheckoutRequest {
    path,
    customer: Customer {
      user_id: user.user_id(),
      name: name.to_string(),
      phone: phone.to_string(),
      shipping_address: address.to_string(),
    },
    items: payload.cart_items,
    user_voucher_id: payload.applied_user_voucher_id,
  })
}

/// Runs checkout for `path` and logs the receipt.
pub(crate) async fn run_checkout(
  app_state: &AppState,
  path: CheckoutPath,
  payload: CheckoutPayload,
  user: &MaybeUser,
) -> Result<CheckoutReceipt> {
  let request = checkout_request(path, payload, user)?;
  let receipt = app_state.workflows.checkout(request, Utc::now()).await?;
  info!(
    order_id = receipt.order_id,
    status = %receipt.status,
    total_amount = receipt.total_amount,
    discount_amount = receipt.discount_amount,
    "Checkout completed."
  );
  Ok(receipt)
}

/// Direct (cash on delivery) order placement.
#[instrument(name = "handler::create_order", skip(app_state, user, req_payload), fields(user_id = ?user.user_id()))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  user: MaybeUser,
  req_payload: web::Json<CheckoutPayload>,
) -> Result<HttpResponse> {
  let receipt = run_checkout(&app_state, CheckoutPath::Direct, req_payload.into_inner(), &user).await?;
  Ok(HttpResponse::Created().json(json!({
      "order_id": receipt.order_id,
      "message": "Order placed successfully",
  })))
}

/// Status lookup used by the payment result page; needs only the order id.
#[instrument(name = "handler::order_status", skip(app_state, order_id), fields(order_id = %order_id))]
pub async fn order_status_handler(app_state: web::Data<AppState>, order_id: web::Path<i64>) -> Result<HttpResponse> {
  let row: Option<(i64, OrderStatus, i64, String)> =
    sqlx::query_as("SELECT id, status, total_amount, customer_name FROM orders WHERE id = $1")
      .bind(*order_id)
      .fetch_optional(&app_state.db_pool)
      .await?;
  let (id, status, total_amount, customer_name) =
    row.ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
      "id": id,
      "status": status,
      "total_amount": total_amount,
      "customer_name": customer_name,
  })))
}

#[instrument(name = "handler::user_orders", skip(app_state, user), fields(user_id = user.user_id))]
pub async fn user_orders_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse> {
  let orders: Vec<OrderSummary> = sqlx::query_as(&format!(
    "SELECT {} {} WHERE o.user_id = $1 ORDER BY o.created_at DESC",
    ORDER_SUMMARY_COLUMNS, ORDER_SUMMARY_JOINS
  ))
  .bind(user.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(
    name = "handler::user_order_details",
    skip(app_state, user, order_id),
    fields(user_id = user.user_id, order_id = %order_id)
)]
pub async fn user_order_details_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  order_id: web::Path<i64>,
) -> Result<HttpResponse> {
  let order = load_order_with_items(&app_state.db_pool, *order_id, Some(user.user_id))
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found or you do not have permission to view it".to_string()))?;
  Ok(HttpResponse::Ok().json(order))
}

/// Loads an order and its lines. With `owner`, orders of other users read as missing.
pub(crate) async fn load_order_with_items(
  pool: &PgPool,
  order_id: i64,
  owner: Option<i64>,
) -> Result<Option<OrderWithItems>> {
  let order: Option<OrderSummary> = sqlx::query_as(&format!(
    "SELECT {} {} WHERE o.id = $1 AND ($2::BIGINT IS NULL OR o.user_id = $2)",
    ORDER_SUMMARY_COLUMNS, ORDER_SUMMARY_JOINS
  ))
  .bind(order_id)
  .bind(owner)
  .fetch_optional(pool)
  .await?;
  let Some(order) = order else {
    return Ok(None);
  };

  let items: Vec<OrderItemView> = sqlx::query_as(
    "SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, p.image AS product_image, \
     oi.quantity, oi.price_at_purchase \
     FROM order_items oi JOIN products p ON p.id = oi.product_id \
     WHERE oi.order_id = $1 ORDER BY oi.id",
  )
  .bind(order_id)
  .fetch_all(pool)
  .await?;
  Ok(Some(OrderWithItems { order, items }))
}
