// bistro_server/src/web/handlers/payment_handlers.rs

//! Payment checkouts (MoMo redirect, bank transfer, demo capture) and the MoMo IPN webhook.

use actix_web::{web, HttpResponse};
use bistro_core::domain::CheckoutPath;
use bistro_core::ReconcileOutcome;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::models::CheckoutPayload;
use crate::services::momo::MomoIpn;
use crate::state::AppState;
use crate::web::handlers::order_handlers::run_checkout;
use crate::web::MaybeUser;

/// Creates a `pending_payment` order and returns the gateway page to send the customer to.
/// A gateway failure rolls the order back.
#[instrument(name = "handler::momo_payment", skip(app_state, user, req_payload), fields(user_id = ?user.user_id()))]
pub async fn momo_payment_handler(
  app_state: web::Data<AppState>,
  user: MaybeUser,
  req_payload: web::Json<CheckoutPayload>,
) -> Result<HttpResponse> {
  let receipt = run_checkout(&app_state, CheckoutPath::Gateway, req_payload.into_inner(), &user).await?;
  let payment = receipt
    .payment
    .ok_or_else(|| AppError::Internal(format!("Gateway checkout of order {} returned no redirect", receipt.order_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "payUrl": payment.pay_url })))
}

/// Creates a `pending` order to be paid by bank transfer; the client shows the amount and
/// the transfer note the admin matches against.
#[instrument(name = "handler::bank_transfer_payment", skip(app_state, user, req_payload), fields(user_id = ?user.user_id()))]
pub async fn bank_transfer_handler(
  app_state: web::Data<AppState>,
  user: MaybeUser,
  req_payload: web::Json<CheckoutPayload>,
) -> Result<HttpResponse> {
  let receipt = run_checkout(&app_state, CheckoutPath::BankTransfer, req_payload.into_inner(), &user).await?;
  Ok(HttpResponse::Ok().json(json!({
      "orderId": receipt.order_id,
      "amount": receipt.total_amount,
      "transferContent": format!("{} {}", app_state.config.order_ref_prefix, receipt.order_id),
  })))
}

/// Demo capture: the order is created `paid` and its stock is taken immediately.
#[instrument(name = "handler::demo_payment", skip(app_state, user, req_payload), fields(user_id = ?user.user_id()))]
pub async fn demo_payment_handler(
  app_state: web::Data<AppState>,
  user: MaybeUser,
  req_payload: web::Json<CheckoutPayload>,
) -> Result<HttpResponse> {
  let receipt = run_checkout(&app_state, CheckoutPath::ImmediateCapture, req_payload.into_inner(), &user).await?;
  Ok(HttpResponse::Created().json(json!({
      "success": true,
      "order_id": receipt.order_id,
      "message": "Order placed successfully (demo payment)",
  })))
}

/// MoMo IPN. Replays and late notifications are acknowledged without touching the order.
#[instrument(
    name = "handler::momo_webhook",
    skip(app_state, req_payload),
    fields(order_ref = %req_payload.order_id, result_code = req_payload.result_code)
)]
pub async fn momo_webhook_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<MomoIpn>,
) -> Result<HttpResponse> {
  let ipn = req_payload.into_inner();
  if app_state.momo.verifies_ipn() && !app_state.momo.verify_ipn(&ipn) {
    warn!("Rejected IPN with a bad signature.");
    return Err(AppError::Auth("Invalid signature".to_string()));
  }

  match app_state.workflows.reconcile(ipn.notification()).await? {
    ReconcileOutcome::Captured { order_id } => info!(order_id, "Payment captured."),
    ReconcileOutcome::Cancelled {
      order_id,
      voucher_released,
    } => info!(order_id, voucher_released, "Payment failed, order cancelled."),
    ReconcileOutcome::AlreadySettled { order_id, status } => {
      info!(order_id, %status, "Notification for a settled order ignored.")
    }
  }
  Ok(HttpResponse::NoContent().finish())
}
