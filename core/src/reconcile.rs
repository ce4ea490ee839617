// bistro-core/src/reconcile.rs

//! Settles gateway orders from the gateway's asynchronous payment notification.
//!
//! Gateways may deliver a notification more than once. Only an order still in
//! `pending_payment` is touched; anything else is acknowledged as already settled.

use crate::domain::{stock_effect, OrderLock, OrderReference, OrderStatus, StockEffect, StockTrigger};
use crate::error::{CommerceError, CommerceResult};
use crate::ledger;
use crate::pipeline::{Pipeline, PipelineControl, StepFuture};
use crate::store::{CommerceStore, StoreTx};
use crate::vouchers;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Gateway result code meaning the payment succeeded.
pub const RESULT_CODE_SUCCESS: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
  pub order_reference: String,
  pub result_code: i64,
}

impl PaymentNotification {
  pub fn is_success(&self) -> bool {
    self.result_code == RESULT_CODE_SUCCESS
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
  Captured { order_id: i64 },
  Cancelled { order_id: i64, voucher_released: bool },
  /// Replay or late notification for an order that has already left `pending_payment`.
  AlreadySettled { order_id: i64, status: OrderStatus },
}

pub struct ReconcileContext {
  tx: Box<dyn StoreTx>,
  prefix: String,
  notification: PaymentNotification,
  order_id: Option<i64>,
  order: Option<OrderLock>,
  outcome: Option<ReconcileOutcome>,
}

impl ReconcileContext {
  fn locked(&self) -> CommerceResult<OrderLock> {
    self
      .order
      .ok_or_else(|| CommerceError::OrderNotFound(self.order_id.unwrap_or_default()))
  }
}

pub fn build_pipeline() -> Pipeline<ReconcileContext, CommerceError> {
  let mut pipeline = Pipeline::<ReconcileContext, CommerceError>::new(
    "payment_reconciliation",
    &[
      ("parse_reference", None),
      ("lock_order", None),
      ("check_pending", None),
      ("apply_outcome", None),
    ],
  );
  pipeline
    .on("parse_reference", parse_reference)
    .on("lock_order", lock_order)
    .on("check_pending", check_pending)
    .on("apply_outcome", apply_outcome);
  pipeline
}

fn parse_reference(ctx: &mut ReconcileContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let reference = OrderReference::parse(&ctx.notification.order_reference, &ctx.prefix)?;
    ctx.order_id = Some(reference.order_id);
    Ok(PipelineControl::Continue)
  })
}

fn lock_order(ctx: &mut ReconcileContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let order_id = ctx.order_id.unwrap_or_default();
    let order = ctx
      .tx
      .lock_order(order_id)
      .await?
      .ok_or(CommerceError::OrderNotFound(order_id))?;
    ctx.order = Some(order);
    Ok(PipelineControl::Continue)
  })
}

fn check_pending(ctx: &mut ReconcileContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let order = ctx.locked()?;
    if order.status != OrderStatus::PendingPayment {
      info!(order_id = order.order_id, status = %order.status, "Notification for a settled order ignored.");
      ctx.outcome = Some(ReconcileOutcome::AlreadySettled {
        order_id: order.order_id,
        status: order.status,
      });
      return Ok(PipelineControl::Stop);
    }
    Ok(PipelineControl::Continue)
  })
}

fn apply_outcome(ctx: &mut ReconcileContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let order = ctx.locked()?;
    let (target, trigger) = if ctx.notification.is_success() {
      (OrderStatus::Paid, StockTrigger::PaymentCaptured)
    } else {
      (OrderStatus::Cancelled, StockTrigger::StatusChange(OrderStatus::Cancelled))
    };

    let effect = stock_effect(order.stock_deducted, trigger);
    if effect != StockEffect::Unchanged {
      let lines = ctx.tx.order_lines(order.order_id).await?;
      ledger::apply_effect(ctx.tx.as_mut(), effect, &lines).await?;
    }
    ctx
      .tx
      .update_order_state(order.order_id, target, effect.deducted_after(order.stock_deducted))
      .await?;

    ctx.outcome = Some(if ctx.notification.is_success() {
      ReconcileOutcome::Captured {
        order_id: order.order_id,
      }
    } else {
      let voucher_released = match order.applied_voucher_id {
        Some(user_voucher_id) => {
          vouchers::release(ctx.tx.as_mut(), user_voucher_id).await?;
          true
        }
        None => false,
      };
      warn!(
        order_id = order.order_id,
        result_code = ctx.notification.result_code,
        voucher_released,
        "Gateway reported a failed payment; order cancelled."
      );
      ReconcileOutcome::Cancelled {
        order_id: order.order_id,
        voucher_released,
      }
    });
    Ok(PipelineControl::Continue)
  })
}

/// Applies one gateway notification. Commits when the order was settled by this call.
#[instrument(
  name = "reconcile::execute",
  skip(pipeline, store, prefix, notification),
  fields(order_reference = %notification.order_reference, result_code = notification.result_code),
  err(Display)
)]
pub async fn execute(
  pipeline: &Pipeline<ReconcileContext, CommerceError>,
  store: &dyn CommerceStore,
  prefix: &str,
  notification: PaymentNotification,
) -> CommerceResult<ReconcileOutcome> {
  let mut ctx = ReconcileContext {
    tx: store.begin().await?,
    prefix: prefix.to_string(),
    notification,
    order_id: None,
    order: None,
    outcome: None,
  };

  pipeline.run(&mut ctx).await?;
  let outcome = ctx.outcome.ok_or_else(|| {
    CommerceError::storage(anyhow::anyhow!("reconciliation finished without recording an outcome"))
  })?;
  if !matches!(outcome, ReconcileOutcome::AlreadySettled { .. }) {
    ctx.tx.commit().await?;
  }
  info!(?outcome, "Payment notification processed.");
  Ok(outcome)
}
