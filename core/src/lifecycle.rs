// bistro-core/src/lifecycle.rs

//! Admin-driven order status transitions and their inventory side effects.

use crate::domain::{stock_effect, OrderLock, OrderStatus, StockEffect, StockTrigger};
use crate::error::{CommerceError, CommerceResult};
use crate::ledger;
use crate::pipeline::{Pipeline, PipelineControl, PipelineResult, StepFuture};
use crate::store::{CommerceStore, StoreTx};
use serde::Serialize;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
  pub order_id: i64,
  pub from: OrderStatus,
  pub to: OrderStatus,
  pub stock_effect: StockEffect,
}

pub struct StatusUpdateContext {
  tx: Box<dyn StoreTx>,
  order_id: i64,
  target: OrderStatus,
  order: Option<OrderLock>,
  effect: StockEffect,
}

impl StatusUpdateContext {
  fn locked(&self) -> CommerceResult<OrderLock> {
    self.order.ok_or(CommerceError::OrderNotFound(self.order_id))
  }
}

pub fn build_pipeline() -> Pipeline<StatusUpdateContext, CommerceError> {
  let mut pipeline = Pipeline::<StatusUpdateContext, CommerceError>::new(
    "order_status_update",
    &[
      ("lock_order", None),
      ("check_transition", None),
      ("apply_stock_effect", None),
      ("persist_status", None),
    ],
  );
  pipeline
    .on("lock_order", lock_order)
    .on("check_transition", check_transition)
    .on("apply_stock_effect", apply_stock_effect)
    .on("persist_status", persist_status);
  pipeline
}

fn lock_order(ctx: &mut StatusUpdateContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let order = ctx
      .tx
      .lock_order(ctx.order_id)
      .await?
      .ok_or(CommerceError::OrderNotFound(ctx.order_id))?;
    ctx.order = Some(order);
    Ok(PipelineControl::Continue)
  })
}

fn check_transition(ctx: &mut StatusUpdateContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let order = ctx.locked()?;
    if order.status == ctx.target {
      info!(status = %order.status, "Order already has the requested status.");
      return Ok(PipelineControl::Stop);
    }
    if !order.status.can_transition_to(ctx.target) {
      return Err(CommerceError::InvalidTransition {
        from: order.status,
        to: ctx.target,
      });
    }
    ctx.effect = stock_effect(order.stock_deducted, StockTrigger::StatusChange(ctx.target));
    Ok(PipelineControl::Continue)
  })
}

fn apply_stock_effect(ctx: &mut StatusUpdateContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    if ctx.effect == StockEffect::Unchanged {
      return Ok(PipelineControl::Continue);
    }
    let lines = ctx.tx.order_lines(ctx.order_id).await?;
    ledger::apply_effect(ctx.tx.as_mut(), ctx.effect, &lines).await?;
    info!(effect = ?ctx.effect, lines = lines.len(), "Inventory adjusted for status change.");
    Ok(PipelineControl::Continue)
  })
}

fn persist_status(ctx: &mut StatusUpdateContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let order = ctx.locked()?;
    let deducted = ctx.effect.deducted_after(order.stock_deducted);
    ctx.tx.update_order_state(ctx.order_id, ctx.target, deducted).await?;
    Ok(PipelineControl::Continue)
  })
}

/// Moves `order_id` to `target` in one transaction, reserving or restoring stock as needed.
///
/// Setting the status the order already has succeeds without touching anything.
#[instrument(name = "lifecycle::update_status", skip(pipeline, store), err(Display))]
pub async fn execute(
  pipeline: &Pipeline<StatusUpdateContext, CommerceError>,
  store: &dyn CommerceStore,
  order_id: i64,
  target: OrderStatus,
) -> CommerceResult<StatusChange> {
  let mut ctx = StatusUpdateContext {
    tx: store.begin().await?,
    order_id,
    target,
    order: None,
    effect: StockEffect::Unchanged,
  };

  let result = pipeline.run(&mut ctx).await?;
  let from = ctx.locked()?.status;
  if result == PipelineResult::Completed {
    ctx.tx.commit().await?;
    info!(%from, to = %target, effect = ?ctx.effect, "Order status updated.");
  }

  Ok(StatusChange {
    order_id,
    from,
    to: target,
    stock_effect: ctx.effect,
  })
}
