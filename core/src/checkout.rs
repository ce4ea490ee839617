// bistro-core/src/checkout.rs

//! Checkout: prices the cart, applies a voucher, creates the order and, depending on the
//! path, reserves stock or registers the payment with the gateway. One transaction end to end.

use crate::domain::{
  stock_effect, CheckoutPath, Customer, LineRequest, NewOrder, OrderStatus, PricedLine, StockEffect, StockTrigger,
};
use crate::error::{CommerceError, CommerceResult};
use crate::gateway::{PaymentGateway, PaymentRedirect, PaymentRequest};
use crate::ledger;
use crate::pipeline::{Pipeline, PipelineControl, PipelineResult, SkipCondition, StepFuture};
use crate::store::{CommerceStore, StoreTx};
use crate::vouchers::{self, PricedVoucher};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
  pub path: CheckoutPath,
  pub customer: Customer,
  pub items: Vec<LineRequest>,
  pub user_voucher_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
  pub order_id: i64,
  pub status: OrderStatus,
  pub subtotal: i64,
  pub discount_amount: i64,
  pub total_amount: i64,
  pub stock_deducted: bool,
  pub payment: Option<PaymentRedirectView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRedirectView {
  pub pay_url: String,
  pub order_reference: String,
}

impl From<PaymentRedirect> for PaymentRedirectView {
  fn from(redirect: PaymentRedirect) -> Self {
    Self {
      pay_url: redirect.pay_url,
      order_reference: redirect.order_reference,
    }
  }
}

pub struct CheckoutContext {
  tx: Box<dyn StoreTx>,
  gateway: Arc<dyn PaymentGateway>,
  now: DateTime<Utc>,
  request: CheckoutRequest,
  lines: Vec<PricedLine>,
  subtotal: i64,
  voucher: Option<PricedVoucher>,
  stock_deducted: bool,
  order_id: Option<i64>,
  redirect: Option<PaymentRedirect>,
}

impl CheckoutContext {
  fn total_amount(&self) -> i64 {
    self.subtotal - self.discount_amount()
  }

  fn discount_amount(&self) -> i64 {
    self.voucher.map_or(0, |v| v.discount)
  }

  fn capture_effect(&self) -> StockEffect {
    let trigger = if self.request.path.captures_payment() {
      StockTrigger::PaymentCaptured
    } else {
      StockTrigger::StatusChange(self.request.path.initial_status())
    };
    stock_effect(false, trigger)
  }

  fn order_id(&self) -> CommerceResult<i64> {
    self.order_id.ok_or_else(|| {
      CommerceError::storage(anyhow::anyhow!("checkout step ran before the order row was created"))
    })
  }
}

fn skip_when<F>(predicate: F) -> Option<SkipCondition<CheckoutContext>>
where
  F: Fn(&CheckoutContext) -> bool + Send + Sync + 'static,
{
  Some(Arc::new(predicate))
}

pub fn build_pipeline() -> Pipeline<CheckoutContext, CommerceError> {
  let mut pipeline = Pipeline::<CheckoutContext, CommerceError>::new(
    "checkout",
    &[
      ("validate_request", None),
      ("price_lines", None),
      ("apply_voucher", skip_when(|ctx| ctx.request.user_voucher_id.is_none())),
      ("reserve_stock", skip_when(|ctx| ctx.capture_effect() != StockEffect::Deduct)),
      ("create_order", None),
      ("consume_voucher", skip_when(|ctx| ctx.voucher.is_none())),
      ("clear_cart", skip_when(|ctx| ctx.request.customer.user_id.is_none())),
      ("request_payment", skip_when(|ctx| ctx.request.path != CheckoutPath::Gateway)),
    ],
  );
  pipeline
    .on("validate_request", validate_request)
    .on("price_lines", price_lines)
    .on("apply_voucher", apply_voucher)
    .on("reserve_stock", reserve_stock)
    .on("create_order", create_order)
    .on("consume_voucher", consume_voucher)
    .on("clear_cart", clear_cart)
    .on("request_payment", request_payment);
  pipeline
}

fn validate_request(ctx: &mut CheckoutContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    if ctx.request.items.is_empty() {
      return Err(CommerceError::Validation("cart is empty".to_string()));
    }
    if let Some(line) = ctx.request.items.iter().find(|l| l.quantity <= 0) {
      return Err(CommerceError::Validation(format!(
        "quantity for product ID {} must be positive",
        line.product_id
      )));
    }
    let customer = &ctx.request.customer;
    if customer.name.trim().is_empty() || customer.phone.trim().is_empty() || customer.shipping_address.trim().is_empty()
    {
      return Err(CommerceError::Validation(
        "customer name, phone and shipping address are required".to_string(),
      ));
    }
    Ok(PipelineControl::Continue)
  })
}

/// Sum of the line totals; an order worth more than `i64::MAX` minor units is refused.
fn subtotal_of(lines: &[PricedLine]) -> CommerceResult<i64> {
  lines
    .iter()
    .try_fold(0i64, |acc, line| {
      line
        .unit_price
        .checked_mul(i64::from(line.quantity))
        .and_then(|total| acc.checked_add(total))
    })
    .ok_or_else(|| CommerceError::Validation("order total is too large".to_string()))
}

fn price_lines(ctx: &mut CheckoutContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let lines = ledger::check_availability(ctx.tx.as_mut(), &ctx.request.items).await?;
    ctx.subtotal = subtotal_of(&lines)?;
    ctx.lines = lines;
    Ok(PipelineControl::Continue)
  })
}

fn apply_voucher(ctx: &mut CheckoutContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let Some(user_voucher_id) = ctx.request.user_voucher_id else {
      return Ok(PipelineControl::Continue);
    };
    // Guests own no claims.
    let user_id = ctx.request.customer.user_id.ok_or(CommerceError::VoucherNotFound)?;
    let priced = vouchers::validate_and_price(ctx.tx.as_mut(), user_voucher_id, user_id, ctx.subtotal, ctx.now).await?;
    ctx.voucher = Some(priced);
    Ok(PipelineControl::Continue)
  })
}

fn reserve_stock(ctx: &mut CheckoutContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    ledger::reserve_lines(ctx.tx.as_mut(), &ctx.lines).await?;
    ctx.stock_deducted = true;
    Ok(PipelineControl::Continue)
  })
}

fn create_order(ctx: &mut CheckoutContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let customer = &ctx.request.customer;
    let order = NewOrder {
      user_id: customer.user_id,
      customer_name: customer.name.clone(),
      customer_phone: customer.phone.clone(),
      shipping_address: customer.shipping_address.clone(),
      total_amount: ctx.total_amount(),
      discount_amount: ctx.discount_amount(),
      status: ctx.request.path.initial_status(),
      applied_voucher_id: ctx.voucher.map(|v| v.user_voucher_id),
      stock_deducted: ctx.stock_deducted,
    };
    let order_id = ctx.tx.insert_order(&order).await?;
    for line in &ctx.lines {
      ctx.tx.insert_order_item(order_id, line).await?;
    }
    ctx.order_id = Some(order_id);
    info!(order_id, status = %order.status, total_amount = order.total_amount, "Order row created.");
    Ok(PipelineControl::Continue)
  })
}

fn consume_voucher(ctx: &mut CheckoutContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    if let Some(voucher) = ctx.voucher {
      vouchers::consume(ctx.tx.as_mut(), voucher.user_voucher_id).await?;
    }
    Ok(PipelineControl::Continue)
  })
}

fn clear_cart(ctx: &mut CheckoutContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    if let Some(user_id) = ctx.request.customer.user_id {
      ctx.tx.clear_cart(user_id).await?;
    }
    Ok(PipelineControl::Continue)
  })
}

fn request_payment(ctx: &mut CheckoutContext) -> StepFuture<'_, CommerceError> {
  Box::pin(async move {
    let request = PaymentRequest {
      order_id: ctx.order_id()?,
      amount: ctx.total_amount(),
    };
    let redirect = ctx.gateway.create_payment(&request).await?;
    info!(order_reference = %redirect.order_reference, "Gateway payment registered.");
    ctx.redirect = Some(redirect);
    Ok(PipelineControl::Continue)
  })
}

/// Runs the checkout pipeline inside a fresh transaction and commits it on success.
#[instrument(
  name = "checkout::execute",
  skip_all,
  fields(path = ?request.path, user_id = ?request.customer.user_id, lines = request.items.len()),
  err(Display)
)]
pub async fn execute(
  pipeline: &Pipeline<CheckoutContext, CommerceError>,
  store: &dyn CommerceStore,
  gateway: Arc<dyn PaymentGateway>,
  request: CheckoutRequest,
  now: DateTime<Utc>,
) -> CommerceResult<CheckoutReceipt> {
  let mut ctx = CheckoutContext {
    tx: store.begin().await?,
    gateway,
    now,
    request,
    lines: Vec::new(),
    subtotal: 0,
    voucher: None,
    stock_deducted: false,
    order_id: None,
    redirect: None,
  };

  match pipeline.run(&mut ctx).await? {
    PipelineResult::Completed => {}
    PipelineResult::Stopped => {
      return Err(CommerceError::storage(anyhow::anyhow!("checkout pipeline halted before the order was placed")));
    }
  }

  let receipt = CheckoutReceipt {
    order_id: ctx.order_id()?,
    status: ctx.request.path.initial_status(),
    subtotal: ctx.subtotal,
    discount_amount: ctx.discount_amount(),
    total_amount: ctx.total_amount(),
    stock_deducted: ctx.stock_deducted,
    payment: ctx.redirect.take().map(PaymentRedirectView::from),
  };
  ctx.tx.commit().await?;
  info!(order_id = receipt.order_id, status = %receipt.status, "Checkout committed.");
  Ok(receipt)
}
