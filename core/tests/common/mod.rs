// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper.

use async_trait::async_trait;
use bistro_core::domain::{
  CheckoutPath, Customer, DiscountType, LineRequest, NewClaim, OrderReference, VoucherTemplate,
};
use bistro_core::{
  CheckoutRequest, CommerceError, CommerceResult, MemoryStore, OrderWorkflows, PaymentGateway, PaymentRedirect,
  PaymentRequest, WorkflowSettings,
};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;

pub const PREFIX: &str = "BISTROBLISS";
pub const ALICE: i64 = 1001;
pub const BOB: i64 = 1002;

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Gateway double ---
#[derive(Default)]
pub struct RecordingGateway {
  pub requests: Mutex<Vec<PaymentRequest>>,
  fail: AtomicBool,
  counter: AtomicUsize,
}

impl RecordingGateway {
  pub fn failing() -> Self {
    let gateway = Self::default();
    gateway.fail.store(true, Ordering::SeqCst);
    gateway
  }

  pub fn last_request(&self) -> Option<PaymentRequest> {
    self.requests.lock().last().cloned()
  }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
  async fn create_payment(&self, request: &PaymentRequest) -> CommerceResult<PaymentRedirect> {
    self.requests.lock().push(request.clone());
    if self.fail.load(Ordering::SeqCst) {
      return Err(CommerceError::Gateway("gateway unavailable".to_string()));
    }
    let n = self.counter.fetch_add(1, Ordering::SeqCst);
    let order_reference = OrderReference::new(request.order_id, format!("req{}", n)).format(PREFIX);
    Ok(PaymentRedirect {
      pay_url: format!("https://pay.example/{}", order_reference),
      order_reference,
    })
  }
}

// --- Fixtures ---
pub struct Fixture {
  pub store: MemoryStore,
  pub gateway: Arc<RecordingGateway>,
  pub workflows: Arc<OrderWorkflows>,
}

pub fn fixture_with_gateway(gateway: RecordingGateway) -> Fixture {
  let store = MemoryStore::new();
  let gateway = Arc::new(gateway);
  let workflows = Arc::new(OrderWorkflows::new(
    Arc::new(store.clone()),
    gateway.clone(),
    WorkflowSettings {
      order_ref_prefix: PREFIX.to_string(),
    },
  ));
  Fixture {
    store,
    gateway,
    workflows,
  }
}

pub fn fixture() -> Fixture {
  fixture_with_gateway(RecordingGateway::default())
}

pub fn line(product_id: i64, quantity: i32) -> LineRequest {
  LineRequest { product_id, quantity }
}

pub fn customer(user_id: Option<i64>) -> Customer {
  Customer {
    user_id,
    name: "Nguyen Van A".to_string(),
    phone: "0901234567".to_string(),
    shipping_address: "12 Le Loi, District 1".to_string(),
  }
}

pub fn checkout_request(
  path: CheckoutPath,
  user_id: Option<i64>,
  items: Vec<LineRequest>,
  user_voucher_id: Option<i64>,
) -> CheckoutRequest {
  CheckoutRequest {
    path,
    customer: customer(user_id),
    items,
    user_voucher_id,
  }
}

/// A voucher whose hunt window is open around `now`, valid for a week after claiming.
pub fn open_voucher(id: i64, discount_type: DiscountType, discount_value: i64, now: DateTime<Utc>) -> VoucherTemplate {
  VoucherTemplate {
    id,
    code: format!("HUNT{}", id),
    discount_type,
    discount_value,
    hunt_start_time: now - Duration::hours(1),
    hunt_end_time: now + Duration::hours(1),
    valid_duration_days: 7,
  }
}

/// Seeds a template plus a claim of it for `user_id`, returning the claim id.
pub async fn seed_claim(
  store: &MemoryStore,
  user_id: i64,
  template: VoucherTemplate,
  now: DateTime<Utc>,
  is_used: bool,
) -> i64 {
  let voucher_id = template.id;
  let expires_at = template.claim_expiry(now);
  store.put_voucher(template).await;
  store
    .put_claim(
      NewClaim {
        user_id,
        voucher_id,
        claimed_at: now,
        expires_at,
      },
      is_used,
    )
    .await
}

// --- Pipeline engine fixtures ---
#[derive(Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
  pub skip_middle: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("pipeline error: {0}")]
  Pipeline(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<bistro_core::PipelineError> for TestError {
  fn from(err: bistro_core::PipelineError) -> Self {
    TestError::Pipeline(err.to_string())
  }
}

/// Shared body of the simple step handlers: records the step and appends its marker.
pub fn record_step(ctx: &mut TestContext, step_name: &str, marker: &str) -> bistro_core::PipelineControl {
  ctx.counter += 1;
  ctx.message.push_str(marker);
  ctx.steps_executed.push(step_name.to_string());
  tracing::debug!(target: "test_handlers", step = step_name, counter = ctx.counter, "executed");
  if ctx.should_stop_at.as_deref() == Some(step_name) {
    bistro_core::PipelineControl::Stop
  } else {
    bistro_core::PipelineControl::Continue
  }
}
