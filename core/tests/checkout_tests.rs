// tests/checkout_tests.rs
mod common;

use bistro_core::domain::{CheckoutPath, DiscountType, OrderStatus};
use bistro_core::CommerceError;
use chrono::{Duration, Utc};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_fixed_voucher_reduces_total_and_is_consumed() {
  setup_tracing();
  let f = fixture();
  let now = Utc::now();
  f.store.put_product(7, 50_000, 10).await;
  f.store.put_cart_item(ALICE, 7, 2).await;
  let claim_id = seed_claim(&f.store, ALICE, open_voucher(1, DiscountType::FixedAmount, 20_000, now), now, false).await;

  let receipt = f
    .workflows
    .checkout(
      checkout_request(CheckoutPath::Direct, Some(ALICE), vec![line(7, 2)], Some(claim_id)),
      now,
    )
    .await
    .unwrap();

  assert_eq!(receipt.subtotal, 100_000);
  assert_eq!(receipt.total_amount, 80_000);
  assert_eq!(receipt.discount_amount, 20_000);
  assert_eq!(receipt.status, OrderStatus::Pending);

  let state = f.store.snapshot().await;
  let order = state.order(receipt.order_id).unwrap();
  assert_eq!(order.details.total_amount, 80_000);
  assert_eq!(order.details.discount_amount, 20_000);
  assert_eq!(order.details.applied_voucher_id, Some(claim_id));
  assert_eq!(order.items.len(), 1);
  assert_eq!(order.items[0].unit_price, 50_000);
  assert!(state.claim(claim_id).unwrap().is_used);
  assert_eq!(state.cart_len(ALICE), 0, "checkout empties the customer's cart");
  // Direct orders defer the deduction until they ship.
  assert_eq!(state.product_quantity(7), Some(10));
  assert!(!order.details.stock_deducted);
}

#[tokio::test]
#[serial]
async fn test_percentage_voucher_rounds_down() {
  setup_tracing();
  let f = fixture();
  let now = Utc::now();
  f.store.put_product(3, 33_333, 5).await;
  let claim_id = seed_claim(&f.store, ALICE, open_voucher(2, DiscountType::Percentage, 15, now), now, false).await;

  let receipt = f
    .workflows
    .checkout(
      checkout_request(CheckoutPath::Direct, Some(ALICE), vec![line(3, 1)], Some(claim_id)),
      now,
    )
    .await
    .unwrap();

  assert_eq!(receipt.discount_amount, 4_999);
  assert_eq!(receipt.total_amount, 28_334);
}

#[tokio::test]
#[serial]
async fn test_immediate_capture_reserves_stock_at_creation() {
  setup_tracing();
  let f = fixture();
  f.store.put_product(7, 50_000, 5).await;
  f.store.put_product(8, 10_000, 5).await;

  let receipt = f
    .workflows
    .checkout(
      checkout_request(CheckoutPath::ImmediateCapture, None, vec![line(7, 2), line(8, 1), line(7, 1)], None),
      Utc::now(),
    )
    .await
    .unwrap();

  assert_eq!(receipt.status, OrderStatus::Paid);
  assert!(receipt.stock_deducted);
  let state = f.store.snapshot().await;
  assert_eq!(state.product_quantity(7), Some(2));
  assert_eq!(state.product_quantity(8), Some(4));
  assert_eq!(state.order(receipt.order_id).unwrap().items.len(), 2, "repeated lines are merged");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_captures_never_oversell() {
  setup_tracing();
  let f = fixture();
  f.store.put_product(7, 50_000, 1).await;

  let mut tasks = tokio::task::JoinSet::new();
  for _ in 0..2 {
    let workflows = f.workflows.clone();
    tasks.spawn(async move {
      workflows
        .checkout(
          checkout_request(CheckoutPath::ImmediateCapture, None, vec![line(7, 1)], None),
          Utc::now(),
        )
        .await
    });
  }

  let mut successes = 0;
  let mut rejections = 0;
  while let Some(joined) = tasks.join_next().await {
    match joined.unwrap() {
      Ok(_) => successes += 1,
      Err(CommerceError::InsufficientStock { product_id }) => {
        assert_eq!(product_id, 7);
        rejections += 1;
      }
      Err(other) => panic!("unexpected error: {}", other),
    }
  }

  assert_eq!((successes, rejections), (1, 1));
  let state = f.store.snapshot().await;
  assert_eq!(state.product_quantity(7), Some(0));
  assert_eq!(state.orders.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_many_concurrent_captures_sell_exactly_the_stock() {
  setup_tracing();
  let f = fixture();
  f.store.put_product(9, 1_000, 5).await;

  let mut tasks = tokio::task::JoinSet::new();
  for _ in 0..12 {
    let workflows = f.workflows.clone();
    tasks.spawn(async move {
      workflows
        .checkout(
          checkout_request(CheckoutPath::ImmediateCapture, None, vec![line(9, 1)], None),
          Utc::now(),
        )
        .await
    });
  }
  let mut successes = 0;
  while let Some(joined) = tasks.join_next().await {
    if joined.unwrap().is_ok() {
      successes += 1;
    }
  }

  assert_eq!(successes, 5);
  assert_eq!(f.store.snapshot().await.product_quantity(9), Some(0));
}

#[tokio::test]
#[serial]
async fn test_one_short_line_aborts_the_whole_order() {
  setup_tracing();
  let f = fixture();
  let now = Utc::now();
  f.store.put_product(1, 10_000, 10).await;
  f.store.put_product(2, 20_000, 1).await;
  f.store.put_cart_item(ALICE, 1, 1).await;
  let claim_id = seed_claim(&f.store, ALICE, open_voucher(3, DiscountType::FixedAmount, 5_000, now), now, false).await;

  let err = f
    .workflows
    .checkout(
      checkout_request(CheckoutPath::ImmediateCapture, Some(ALICE), vec![line(1, 3), line(2, 2)], Some(claim_id)),
      now,
    )
    .await
    .unwrap_err();

  assert!(matches!(err, CommerceError::InsufficientStock { product_id: 2 }));
  assert!(err.to_string().contains("insufficient stock"));
  let state = f.store.snapshot().await;
  assert!(state.orders.is_empty());
  assert_eq!(state.product_quantity(1), Some(10));
  assert!(!state.claim(claim_id).unwrap().is_used);
  assert_eq!(state.cart_len(ALICE), 1);
}

#[tokio::test]
#[serial]
async fn test_unknown_product_and_empty_cart_are_rejected() {
  setup_tracing();
  let f = fixture();

  let err = f
    .workflows
    .checkout(checkout_request(CheckoutPath::Direct, None, vec![line(404, 1)], None), Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, CommerceError::ProductNotFound(404)));
  assert_eq!(err.to_string(), "product not found: ID 404");

  let err = f
    .workflows
    .checkout(checkout_request(CheckoutPath::Direct, None, vec![], None), Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, CommerceError::Validation(_)));

  f.store.put_product(1, 10_000, 10).await;
  let err = f
    .workflows
    .checkout(checkout_request(CheckoutPath::Direct, None, vec![line(1, 0)], None), Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, CommerceError::Validation(_)));
}

#[tokio::test]
#[serial]
async fn test_order_total_overflow_is_rejected() {
  setup_tracing();
  let f = fixture();
  f.store.put_product(1, i64::MAX / 2, 10).await;
  f.store.put_product(2, i64::MAX / 2, 10).await;

  let err = f
    .workflows
    .checkout(
      checkout_request(CheckoutPath::Direct, None, vec![line(1, 2), line(2, 2)], None),
      Utc::now(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, CommerceError::Validation(ref m) if m == "order total is too large"));

  let err = f
    .workflows
    .checkout(checkout_request(CheckoutPath::Direct, None, vec![line(1, 3)], None), Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, CommerceError::Validation(_)));

  let state = f.store.snapshot().await;
  assert!(state.orders.is_empty());
  assert_eq!(state.product_quantity(1), Some(10));
}

#[tokio::test]
#[serial]
async fn test_direct_checkout_checks_availability_without_deducting() {
  setup_tracing();
  let f = fixture();
  f.store.put_product(5, 10_000, 2).await;

  let err = f
    .workflows
    .checkout(checkout_request(CheckoutPath::Direct, None, vec![line(5, 3)], None), Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, CommerceError::InsufficientStock { product_id: 5 }));

  let receipt = f
    .workflows
    .checkout(checkout_request(CheckoutPath::BankTransfer, None, vec![line(5, 2)], None), Utc::now())
    .await
    .unwrap();
  assert_eq!(receipt.status, OrderStatus::Pending);
  assert_eq!(f.store.snapshot().await.product_quantity(5), Some(2));
}

#[tokio::test]
#[serial]
async fn test_voucher_guard_rejections() {
  setup_tracing();
  let f = fixture();
  let now = Utc::now();
  f.store.put_product(7, 50_000, 10).await;
  let used = seed_claim(&f.store, ALICE, open_voucher(10, DiscountType::FixedAmount, 1_000, now), now, true).await;
  let expired = seed_claim(
    &f.store,
    ALICE,
    open_voucher(11, DiscountType::FixedAmount, 1_000, now),
    now - Duration::days(30),
    false,
  )
  .await;
  let bobs = seed_claim(&f.store, BOB, open_voucher(12, DiscountType::FixedAmount, 1_000, now), now, false).await;

  let attempt = |user_id: Option<i64>, claim_id: i64| {
    let workflows = f.workflows.clone();
    async move {
      workflows
        .checkout(
          checkout_request(CheckoutPath::Direct, user_id, vec![line(7, 1)], Some(claim_id)),
          now,
        )
        .await
        .unwrap_err()
    }
  };

  assert!(matches!(attempt(Some(ALICE), used).await, CommerceError::VoucherAlreadyUsed));
  assert!(matches!(attempt(Some(ALICE), expired).await, CommerceError::VoucherExpired));
  assert!(matches!(attempt(Some(ALICE), bobs).await, CommerceError::VoucherNotFound));
  assert!(matches!(attempt(None, bobs).await, CommerceError::VoucherNotFound));
  assert!(f.store.snapshot().await.orders.is_empty());
}

#[tokio::test]
#[serial]
async fn test_voucher_backs_only_one_order() {
  setup_tracing();
  let f = fixture();
  let now = Utc::now();
  f.store.put_product(7, 50_000, 10).await;
  let claim_id = seed_claim(&f.store, ALICE, open_voucher(4, DiscountType::FixedAmount, 20_000, now), now, false).await;
  let request = checkout_request(CheckoutPath::Direct, Some(ALICE), vec![line(7, 1)], Some(claim_id));

  f.workflows.checkout(request.clone(), now).await.unwrap();
  let err = f.workflows.checkout(request, now).await.unwrap_err();

  assert!(matches!(err, CommerceError::VoucherAlreadyUsed));
  assert_eq!(f.store.snapshot().await.orders.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_gateway_checkout_waits_for_payment() {
  setup_tracing();
  let f = fixture();
  f.store.put_product(7, 50_000, 3).await;

  let receipt = f
    .workflows
    .checkout(checkout_request(CheckoutPath::Gateway, Some(ALICE), vec![line(7, 2)], None), Utc::now())
    .await
    .unwrap();

  assert_eq!(receipt.status, OrderStatus::PendingPayment);
  let payment = receipt.payment.expect("gateway checkout returns a redirect");
  assert!(payment.order_reference.starts_with(&format!("{}_{}_", PREFIX, receipt.order_id)));
  assert!(payment.pay_url.starts_with("https://pay.example/"));

  let sent = f.gateway.last_request().unwrap();
  assert_eq!(sent.order_id, receipt.order_id);
  assert_eq!(sent.amount, 100_000);
  assert_eq!(f.store.snapshot().await.product_quantity(7), Some(3));
}

#[tokio::test]
#[serial]
async fn test_gateway_failure_rolls_back_order_creation() {
  setup_tracing();
  let f = fixture_with_gateway(RecordingGateway::failing());
  let now = Utc::now();
  f.store.put_product(7, 50_000, 3).await;
  f.store.put_cart_item(ALICE, 7, 1).await;
  let claim_id = seed_claim(&f.store, ALICE, open_voucher(5, DiscountType::Percentage, 10, now), now, false).await;

  let err = f
    .workflows
    .checkout(
      checkout_request(CheckoutPath::Gateway, Some(ALICE), vec![line(7, 1)], Some(claim_id)),
      now,
    )
    .await
    .unwrap_err();

  assert!(matches!(err, CommerceError::Gateway(_)));
  assert_eq!(f.gateway.requests.lock().len(), 1);
  let state = f.store.snapshot().await;
  assert!(state.orders.is_empty());
  assert!(!state.claim(claim_id).unwrap().is_used);
  assert_eq!(state.cart_len(ALICE), 1);
}
