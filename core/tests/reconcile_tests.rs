// tests/reconcile_tests.rs
mod common;

use bistro_core::domain::{CheckoutPath, DiscountType, OrderStatus};
use bistro_core::{CommerceError, PaymentNotification, ReconcileOutcome};
use chrono::Utc;
use common::*;
use serial_test::serial;

struct GatewayOrder {
  order_id: i64,
  reference: String,
}

async fn place_gateway_order(f: &Fixture, user_voucher_id: Option<i64>) -> GatewayOrder {
  let receipt = f
    .workflows
    .checkout(
      checkout_request(CheckoutPath::Gateway, Some(ALICE), vec![line(7, 2), line(8, 1)], user_voucher_id),
      Utc::now(),
    )
    .await
    .unwrap();
  GatewayOrder {
    order_id: receipt.order_id,
    reference: receipt.payment.unwrap().order_reference,
  }
}

fn notification(reference: &str, result_code: i64) -> PaymentNotification {
  PaymentNotification {
    order_reference: reference.to_string(),
    result_code,
  }
}

#[tokio::test]
#[serial]
async fn test_success_marks_paid_and_deducts_each_line() {
  setup_tracing();
  let f = fixture();
  f.store.put_product(7, 50_000, 5).await;
  f.store.put_product(8, 10_000, 5).await;
  let order = place_gateway_order(&f, None).await;

  let outcome = f.workflows.reconcile(notification(&order.reference, 0)).await.unwrap();

  assert_eq!(outcome, ReconcileOutcome::Captured { order_id: order.order_id });
  let state = f.store.snapshot().await;
  assert_eq!(state.product_quantity(7), Some(3));
  assert_eq!(state.product_quantity(8), Some(4));
  let stored = state.order(order.order_id).unwrap();
  assert_eq!(stored.details.status, OrderStatus::Paid);
  assert!(stored.details.stock_deducted);
}

#[tokio::test]
#[serial]
async fn test_replayed_success_does_not_deduct_twice() {
  setup_tracing();
  let f = fixture();
  f.store.put_product(7, 50_000, 5).await;
  f.store.put_product(8, 10_000, 5).await;
  let order = place_gateway_order(&f, None).await;

  f.workflows.reconcile(notification(&order.reference, 0)).await.unwrap();
  let replay = f.workflows.reconcile(notification(&order.reference, 0)).await.unwrap();
  let late_failure = f.workflows.reconcile(notification(&order.reference, 1006)).await.unwrap();

  for outcome in [replay, late_failure] {
    assert_eq!(
      outcome,
      ReconcileOutcome::AlreadySettled {
        order_id: order.order_id,
        status: OrderStatus::Paid
      }
    );
  }
  let state = f.store.snapshot().await;
  assert_eq!(state.product_quantity(7), Some(3));
  assert_eq!(state.order(order.order_id).unwrap().details.status, OrderStatus::Paid);
}

#[tokio::test]
#[serial]
async fn test_failure_cancels_and_frees_the_voucher_for_the_next_order() {
  setup_tracing();
  let f = fixture();
  let now = Utc::now();
  f.store.put_product(7, 50_000, 5).await;
  f.store.put_product(8, 10_000, 5).await;
  let claim_id = seed_claim(&f.store, ALICE, open_voucher(1, DiscountType::FixedAmount, 20_000, now), now, false).await;
  let order = place_gateway_order(&f, Some(claim_id)).await;
  assert!(f.store.snapshot().await.claim(claim_id).unwrap().is_used);

  let outcome = f.workflows.reconcile(notification(&order.reference, 1006)).await.unwrap();

  assert_eq!(
    outcome,
    ReconcileOutcome::Cancelled {
      order_id: order.order_id,
      voucher_released: true
    }
  );
  let state = f.store.snapshot().await;
  assert_eq!(state.order(order.order_id).unwrap().details.status, OrderStatus::Cancelled);
  assert!(!state.claim(claim_id).unwrap().is_used);
  assert_eq!(state.product_quantity(7), Some(5));

  // The released claim backs exactly one more order.
  let retry = f
    .workflows
    .checkout(
      checkout_request(CheckoutPath::Direct, Some(ALICE), vec![line(7, 1)], Some(claim_id)),
      now,
    )
    .await
    .unwrap();
  assert_eq!(retry.discount_amount, 20_000);
  let again = f
    .workflows
    .checkout(
      checkout_request(CheckoutPath::Direct, Some(ALICE), vec![line(7, 1)], Some(claim_id)),
      now,
    )
    .await
    .unwrap_err();
  assert!(matches!(again, CommerceError::VoucherAlreadyUsed));
}

#[tokio::test]
#[serial]
async fn test_success_without_stock_keeps_order_pending_payment() {
  setup_tracing();
  let f = fixture();
  f.store.put_product(7, 50_000, 2).await;
  f.store.put_product(8, 10_000, 1).await;
  let order = place_gateway_order(&f, None).await;
  f.workflows
    .checkout(checkout_request(CheckoutPath::ImmediateCapture, None, vec![line(8, 1)], None), Utc::now())
    .await
    .unwrap();

  let err = f.workflows.reconcile(notification(&order.reference, 0)).await.unwrap_err();

  assert!(matches!(err, CommerceError::InsufficientStock { product_id: 8 }));
  let state = f.store.snapshot().await;
  assert_eq!(state.product_quantity(7), Some(2));
  let stored = state.order(order.order_id).unwrap();
  assert_eq!(stored.details.status, OrderStatus::PendingPayment);
  assert!(!stored.details.stock_deducted);
}

#[tokio::test]
#[serial]
async fn test_bad_references_are_rejected() {
  setup_tracing();
  let f = fixture();

  let err = f.workflows.reconcile(notification("garbage", 0)).await.unwrap_err();
  assert!(matches!(err, CommerceError::Validation(_)));

  let err = f
    .workflows
    .reconcile(notification(&format!("{}_424242_abc", PREFIX), 0))
    .await
    .unwrap_err();
  assert!(matches!(err, CommerceError::OrderNotFound(424242)));
}
