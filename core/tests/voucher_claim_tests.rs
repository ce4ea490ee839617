// tests/voucher_claim_tests.rs
mod common;

use bistro_core::domain::DiscountType;
use bistro_core::CommerceError;
use chrono::{Duration, Utc};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_claim_inside_window_sets_expiry_from_claim_time() {
  setup_tracing();
  let f = fixture();
  let now = Utc::now();
  f.store.put_voucher(open_voucher(1, DiscountType::Percentage, 10, now)).await;

  let claimed = f.workflows.claim_voucher(1, ALICE, now).await.unwrap();

  assert_eq!(claimed.user_id, ALICE);
  assert_eq!(claimed.voucher_id, 1);
  assert!(!claimed.is_used);
  assert_eq!(claimed.expires_at, now + Duration::days(7));
  assert!(f.store.snapshot().await.claim(claimed.id).is_some());
}

#[tokio::test]
#[serial]
async fn test_second_claim_by_same_user_is_ignored() {
  setup_tracing();
  let f = fixture();
  let now = Utc::now();
  f.store.put_voucher(open_voucher(1, DiscountType::FixedAmount, 5_000, now)).await;

  f.workflows.claim_voucher(1, ALICE, now).await.unwrap();
  let err = f.workflows.claim_voucher(1, ALICE, now).await.unwrap_err();
  assert!(matches!(err, CommerceError::VoucherAlreadyClaimed));

  // Other users are unaffected.
  f.workflows.claim_voucher(1, BOB, now).await.unwrap();
  assert_eq!(f.store.snapshot().await.claims.len(), 2);
}

#[tokio::test]
#[serial]
async fn test_claims_outside_window_or_for_unknown_vouchers_fail() {
  setup_tracing();
  let f = fixture();
  let now = Utc::now();
  f.store.put_voucher(open_voucher(1, DiscountType::FixedAmount, 5_000, now)).await;

  let too_late = f.workflows.claim_voucher(1, ALICE, now + Duration::hours(2)).await.unwrap_err();
  let too_early = f.workflows.claim_voucher(1, ALICE, now - Duration::hours(2)).await.unwrap_err();
  let unknown = f.workflows.claim_voucher(77, ALICE, now).await.unwrap_err();

  for err in [too_late, too_early, unknown] {
    assert!(matches!(err, CommerceError::VoucherNotClaimable), "got {}", err);
  }
  assert!(f.store.snapshot().await.claims.is_empty());
}
