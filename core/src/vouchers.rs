// bistro-core/src/vouchers.rs

//! Voucher redemption guard and claim guard.

use crate::domain::{compute_discount, ClaimedVoucher, NewClaim};
use crate::error::{CommerceError, CommerceResult};
use crate::store::{CommerceStore, StoreTx};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

/// A validated claim and the discount it grants on the current subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedVoucher {
  pub user_voucher_id: i64,
  pub discount: i64,
}

/// Locks the claim and prices it against `subtotal`.
///
/// The claim is not consumed here. The caller marks it used with [`consume`] in the same
/// transaction that creates the order.
#[instrument(name = "vouchers::validate_and_price", skip(tx, now), err(Display))]
pub async fn validate_and_price(
  tx: &mut dyn StoreTx,
  user_voucher_id: i64,
  user_id: i64,
  subtotal: i64,
  now: DateTime<Utc>,
) -> CommerceResult<PricedVoucher> {
  let claim = tx
    .lock_user_voucher(user_voucher_id, user_id)
    .await?
    .ok_or(CommerceError::VoucherNotFound)?;

  if claim.is_used {
    warn!("Voucher claim already used.");
    return Err(CommerceError::VoucherAlreadyUsed);
  }
  if now > claim.expires_at {
    warn!(expires_at = %claim.expires_at, "Voucher claim expired.");
    return Err(CommerceError::VoucherExpired);
  }

  let discount = compute_discount(claim.discount_type, claim.discount_value, subtotal);
  info!(discount, "Voucher priced.");
  Ok(PricedVoucher {
    user_voucher_id,
    discount,
  })
}

pub async fn consume(tx: &mut dyn StoreTx, user_voucher_id: i64) -> CommerceResult<()> {
  tx.set_voucher_used(user_voucher_id, true).await
}

/// Makes a consumed claim usable again. Only a failed payment of the consuming order does this.
pub async fn release(tx: &mut dyn StoreTx, user_voucher_id: i64) -> CommerceResult<()> {
  tx.set_voucher_used(user_voucher_id, false).await
}

/// Claims `voucher_id` for `user_id` if the hunt window is open and the user has no claim yet.
#[instrument(name = "vouchers::claim", skip(store, now), err(Display))]
pub async fn claim(
  store: &dyn CommerceStore,
  voucher_id: i64,
  user_id: i64,
  now: DateTime<Utc>,
) -> CommerceResult<ClaimedVoucher> {
  let mut tx = store.begin().await?;

  let template = tx
    .voucher_template(voucher_id)
    .await?
    .filter(|t| t.is_claimable_at(now))
    .ok_or(CommerceError::VoucherNotClaimable)?;

  let new_claim = NewClaim {
    user_id,
    voucher_id,
    claimed_at: now,
    expires_at: template.claim_expiry(now),
  };
  let claimed = tx
    .insert_claim_if_absent(&new_claim)
    .await?
    .ok_or(CommerceError::VoucherAlreadyClaimed)?;

  tx.commit().await?;
  info!(user_voucher_id = claimed.id, expires_at = %claimed.expires_at, "Voucher claimed.");
  Ok(claimed)
}
