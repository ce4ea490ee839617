// bistro-core/src/ledger.rs

//! Inventory ledger: the only code that moves product quantities.

use crate::domain::{merge_lines, LineRequest, PricedLine, StockEffect};
use crate::error::{CommerceError, CommerceResult};
use crate::store::StoreTx;
use tracing::{debug, instrument, warn};

/// Takes `quantity` units of `product_id`, failing with `InsufficientStock` when the
/// conditional decrement matches no row.
#[instrument(name = "ledger::reserve", skip(tx), err(Display))]
pub async fn reserve(tx: &mut dyn StoreTx, product_id: i64, quantity: i32) -> CommerceResult<()> {
  if quantity <= 0 {
    return Err(CommerceError::Validation(format!(
      "quantity for product ID {} must be positive",
      product_id
    )));
  }
  if tx.decrement_stock_if_available(product_id, quantity).await? {
    debug!("Stock reserved.");
    Ok(())
  } else {
    warn!("Reservation rejected: not enough stock.");
    Err(CommerceError::InsufficientStock { product_id })
  }
}

#[instrument(name = "ledger::restore", skip(tx), err(Display))]
pub async fn restore(tx: &mut dyn StoreTx, product_id: i64, quantity: i32) -> CommerceResult<()> {
  tx.increment_stock(product_id, quantity).await?;
  debug!("Stock restored.");
  Ok(())
}

/// Product rows are always locked in ascending id order, so two transactions touching the
/// same products cannot wait on each other.
fn in_lock_order(lines: &[PricedLine]) -> Vec<PricedLine> {
  let mut ordered = lines.to_vec();
  ordered.sort_by_key(|line| line.product_id);
  ordered
}

/// Reserves every line. The first failure is returned and the caller's transaction
/// rolls back the reservations already made.
pub async fn reserve_lines(tx: &mut dyn StoreTx, lines: &[PricedLine]) -> CommerceResult<()> {
  for line in in_lock_order(lines) {
    reserve(tx, line.product_id, line.quantity).await?;
  }
  Ok(())
}

pub async fn restore_lines(tx: &mut dyn StoreTx, lines: &[PricedLine]) -> CommerceResult<()> {
  for line in in_lock_order(lines) {
    restore(tx, line.product_id, line.quantity).await?;
  }
  Ok(())
}

/// Applies a `StockEffect` to all lines of an order.
pub async fn apply_effect(tx: &mut dyn StoreTx, effect: StockEffect, lines: &[PricedLine]) -> CommerceResult<()> {
  match effect {
    StockEffect::Deduct => reserve_lines(tx, lines).await,
    StockEffect::Restore => restore_lines(tx, lines).await,
    StockEffect::Unchanged => Ok(()),
  }
}

/// Reads price and stock for each requested product without changing anything.
///
/// Repeated products are merged first, so a cart listing the same product twice is checked
/// against its combined quantity. The returned lines carry the price snapshot.
#[instrument(name = "ledger::check_availability", skip_all, fields(lines = requested.len()), err(Display))]
pub async fn check_availability(tx: &mut dyn StoreTx, requested: &[LineRequest]) -> CommerceResult<Vec<PricedLine>> {
  let mut priced = Vec::with_capacity(requested.len());
  for line in merge_lines(requested) {
    let stock = tx
      .product_stock(line.product_id)
      .await?
      .ok_or(CommerceError::ProductNotFound(line.product_id))?;
    if stock.quantity < line.quantity {
      warn!(
        product_id = line.product_id,
        requested = line.quantity,
        available = stock.quantity,
        "Requested quantity exceeds stock."
      );
      return Err(CommerceError::InsufficientStock {
        product_id: line.product_id,
      });
    }
    priced.push(PricedLine {
      product_id: line.product_id,
      quantity: line.quantity,
      unit_price: stock.price,
    });
  }
  Ok(priced)
}
