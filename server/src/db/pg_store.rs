// bistro_server/src/db/pg_store.rs

//! `CommerceStore` over a Postgres pool. Each `StoreTx` owns one `sqlx::Transaction`;
//! dropping it without `commit` rolls back.

use async_trait::async_trait;
use bistro_core::domain::{
  ClaimedVoucher, DiscountType, LockedClaim, NewClaim, NewOrder, OrderLock, OrderStatus, PricedLine, ProductStock,
  VoucherTemplate,
};
use bistro_core::{CommerceError, CommerceResult, CommerceStore, StoreTx};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl CommerceStore for PgStore {
  async fn begin(&self) -> CommerceResult<Box<dyn StoreTx>> {
    let tx = self.pool.begin().await.map_err(CommerceError::storage)?;
    Ok(Box::new(PgTx { tx }))
  }
}

struct PgTx {
  tx: Transaction<'static, Postgres>,
}

type ClaimRow = (i64, i64, i64, DateTime<Utc>, DateTime<Utc>, bool);

fn claim_from_row((id, user_id, voucher_id, claimed_at, expires_at, is_used): ClaimRow) -> ClaimedVoucher {
  ClaimedVoucher {
    id,
    user_id,
    voucher_id,
    claimed_at,
    expires_at,
    is_used,
  }
}

#[async_trait]
impl StoreTx for PgTx {
  async fn product_stock(&mut self, product_id: i64) -> CommerceResult<Option<ProductStock>> {
    let row: Option<(i64, i64, i32)> = sqlx::query_as("SELECT id, price, quantity FROM products WHERE id = $1")
      .bind(product_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(CommerceError::storage)?;
    Ok(row.map(|(product_id, price, quantity)| ProductStock {
      product_id,
      price,
      quantity,
    }))
  }

  async fn decrement_stock_if_available(&mut self, product_id: i64, quantity: i32) -> CommerceResult<bool> {
    let result = sqlx::query("UPDATE products SET quantity = quantity - $1 WHERE id = $2 AND quantity >= $1")
      .bind(quantity)
      .bind(product_id)
      .execute(&mut *self.tx)
      .await
      .map_err(CommerceError::storage)?;
    Ok(result.rows_affected() == 1)
  }

  async fn increment_stock(&mut self, product_id: i64, quantity: i32) -> CommerceResult<()> {
    sqlx::query("UPDATE products SET quantity = quantity + $1 WHERE id = $2")
      .bind(quantity)
      .bind(product_id)
      .execute(&mut *self.tx)
      .await
      .map_err(CommerceError::storage)?;
    Ok(())
  }

  async fn lock_user_voucher(&mut self, user_voucher_id: i64, user_id: i64) -> CommerceResult<Option<LockedClaim>> {
    let row: Option<(i64, bool, DateTime<Utc>, DiscountType, i64)> = sqlx::query_as(
      "SELECT uv.id, uv.is_used, uv.expires_at, v.discount_type, v.discount_value \
       FROM user_vouchers uv JOIN vouchers v ON v.id = uv.voucher_id \
       WHERE uv.id = $1 AND uv.user_id = $2 \
       FOR UPDATE OF uv",
    )
    .bind(user_voucher_id)
    .bind(user_id)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(CommerceError::storage)?;
    Ok(row.map(
      |(user_voucher_id, is_used, expires_at, discount_type, discount_value)| LockedClaim {
        user_voucher_id,
        is_used,
        expires_at,
        discount_type,
        discount_value,
      },
    ))
  }

  async fn set_voucher_used(&mut self, user_voucher_id: i64, used: bool) -> CommerceResult<()> {
    sqlx::query("UPDATE user_vouchers SET is_used = $1 WHERE id = $2")
      .bind(used)
      .bind(user_voucher_id)
      .execute(&mut *self.tx)
      .await
      .map_err(CommerceError::storage)?;
    Ok(())
  }

  async fn voucher_template(&mut self, voucher_id: i64) -> CommerceResult<Option<VoucherTemplate>> {
    let row: Option<(i64, String, DiscountType, i64, DateTime<Utc>, DateTime<Utc>, i32)> = sqlx::query_as(
      "SELECT id, code, discount_type, discount_value, hunt_start_time, hunt_end_time, valid_duration_days \
       FROM vouchers WHERE id = $1",
    )
    .bind(voucher_id)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(CommerceError::storage)?;
    Ok(row.map(
      |(id, code, discount_type, discount_value, hunt_start_time, hunt_end_time, valid_duration_days)| {
        VoucherTemplate {
          id,
          code,
          discount_type,
          discount_value,
          hunt_start_time,
          hunt_end_time,
          valid_duration_days,
        }
      },
    ))
  }

  async fn insert_claim_if_absent(&mut self, claim: &NewClaim) -> CommerceResult<Option<ClaimedVoucher>> {
    let row: Option<ClaimRow> = sqlx::query_as(
      "INSERT INTO user_vouchers (user_id, voucher_id, claimed_at, expires_at, is_used) \
       VALUES ($1, $2, $3, $4, FALSE) \
       ON CONFLICT (user_id, voucher_id) DO NOTHING \
       RETURNING id, user_id, voucher_id, claimed_at, expires_at, is_used",
    )
    .bind(claim.user_id)
    .bind(claim.voucher_id)
    .bind(claim.claimed_at)
    .bind(claim.expires_at)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(CommerceError::storage)?;
    Ok(row.map(claim_from_row))
  }

  async fn insert_order(&mut self, order: &NewOrder) -> CommerceResult<i64> {
    sqlx::query_scalar(
      "INSERT INTO orders (user_id, customer_name, customer_phone, shipping_address, total_amount, \
         discount_amount, status, applied_voucher_id, stock_deducted) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
       RETURNING id",
    )
    .bind(order.user_id)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.shipping_address)
    .bind(order.total_amount)
    .bind(order.discount_amount)
    .bind(order.status)
    .bind(order.applied_voucher_id)
    .bind(order.stock_deducted)
    .fetch_one(&mut *self.tx)
    .await
    .map_err(CommerceError::storage)
  }

  async fn insert_order_item(&mut self, order_id: i64, line: &PricedLine) -> CommerceResult<()> {
    sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, price_at_purchase) VALUES ($1, $2, $3, $4)")
      .bind(order_id)
      .bind(line.product_id)
      .bind(line.quantity)
      .bind(line.unit_price)
      .execute(&mut *self.tx)
      .await
      .map_err(CommerceError::storage)?;
    Ok(())
  }

  async fn lock_order(&mut self, order_id: i64) -> CommerceResult<Option<OrderLock>> {
    let row: Option<(i64, OrderStatus, bool, Option<i64>)> = sqlx::query_as(
      "SELECT id, status, stock_deducted, applied_voucher_id FROM orders WHERE id = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(CommerceError::storage)?;
    Ok(row.map(|(order_id, status, stock_deducted, applied_voucher_id)| OrderLock {
      order_id,
      status,
      stock_deducted,
      applied_voucher_id,
    }))
  }

  async fn order_lines(&mut self, order_id: i64) -> CommerceResult<Vec<PricedLine>> {
    let rows: Vec<(i64, i32, i64)> = sqlx::query_as(
      "SELECT product_id, quantity, price_at_purchase FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(&mut *self.tx)
    .await
    .map_err(CommerceError::storage)?;
    Ok(
      rows
        .into_iter()
        .map(|(product_id, quantity, unit_price)| PricedLine {
          product_id,
          quantity,
          unit_price,
        })
        .collect(),
    )
  }

  async fn update_order_state(
    &mut self,
    order_id: i64,
    status: OrderStatus,
    stock_deducted: bool,
  ) -> CommerceResult<()> {
    sqlx::query("UPDATE orders SET status = $1, stock_deducted = $2, updated_at = NOW() WHERE id = $3")
      .bind(status)
      .bind(stock_deducted)
      .bind(order_id)
      .execute(&mut *self.tx)
      .await
      .map_err(CommerceError::storage)?;
    Ok(())
  }

  async fn clear_cart(&mut self, user_id: i64) -> CommerceResult<()> {
    sqlx::query("DELETE FROM carts WHERE user_id = $1")
      .bind(user_id)
      .execute(&mut *self.tx)
      .await
      .map_err(CommerceError::storage)?;
    Ok(())
  }

  async fn commit(self: Box<Self>) -> CommerceResult<()> {
    self.tx.commit().await.map_err(CommerceError::storage)
  }
}
