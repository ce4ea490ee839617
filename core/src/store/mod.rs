// bistro-core/src/store/mod.rs

//! Persistence seam for the workflows.
//!
//! A `StoreTx` is one database transaction. Every method runs inside it; nothing is visible
//! to other transactions until `commit`. Dropping a `StoreTx` without committing rolls it back,
//! which is how every workflow error undoes its partial writes.

pub mod memory;

use crate::domain::{
  ClaimedVoucher, LockedClaim, NewClaim, NewOrder, OrderLock, OrderStatus, PricedLine, ProductStock,
  VoucherTemplate,
};
use crate::error::CommerceResult;
use async_trait::async_trait;

pub use memory::MemoryStore;

#[async_trait]
pub trait CommerceStore: Send + Sync {
  async fn begin(&self) -> CommerceResult<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: Send {
  // --- Inventory ---

  async fn product_stock(&mut self, product_id: i64) -> CommerceResult<Option<ProductStock>>;

  /// Compare-and-decrement in a single statement. Returns `false` when the product is
  /// missing or holds fewer than `quantity` units; nothing is changed in that case.
  async fn decrement_stock_if_available(&mut self, product_id: i64, quantity: i32) -> CommerceResult<bool>;

  async fn increment_stock(&mut self, product_id: i64, quantity: i32) -> CommerceResult<()>;

  // --- Vouchers ---

  /// Loads the claim `user_voucher_id` owned by `user_id`, locking it until the transaction ends.
  async fn lock_user_voucher(&mut self, user_voucher_id: i64, user_id: i64) -> CommerceResult<Option<LockedClaim>>;

  async fn set_voucher_used(&mut self, user_voucher_id: i64, used: bool) -> CommerceResult<()>;

  async fn voucher_template(&mut self, voucher_id: i64) -> CommerceResult<Option<VoucherTemplate>>;

  /// Insert-or-ignore on the unique `(user_id, voucher_id)` pair. `None` means a claim already existed.
  async fn insert_claim_if_absent(&mut self, claim: &NewClaim) -> CommerceResult<Option<ClaimedVoucher>>;

  // --- Orders ---

  async fn insert_order(&mut self, order: &NewOrder) -> CommerceResult<i64>;

  async fn insert_order_item(&mut self, order_id: i64, line: &PricedLine) -> CommerceResult<()>;

  /// `SELECT ... FOR UPDATE` on the order row.
  async fn lock_order(&mut self, order_id: i64) -> CommerceResult<Option<OrderLock>>;

  async fn order_lines(&mut self, order_id: i64) -> CommerceResult<Vec<PricedLine>>;

  async fn update_order_state(&mut self, order_id: i64, status: OrderStatus, stock_deducted: bool)
    -> CommerceResult<()>;

  // --- Carts ---

  async fn clear_cart(&mut self, user_id: i64) -> CommerceResult<()>;

  async fn commit(self: Box<Self>) -> CommerceResult<()>;
}
