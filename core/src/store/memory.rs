// bistro-core/src/store/memory.rs

//! In-process `CommerceStore`. Transactions work on a copy of the state and hold the store's
//! async lock until they commit or drop, so they are fully serialized. Used by the test suites
//! and by HTTP tests that exercise the workflows without a database.

use super::{CommerceStore, StoreTx};
use crate::domain::{
  ClaimedVoucher, LockedClaim, NewClaim, NewOrder, OrderLock, OrderStatus, PricedLine, ProductStock,
  VoucherTemplate,
};
use crate::error::CommerceResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOrder {
  pub details: NewOrder,
  pub items: Vec<PricedLine>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
  pub products: BTreeMap<i64, ProductStock>,
  pub vouchers: BTreeMap<i64, VoucherTemplate>,
  pub claims: BTreeMap<i64, ClaimedVoucher>,
  pub orders: BTreeMap<i64, StoredOrder>,
  /// user_id -> product_id -> quantity
  pub carts: BTreeMap<i64, BTreeMap<i64, i32>>,
  next_id: i64,
}

impl MemoryState {
  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }

  pub fn product_quantity(&self, product_id: i64) -> Option<i32> {
    self.products.get(&product_id).map(|p| p.quantity)
  }

  pub fn order(&self, order_id: i64) -> Option<&StoredOrder> {
    self.orders.get(&order_id)
  }

  pub fn claim(&self, user_voucher_id: i64) -> Option<&ClaimedVoucher> {
    self.claims.get(&user_voucher_id)
  }

  pub fn cart_len(&self, user_id: i64) -> usize {
    self.carts.get(&user_id).map_or(0, BTreeMap::len)
  }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Runs `f` against the committed state. Waits for any open transaction to finish first.
  pub async fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
    let mut guard = self.state.lock().await;
    f(&mut guard)
  }

  pub async fn snapshot(&self) -> MemoryState {
    self.with_state(|state| state.clone()).await
  }

  pub async fn put_product(&self, product_id: i64, price: i64, quantity: i32) {
    self
      .with_state(|state| {
        state.products.insert(
          product_id,
          ProductStock {
            product_id,
            price,
            quantity,
          },
        );
      })
      .await
  }

  pub async fn put_voucher(&self, template: VoucherTemplate) {
    self
      .with_state(|state| {
        state.vouchers.insert(template.id, template);
      })
      .await
  }

  /// Inserts a claim directly, bypassing the claim window. Returns the claim id.
  pub async fn put_claim(&self, claim: NewClaim, is_used: bool) -> i64 {
    self
      .with_state(|state| {
        let id = state.next_id();
        state.claims.insert(
          id,
          ClaimedVoucher {
            id,
            user_id: claim.user_id,
            voucher_id: claim.voucher_id,
            claimed_at: claim.claimed_at,
            expires_at: claim.expires_at,
            is_used,
          },
        );
        id
      })
      .await
  }

  pub async fn put_cart_item(&self, user_id: i64, product_id: i64, quantity: i32) {
    self
      .with_state(|state| {
        *state.carts.entry(user_id).or_default().entry(product_id).or_insert(0) += quantity;
      })
      .await
  }
}

#[async_trait]
impl CommerceStore for MemoryStore {
  async fn begin(&self) -> CommerceResult<Box<dyn StoreTx>> {
    let guard = self.state.clone().lock_owned().await;
    let working = guard.clone();
    Ok(Box::new(MemoryTx { guard, working }))
  }
}

struct MemoryTx {
  guard: OwnedMutexGuard<MemoryState>,
  working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn product_stock(&mut self, product_id: i64) -> CommerceResult<Option<ProductStock>> {
    Ok(self.working.products.get(&product_id).copied())
  }

  async fn decrement_stock_if_available(&mut self, product_id: i64, quantity: i32) -> CommerceResult<bool> {
    match self.working.products.get_mut(&product_id) {
      Some(product) if product.quantity >= quantity => {
        product.quantity -= quantity;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn increment_stock(&mut self, product_id: i64, quantity: i32) -> CommerceResult<()> {
    if let Some(product) = self.working.products.get_mut(&product_id) {
      product.quantity += quantity;
    }
    Ok(())
  }

  async fn lock_user_voucher(&mut self, user_voucher_id: i64, user_id: i64) -> CommerceResult<Option<LockedClaim>> {
    let Some(claim) = self.working.claims.get(&user_voucher_id).filter(|c| c.user_id == user_id) else {
      return Ok(None);
    };
    Ok(self.working.vouchers.get(&claim.voucher_id).map(|template| LockedClaim {
      user_voucher_id: claim.id,
      is_used: claim.is_used,
      expires_at: claim.expires_at,
      discount_type: template.discount_type,
      discount_value: template.discount_value,
    }))
  }

  async fn set_voucher_used(&mut self, user_voucher_id: i64, used: bool) -> CommerceResult<()> {
    if let Some(claim) = self.working.claims.get_mut(&user_voucher_id) {
      claim.is_used = used;
    }
    Ok(())
  }

  async fn voucher_template(&mut self, voucher_id: i64) -> CommerceResult<Option<VoucherTemplate>> {
    Ok(self.working.vouchers.get(&voucher_id).cloned())
  }

  async fn insert_claim_if_absent(&mut self, claim: &NewClaim) -> CommerceResult<Option<ClaimedVoucher>> {
    let exists = self
      .working
      .claims
      .values()
      .any(|c| c.user_id == claim.user_id && c.voucher_id == claim.voucher_id);
    if exists {
      return Ok(None);
    }
    let id = self.working.next_id();
    let stored = ClaimedVoucher {
      id,
      user_id: claim.user_id,
      voucher_id: claim.voucher_id,
      claimed_at: claim.claimed_at,
      expires_at: claim.expires_at,
      is_used: false,
    };
    self.working.claims.insert(id, stored.clone());
    Ok(Some(stored))
  }

  async fn insert_order(&mut self, order: &NewOrder) -> CommerceResult<i64> {
    let id = self.working.next_id();
    self.working.orders.insert(
      id,
      StoredOrder {
        details: order.clone(),
        items: Vec::new(),
      },
    );
    Ok(id)
  }

  async fn insert_order_item(&mut self, order_id: i64, line: &PricedLine) -> CommerceResult<()> {
    if let Some(order) = self.working.orders.get_mut(&order_id) {
      order.items.push(*line);
    }
    Ok(())
  }

  async fn lock_order(&mut self, order_id: i64) -> CommerceResult<Option<OrderLock>> {
    Ok(self.working.orders.get(&order_id).map(|order| OrderLock {
      order_id,
      status: order.details.status,
      stock_deducted: order.details.stock_deducted,
      applied_voucher_id: order.details.applied_voucher_id,
    }))
  }

  async fn order_lines(&mut self, order_id: i64) -> CommerceResult<Vec<PricedLine>> {
    Ok(self.working.orders.get(&order_id).map(|o| o.items.clone()).unwrap_or_default())
  }

  async fn update_order_state(
    &mut self,
    order_id: i64,
    status: OrderStatus,
    stock_deducted: bool,
  ) -> CommerceResult<()> {
    if let Some(order) = self.working.orders.get_mut(&order_id) {
      order.details.status = status;
      order.details.stock_deducted = stock_deducted;
    }
    Ok(())
  }

  async fn clear_cart(&mut self, user_id: i64) -> CommerceResult<()> {
    self.working.carts.remove(&user_id);
    Ok(())
  }

  async fn commit(self: Box<Self>) -> CommerceResult<()> {
    let MemoryTx { mut guard, working } = *self;
    *guard = working;
    Ok(())
  }
}
