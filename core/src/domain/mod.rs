// bistro-core/src/domain/mod.rs

//! Plain data types and pure rules shared by every workflow.

pub mod order;
pub mod status;
pub mod voucher;

pub use order::{
  merge_lines, CheckoutPath, Customer, LineRequest, NewOrder, OrderLock, OrderReference, PricedLine, ProductStock,
};
pub use status::{stock_effect, OrderStatus, StockEffect, StockTrigger};
pub use voucher::{compute_discount, ClaimedVoucher, DiscountType, LockedClaim, NewClaim, VoucherTemplate};
