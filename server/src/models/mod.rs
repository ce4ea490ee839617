// bistro_server/src/models/mod.rs

//! Row types read from the database and the JSON payloads the handlers accept.

pub mod cart;
pub mod category;
pub mod dashboard;
pub mod order;
pub mod product;
pub mod review;
pub mod user;
pub mod voucher;

pub use cart::{CartItemPayload, CartLine, CartQuantityPayload};
pub use category::{Category, CategoryPayload};
pub use dashboard::{DailyRevenue, DashboardStats, TopCustomer, TopProduct};
pub use order::{CheckoutPayload, OrderItemView, OrderStatusPayload, OrderSummary, OrderWithItems};
pub use product::{Product, ProductPayload};
pub use review::{ReplyPayload, Review, ReviewPayload};
pub use user::{ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest, User};
pub use voucher::{UserVoucherView, Voucher, VoucherPayload};
