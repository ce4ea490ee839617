// bistro_server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod catalog_handlers;
pub mod order_handlers;
pub mod payment_handlers;
pub mod review_handlers;
pub mod voucher_handlers;
