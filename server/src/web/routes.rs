// bistro_server/src/web/routes.rs

use actix_web::web;

use crate::errors::AppError;
use crate::web::handlers::{
  admin_handlers, auth_handlers, cart_handlers, catalog_handlers, order_handlers, payment_handlers, review_handlers,
  voucher_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed bodies, paths and query strings answer 400 with the usual `{"error": ...}` body.
fn configure_extractors(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(
      web::JsonConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into()),
    )
    .app_data(
      web::PathConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid path parameter: {}", err)).into()),
    )
    .app_data(
      web::QueryConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid query string: {}", err)).into()),
    );
}

/// Mounts the whole API under `/api`. Access control lives in the handlers' extractors.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  configure_extractors(cfg);
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      // Accounts
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/forgot-password", web::post().to(auth_handlers::forgot_password_handler))
          .route("/reset-password", web::post().to(auth_handlers::reset_password_handler)),
      )
      // Catalog
      .route("/search", web::get().to(catalog_handlers::search_handler))
      .route("/categories", web::get().to(catalog_handlers::list_categories_handler))
      .route("/products", web::get().to(catalog_handlers::list_products_handler))
      .route("/products/{slug}", web::get().to(catalog_handlers::get_product_handler))
      .route(
        "/products/{id}/related",
        web::get().to(catalog_handlers::related_products_handler),
      )
      .route(
        "/products/{id}/reviews",
        web::get().to(review_handlers::list_product_reviews_handler),
      )
      // Checkout and payments
      .route("/orders", web::post().to(order_handlers::create_order_handler))
      .route("/orders/{id}/status", web::get().to(order_handlers::order_status_handler))
      .route("/payment/momo", web::post().to(payment_handlers::momo_payment_handler))
      .route("/payment/bank-transfer", web::post().to(payment_handlers::bank_transfer_handler))
      .route("/payment/demo", web::post().to(payment_handlers::demo_payment_handler))
      .route("/webhook/momo", web::post().to(payment_handlers::momo_webhook_handler))
      // Signed-in customer
      .service(
        web::scope("/user")
          .route("/orders", web::get().to(order_handlers::user_orders_handler))
          .route("/orders/{id}", web::get().to(order_handlers::user_order_details_handler))
          .route("/cart", web::get().to(cart_handlers::get_cart_handler))
          .route("/cart", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/cart", web::delete().to(cart_handlers::clear_cart_handler))
          .route("/cart/{product_id}", web::put().to(cart_handlers::update_cart_item_handler))
          .route("/cart/{product_id}", web::delete().to(cart_handlers::remove_from_cart_handler))
          .route(
            "/products/{id}/reviews",
            web::post().to(review_handlers::create_review_handler),
          )
          .route("/reviews/{review_id}", web::put().to(review_handlers::update_review_handler))
          .route(
            "/vouchers/claimable",
            web::get().to(voucher_handlers::claimable_vouchers_handler),
          )
          .route(
            "/vouchers/claim/{id}",
            web::post().to(voucher_handlers::claim_voucher_handler),
          )
          .route("/vouchers", web::get().to(voucher_handlers::user_vouchers_handler))
          .route("/vouchers/{id}", web::delete().to(voucher_handlers::delete_user_voucher_handler)),
      )
      // Back office
      .service(
        web::scope("/admin")
          .route("/stats", web::get().to(admin_handlers::dashboard_stats_handler))
          .route("/users", web::get().to(admin_handlers::list_users_handler))
          .route("/products", web::post().to(admin_handlers::create_product_handler))
          .route("/products/{id}", web::put().to(admin_handlers::update_product_handler))
          .route("/products/{id}", web::delete().to(admin_handlers::delete_product_handler))
          .route("/categories", web::post().to(admin_handlers::create_category_handler))
          .route("/categories/{id}", web::put().to(admin_handlers::update_category_handler))
          .route("/categories/{id}", web::delete().to(admin_handlers::delete_category_handler))
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/orders/{id}", web::get().to(admin_handlers::order_details_handler))
          .route("/orders/{id}/status", web::put().to(admin_handlers::update_order_status_handler))
          .route("/reviews", web::get().to(review_handlers::admin_list_reviews_handler))
          .route("/reviews/{review_id}", web::delete().to(review_handlers::admin_delete_review_handler))
          .route(
            "/reviews/{review_id}/reply",
            web::put().to(review_handlers::admin_reply_review_handler),
          )
          .route("/vouchers", web::get().to(admin_handlers::list_vouchers_handler))
          .route("/vouchers", web::post().to(admin_handlers::create_voucher_handler))
          .route("/vouchers/{id}", web::put().to(admin_handlers::update_voucher_handler))
          .route("/vouchers/{id}", web::delete().to(admin_handlers::delete_voucher_handler)),
      ),
  );
}
