// bistro_server/src/web/handlers/admin_handlers.rs

//! Admin back office. Every handler takes an `AdminUser`, so non-admin tokens get 403.

use actix_web::{web, HttpResponse};
use bistro_core::domain::OrderStatus;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::db::{is_foreign_key_violation, is_unique_violation};
use crate::errors::{AppError, Result};
use crate::models::order::{ORDER_SUMMARY_COLUMNS, ORDER_SUMMARY_JOINS};
use crate::models::voucher::VOUCHER_COLUMNS;
use crate::models::{
  Category, CategoryPayload, DailyRevenue, DashboardStats, OrderStatusPayload, OrderSummary, ProductPayload,
  TopCustomer, TopProduct, User, Voucher, VoucherPayload,
};
use crate::state::AppState;
use crate::web::handlers::order_handlers::load_order_with_items;
use crate::web::pagination::{PageQuery, Pagination};
use crate::web::AdminUser;

const ADMIN_PAGE_SIZE: i64 = 10;

/// Revenue is bucketed by local calendar day of the shop.
const SHOP_TIME_ZONE: &str = "Asia/Ho_Chi_Minh";

// --- Dashboard ---

async fn fetch_i64(pool: &PgPool, sql: &str) -> Result<i64> {
  Ok(sqlx::query_scalar(sql).fetch_one(pool).await?)
}

#[instrument(name = "handler::dashboard_stats", skip(app_state, _admin))]
pub async fn dashboard_stats_handler(app_state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse> {
  let pool = &app_state.db_pool;

  let total_revenue = fetch_i64(
    pool,
    "SELECT COALESCE(SUM(total_amount), 0)::BIGINT FROM orders WHERE status = 'completed'",
  )
  .await?;
  let total_orders = fetch_i64(pool, "SELECT COUNT(*) FROM orders").await?;
  let total_customers = fetch_i64(pool, "SELECT COUNT(*) FROM users WHERE is_admin = FALSE").await?;
  let total_products = fetch_i64(pool, "SELECT COUNT(*) FROM products").await?;
  let total_categories = fetch_i64(pool, "SELECT COUNT(*) FROM categories").await?;

  let daily_revenue: Vec<DailyRevenue> = sqlx::query_as(
    "SELECT TO_CHAR(day, 'YYYY-MM-DD') AS date, COALESCE(SUM(o.total_amount), 0)::BIGINT AS revenue \
     FROM generate_series( \
       ((NOW() AT TIME ZONE $1)::date - 6)::timestamp, \
       (NOW() AT TIME ZONE $1)::date::timestamp, \
       INTERVAL '1 day' \
     ) AS day \
     LEFT JOIN orders o ON (o.created_at AT TIME ZONE $1)::date = day::date \
       AND o.status IN ('completed', 'shipped') \
     GROUP BY day \
     ORDER BY day",
  )
  .bind(SHOP_TIME_ZONE)
  .fetch_all(pool)
  .await?;

  let top_products: Vec<TopProduct> = sqlx::query_as(
    "SELECT p.name, SUM(oi.quantity)::BIGINT AS total_sold \
     FROM order_items oi \
     JOIN products p ON p.id = oi.product_id \
     JOIN orders o ON o.id = oi.order_id \
     WHERE o.status IN ('completed', 'shipped') \
     GROUP BY p.id, p.name \
     ORDER BY total_sold DESC \
     LIMIT 5",
  )
  .fetch_all(pool)
  .await?;

  let top_customers: Vec<TopCustomer> = sqlx::query_as(
    "SELECT o.customer_name AS name, SUM(o.total_amount)::BIGINT AS total_spent \
     FROM orders o \
     WHERE o.status IN ('completed', 'shipped') AND o.customer_name <> '' \
     GROUP BY o.customer_name \
     ORDER BY total_spent DESC \
     LIMIT 5",
  )
  .fetch_all(pool)
  .await?;

  Ok(HttpResponse::Ok().json(DashboardStats {
    total_revenue,
    total_orders,
    total_customers,
    total_products,
    total_categories,
    daily_revenue,
    top_products,
    top_customers,
  }))
}

#[instrument(name = "handler::admin_list_users", skip(app_state, _admin, query))]
pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
  let paging = Pagination::from_query(&query, ADMIN_PAGE_SIZE);
  let total = fetch_i64(&app_state.db_pool, "SELECT COUNT(*) FROM users").await?;
  let users: Vec<User> = sqlx::query_as(
    "SELECT id, username, email, password_hash, is_admin, created_at FROM users \
     ORDER BY created_at DESC LIMIT $1 OFFSET $2",
  )
  .bind(paging.limit)
  .bind(paging.offset)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(paging.page_of("users", users, total)))
}

// --- Products ---

fn product_write_error(e: sqlx::Error) -> AppError {
  if is_unique_violation(&e) {
    AppError::Validation("A product with this slug already exists".to_string())
  } else if is_foreign_key_violation(&e) {
    AppError::Validation("Category does not exist".to_string())
  } else {
    AppError::Sqlx(e)
  }
}

#[instrument(name = "handler::create_product", skip(app_state, _admin, req_payload), fields(slug = %req_payload.slug))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<ProductPayload>,
) -> Result<HttpResponse> {
  let p = req_payload.into_inner();
  p.validate()?;
  let product_id: i64 = sqlx::query_scalar(
    "INSERT INTO products (name, slug, price, quantity, image, description, details, category_id, \
     calories, protein_grams, carb_grams, fat_grams) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
  )
  .bind(p.name.trim())
  .bind(p.slug.trim())
  .bind(p.price)
  .bind(p.quantity)
  .bind(&p.image)
  .bind(&p.description)
  .bind(&p.details)
  .bind(p.category_id)
  .bind(p.calories)
  .bind(p.protein_grams)
  .bind(p.carb_grams)
  .bind(p.fat_grams)
  .fetch_one(&app_state.db_pool)
  .await
  .map_err(product_write_error)?;

  info!(product_id, "Product created.");
  Ok(HttpResponse::Created().json(json!({ "id": product_id })))
}

#[instrument(name = "handler::update_product", skip(app_state, _admin, product_id, req_payload), fields(product_id = %product_id))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  product_id: web::Path<i64>,
  req_payload: web::Json<ProductPayload>,
) -> Result<HttpResponse> {
  let p = req_payload.into_inner();
  p.validate()?;
  let result = sqlx::query(
    "UPDATE products SET name = $1, slug = $2, price = $3, quantity = $4, image = $5, description = $6, \
     details = $7, category_id = $8, calories = $9, protein_grams = $10, carb_grams = $11, fat_grams = $12 \
     WHERE id = $13",
  )
  .bind(p.name.trim())
  .bind(p.slug.trim())
  .bind(p.price)
  .bind(p.quantity)
  .bind(&p.image)
  .bind(&p.description)
  .bind(&p.details)
  .bind(p.category_id)
  .bind(p.calories)
  .bind(p.protein_grams)
  .bind(p.carb_grams)
  .bind(p.fat_grams)
  .bind(*product_id)
  .execute(&app_state.db_pool)
  .await
  .map_err(product_write_error)?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Product not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Product updated" })))
}

/// Products that appear on an order cannot be deleted; order lines keep pointing at them.
#[instrument(name = "handler::delete_product", skip(app_state, _admin, product_id), fields(product_id = %product_id))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  product_id: web::Path<i64>,
) -> Result<HttpResponse> {
  let result = sqlx::query("DELETE FROM products WHERE id = $1")
    .bind(*product_id)
    .execute(&app_state.db_pool)
    .await
    .map_err(|e| {
      if is_foreign_key_violation(&e) {
        AppError::Validation("Product has been ordered and cannot be deleted".to_string())
      } else {
        AppError::Sqlx(e)
      }
    })?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Product not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "result": "success" })))
}

// --- Categories ---

fn category_write_error(e: sqlx::Error) -> AppError {
  if is_unique_violation(&e) {
    AppError::Validation("A category with this slug already exists".to_string())
  } else {
    AppError::Sqlx(e)
  }
}

fn validate_category(payload: &CategoryPayload) -> Result<()> {
  if payload.name.trim().is_empty() || payload.slug.trim().is_empty() {
    return Err(AppError::Validation("Category name and slug are required".to_string()));
  }
  Ok(())
}

#[instrument(name = "handler::create_category", skip(app_state, _admin, req_payload), fields(slug = %req_payload.slug))]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse> {
  validate_category(&req_payload)?;
  let category: Category = sqlx::query_as("INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug")
    .bind(req_payload.name.trim())
    .bind(req_payload.slug.trim())
    .fetch_one(&app_state.db_pool)
    .await
    .map_err(category_write_error)?;
  Ok(HttpResponse::Created().json(category))
}

#[instrument(name = "handler::update_category", skip(app_state, _admin, category_id, req_payload), fields(category_id = %category_id))]
pub async fn update_category_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  category_id: web::Path<i64>,
  req_payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse> {
  validate_category(&req_payload)?;
  let category: Option<Category> =
    sqlx::query_as("UPDATE categories SET name = $1, slug = $2 WHERE id = $3 RETURNING id, name, slug")
      .bind(req_payload.name.trim())
      .bind(req_payload.slug.trim())
      .bind(*category_id)
      .fetch_optional(&app_state.db_pool)
      .await
      .map_err(category_write_error)?;
  let category = category.ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
  Ok(HttpResponse::Ok().json(category))
}

/// Products of a deleted category become uncategorised.
#[instrument(name = "handler::delete_category", skip(app_state, _admin, category_id), fields(category_id = %category_id))]
pub async fn delete_category_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  category_id: web::Path<i64>,
) -> Result<HttpResponse> {
  let result = sqlx::query("DELETE FROM categories WHERE id = $1")
    .bind(*category_id)
    .execute(&app_state.db_pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Category not found".to_string()));
  }
  Ok(HttpResponse::NoContent().finish())
}

// --- Orders ---

#[instrument(name = "handler::admin_list_orders", skip(app_state, _admin, query))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
  let paging = Pagination::from_query(&query, ADMIN_PAGE_SIZE);
  let total = fetch_i64(&app_state.db_pool, "SELECT COUNT(*) FROM orders").await?;
  let orders: Vec<OrderSummary> = sqlx::query_as(&format!(
    "SELECT {} {} ORDER BY o.created_at DESC LIMIT $1 OFFSET $2",
    ORDER_SUMMARY_COLUMNS, ORDER_SUMMARY_JOINS
  ))
  .bind(paging.limit)
  .bind(paging.offset)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(paging.page_of("orders", orders, total)))
}

#[instrument(name = "handler::admin_order_details", skip(app_state, _admin, order_id), fields(order_id = %order_id))]
pub async fn order_details_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  order_id: web::Path<i64>,
) -> Result<HttpResponse> {
  let order = load_order_with_items(&app_state.db_pool, *order_id, None)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  Ok(HttpResponse::Ok().json(order))
}

/// Moves an order through its lifecycle; inventory follows the new status.
#[instrument(
    name = "handler::update_order_status",
    skip(app_state, admin, order_id, req_payload),
    fields(admin_id = admin.0.user_id, order_id = %order_id, target = %req_payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  order_id: web::Path<i64>,
  req_payload: web::Json<OrderStatusPayload>,
) -> Result<HttpResponse> {
  let target: OrderStatus = req_payload.status.trim().parse()?;
  let change = app_state.workflows.update_status(*order_id, target).await?;
  info!(
    from = %change.from,
    to = %change.to,
    stock_effect = ?change.stock_effect,
    "Order status updated."
  );
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order status updated",
      "order_id": change.order_id,
      "from": change.from,
      "to": change.to,
      "stock_effect": change.stock_effect,
  })))
}

// --- Vouchers ---

fn voucher_write_error(e: sqlx::Error) -> AppError {
  if is_unique_violation(&e) {
    AppError::Validation("A voucher with this code already exists".to_string())
  } else {
    AppError::Sqlx(e)
  }
}

#[instrument(name = "handler::admin_list_vouchers", skip(app_state, _admin, query))]
pub async fn list_vouchers_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
  let paging = Pagination::from_query(&query, ADMIN_PAGE_SIZE);
  let total = fetch_i64(&app_state.db_pool, "SELECT COUNT(*) FROM vouchers").await?;
  let vouchers: Vec<Voucher> = sqlx::query_as(&format!(
    "SELECT {} FROM vouchers v ORDER BY v.created_at DESC LIMIT $1 OFFSET $2",
    VOUCHER_COLUMNS
  ))
  .bind(paging.limit)
  .bind(paging.offset)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(paging.page_of("vouchers", vouchers, total)))
}

#[instrument(name = "handler::create_voucher", skip(app_state, _admin, req_payload), fields(code = %req_payload.code))]
pub async fn create_voucher_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<VoucherPayload>,
) -> Result<HttpResponse> {
  let v = req_payload.into_inner();
  v.validate()?;
  let voucher_id: i64 = sqlx::query_scalar(
    "INSERT INTO vouchers (code, description, discount_type, discount_value, hunt_start_time, hunt_end_time, \
     valid_duration_days, applicable_product_ids) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
  )
  .bind(v.code.trim())
  .bind(&v.description)
  .bind(v.discount_type)
  .bind(v.discount_value)
  .bind(v.hunt_start_time)
  .bind(v.hunt_end_time)
  .bind(v.valid_duration_days)
  .bind(&v.applicable_product_ids)
  .fetch_one(&app_state.db_pool)
  .await
  .map_err(voucher_write_error)?;

  info!(voucher_id, "Voucher created.");
  Ok(HttpResponse::Created().json(json!({ "id": voucher_id })))
}

/// Existing claims keep their expiry; only future claims see the new terms.
#[instrument(name = "handler::update_voucher", skip(app_state, _admin, voucher_id, req_payload), fields(voucher_id = %voucher_id))]
pub async fn update_voucher_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  voucher_id: web::Path<i64>,
  req_payload: web::Json<VoucherPayload>,
) -> Result<HttpResponse> {
  let v = req_payload.into_inner();
  v.validate()?;
  let result = sqlx::query(
    "UPDATE vouchers SET code = $1, description = $2, discount_type = $3, discount_value = $4, \
     hunt_start_time = $5, hunt_end_time = $6, valid_duration_days = $7, applicable_product_ids = $8, \
     updated_at = NOW() \
     WHERE id = $9",
  )
  .bind(v.code.trim())
  .bind(&v.description)
  .bind(v.discount_type)
  .bind(v.discount_value)
  .bind(v.hunt_start_time)
  .bind(v.hunt_end_time)
  .bind(v.valid_duration_days)
  .bind(&v.applicable_product_ids)
  .bind(*voucher_id)
  .execute(&app_state.db_pool)
  .await
  .map_err(voucher_write_error)?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Voucher not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Voucher updated" })))
}

/// Deleting a template also deletes every claim of it; orders that used one keep their
/// discount amount but lose the link.
#[instrument(name = "handler::delete_voucher", skip(app_state, _admin, voucher_id), fields(voucher_id = %voucher_id))]
pub async fn delete_voucher_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  voucher_id: web::Path<i64>,
) -> Result<HttpResponse> {
  let result = sqlx::query("DELETE FROM vouchers WHERE id = $1")
    .bind(*voucher_id)
    .execute(&app_state.db_pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Voucher not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Voucher deleted" })))
}
