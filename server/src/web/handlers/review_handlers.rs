// bistro_server/src/web/handlers/review_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::db::{is_foreign_key_violation, is_unique_violation};
use crate::errors::{AppError, Result};
use crate::models::review::{REVIEW_COLUMNS, REVIEW_JOINS};
use crate::models::{ReplyPayload, Review, ReviewPayload};
use crate::state::AppState;
use crate::web::pagination::{PageQuery, Pagination};
use crate::web::{AdminUser, AuthenticatedUser};

const REVIEWS_PER_PAGE: i64 = 10;

#[instrument(name = "handler::list_reviews", skip(app_state, product_id), fields(product_id = %product_id))]
pub async fn list_product_reviews_handler(
  app_state: web::Data<AppState>,
  product_id: web::Path<i64>,
) -> Result<HttpResponse> {
  let reviews: Vec<Review> = sqlx::query_as(&format!(
    "SELECT {} {} WHERE r.product_id = $1 ORDER BY r.created_at DESC",
    REVIEW_COLUMNS, REVIEW_JOINS
  ))
  .bind(*product_id)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(reviews))
}

#[instrument(
    name = "handler::create_review",
    skip(app_state, user, product_id, req_payload),
    fields(user_id = user.user_id, product_id = %product_id)
)]
pub async fn create_review_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  product_id: web::Path<i64>,
  req_payload: web::Json<ReviewPayload>,
) -> Result<HttpResponse> {
  req_payload.validate()?;
  let review_id: i64 = sqlx::query_scalar(
    "INSERT INTO product_reviews (product_id, user_id, rating, comment) VALUES ($1, $2, $3, $4) RETURNING id",
  )
  .bind(*product_id)
  .bind(user.user_id)
  .bind(req_payload.rating)
  .bind(&req_payload.comment)
  .fetch_one(&app_state.db_pool)
  .await
  .map_err(|e| {
    if is_unique_violation(&e) {
      AppError::Validation("You have already reviewed this product".to_string())
    } else if is_foreign_key_violation(&e) {
      AppError::NotFound("Product not found".to_string())
    } else {
      AppError::Sqlx(e)
    }
  })?;

  let review: Review = sqlx::query_as(&format!("SELECT {} {} WHERE r.id = $1", REVIEW_COLUMNS, REVIEW_JOINS))
    .bind(review_id)
    .fetch_one(&app_state.db_pool)
    .await?;
  info!(review_id, "Review created.");
  Ok(HttpResponse::Created().json(review))
}

#[instrument(
    name = "handler::update_review",
    skip(app_state, user, review_id, req_payload),
    fields(user_id = user.user_id, review_id = %review_id)
)]
pub async fn update_review_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  review_id: web::Path<i64>,
  req_payload: web::Json<ReviewPayload>,
) -> Result<HttpResponse> {
  req_payload.validate()?;
  let result = sqlx::query("UPDATE product_reviews SET rating = $1, comment = $2 WHERE id = $3 AND user_id = $4")
    .bind(req_payload.rating)
    .bind(&req_payload.comment)
    .bind(*review_id)
    .bind(user.user_id)
    .execute(&app_state.db_pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::Forbidden("You can only edit your own reviews".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Review updated" })))
}

#[instrument(name = "handler::admin_list_reviews", skip(app_state, _admin, query))]
pub async fn admin_list_reviews_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
  let paging = Pagination::from_query(&query, REVIEWS_PER_PAGE);
  let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_reviews")
    .fetch_one(&app_state.db_pool)
    .await?;
  let reviews: Vec<Review> = sqlx::query_as(&format!(
    "SELECT {} {} ORDER BY r.created_at DESC LIMIT $1 OFFSET $2",
    REVIEW_COLUMNS, REVIEW_JOINS
  ))
  .bind(paging.limit)
  .bind(paging.offset)
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(paging.page_of("reviews", reviews, total)))
}

#[instrument(name = "handler::admin_delete_review", skip(app_state, _admin, review_id), fields(review_id = %review_id))]
pub async fn admin_delete_review_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  review_id: web::Path<i64>,
) -> Result<HttpResponse> {
  let result = sqlx::query("DELETE FROM product_reviews WHERE id = $1")
    .bind(*review_id)
    .execute(&app_state.db_pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Review not found".to_string()));
  }
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::admin_reply_review", skip(app_state, _admin, review_id, req_payload), fields(review_id = %review_id))]
pub async fn admin_reply_review_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  review_id: web::Path<i64>,
  req_payload: web::Json<ReplyPayload>,
) -> Result<HttpResponse> {
  let result = sqlx::query("UPDATE product_reviews SET admin_reply = $1 WHERE id = $2")
    .bind(req_payload.reply.trim())
    .bind(*review_id)
    .execute(&app_state.db_pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Review not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Reply posted" })))
}
