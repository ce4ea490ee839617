// bistro_server/src/web/handlers/catalog_handlers.rs

//! Public catalog: product listing with optional AI search, product detail, categories and
//! the AI search / related-products endpoints.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::models::product::PRODUCT_COLUMNS;
use crate::models::{Category, Product};
use crate::state::AppState;
use crate::web::pagination::{PageQuery, Pagination};

const PRODUCTS_PER_PAGE: i64 = 9;
const CATEGORIES_PER_PAGE: i64 = 10;
/// How many ids the listing asks the AI service for before paginating locally.
const AI_LISTING_CANDIDATES: i64 = 100;
const SEARCH_DEFAULT_LIMIT: i64 = 10;
const RELATED_DEFAULT_LIMIT: i64 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
  pub page: Option<String>,
  pub limit: Option<String>,
  pub search: Option<String>,
  pub category: Option<String>,
  pub ai_search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
  pub q: Option<String>,
  pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
  pub limit: Option<String>,
}

/// WHERE-clause inputs shared by the count and page queries of the listing.
#[derive(Debug, Default)]
struct ProductFilter {
  ids: Option<Vec<i64>>,
  name_contains: Option<String>,
  category_slug: Option<String>,
}

impl ProductFilter {
  fn query(&self, select: &str) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(select);
    qb.push(" FROM products p LEFT JOIN categories c ON c.id = p.category_id WHERE TRUE");
    if let Some(ids) = &self.ids {
      qb.push(" AND p.id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(text) = &self.name_contains {
      qb.push(" AND p.name ILIKE '%' || ").push_bind(text.clone()).push(" || '%'");
    }
    if let Some(slug) = &self.category_slug {
      qb.push(" AND c.slug = ").push_bind(slug.clone());
    }
    qb
  }
}

fn non_blank(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_limit(raw: Option<&str>, default: i64) -> i64 {
  raw
    .and_then(|v| v.trim().parse::<i64>().ok())
    .filter(|v| *v > 0)
    .unwrap_or(default)
}

/// Keeps `products` in the order of `ids`, dropping ids that no longer exist.
fn order_by_ids(ids: &[i64], products: Vec<Product>) -> Vec<Product> {
  let mut by_id: HashMap<i64, Product> = products.into_iter().map(|p| (p.id, p)).collect();
  ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

async fn load_products_in_order(pool: &PgPool, ids: &[i64]) -> Result<Vec<Product>> {
  if ids.is_empty() {
    return Ok(Vec::new());
  }
  let filter = ProductFilter {
    ids: Some(ids.to_vec()),
    ..Default::default()
  };
  let products = filter
    .query(&format!("SELECT {}", PRODUCT_COLUMNS))
    .build_query_as::<Product>()
    .fetch_all(pool)
    .await?;
  Ok(order_by_ids(ids, products))
}

#[instrument(
    name = "handler::list_products",
    skip(app_state, query),
    fields(search = ?query.search, category = ?query.category)
)]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ProductListQuery>,
) -> Result<HttpResponse> {
  let paging = Pagination::resolve(query.page.as_deref(), query.limit.as_deref(), PRODUCTS_PER_PAGE);
  let search = non_blank(query.search.as_deref());
  let mut filter = ProductFilter {
    category_slug: non_blank(query.category.as_deref()),
    ..Default::default()
  };

  let wants_ai = query.ai_search.as_deref() == Some("true");
  if let (true, Some(text)) = (wants_ai, search.as_deref()) {
    match app_state.ai.search(text, AI_LISTING_CANDIDATES).await {
      Ok(ids) if ids.is_empty() => {
        return Ok(HttpResponse::Ok().json(paging.page_of("products", Vec::<Product>::new(), 0)));
      }
      Ok(ids) => {
        filter.ids = Some(ids.clone());
        let matched = filter
          .query(&format!("SELECT {}", PRODUCT_COLUMNS))
          .build_query_as::<Product>()
          .fetch_all(&app_state.db_pool)
          .await?;
        let ranked = order_by_ids(&ids, matched);
        let total = ranked.len() as i64;
        let page: Vec<Product> = ranked
          .into_iter()
          .skip(usize::try_from(paging.offset).unwrap_or(usize::MAX))
          .take(usize::try_from(paging.limit).unwrap_or(usize::MAX))
          .collect();
        return Ok(HttpResponse::Ok().json(paging.page_of("products", page, total)));
      }
      Err(e) => {
        warn!(error = %e, "AI search failed, falling back to name search.");
      }
    }
  }
  filter.name_contains = search;

  let total: i64 = filter
    .query("SELECT COUNT(p.id)")
    .build_query_scalar::<i64>()
    .fetch_one(&app_state.db_pool)
    .await?;

  let mut page_query = filter.query(&format!("SELECT {}", PRODUCT_COLUMNS));
  page_query
    .push(" ORDER BY p.created_at DESC LIMIT ")
    .push_bind(paging.limit)
    .push(" OFFSET ")
    .push_bind(paging.offset);
  let products = page_query
    .build_query_as::<Product>()
    .fetch_all(&app_state.db_pool)
    .await?;

  Ok(HttpResponse::Ok().json(paging.page_of("products", products, total)))
}

#[instrument(name = "handler::get_product", skip(app_state, slug), fields(slug = %slug))]
pub async fn get_product_handler(app_state: web::Data<AppState>, slug: web::Path<String>) -> Result<HttpResponse> {
  let product: Option<Product> = sqlx::query_as(&format!("SELECT {} FROM products p WHERE p.slug = $1", PRODUCT_COLUMNS))
    .bind(slug.as_str())
    .fetch_optional(&app_state.db_pool)
    .await?;
  let product = product.ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::list_categories", skip(app_state, query))]
pub async fn list_categories_handler(
  app_state: web::Data<AppState>,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
  let paging = Pagination::from_query(&query, CATEGORIES_PER_PAGE);
  let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
    .fetch_one(&app_state.db_pool)
    .await?;
  let categories: Vec<Category> = sqlx::query_as("SELECT id, name, slug FROM categories ORDER BY name LIMIT $1 OFFSET $2")
    .bind(paging.limit)
    .bind(paging.offset)
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(paging.page_of("categories", categories, total)))
}

/// Products matching a free-text query, in the AI service's relevance order.
#[instrument(name = "handler::ai_search", skip(app_state, query), fields(q = ?query.q))]
pub async fn search_handler(app_state: web::Data<AppState>, query: web::Query<SearchQuery>) -> Result<HttpResponse> {
  let text = non_blank(query.q.as_deref())
    .ok_or_else(|| AppError::Validation("Missing query parameter 'q'".to_string()))?;
  let limit = parse_limit(query.limit.as_deref(), SEARCH_DEFAULT_LIMIT);

  let ids = app_state.ai.search(&text, limit).await?;
  let products = load_products_in_order(&app_state.db_pool, &ids).await?;
  info!(hits = ids.len(), returned = products.len(), "AI search served.");
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::related_products", skip(app_state, product_id, query), fields(product_id = %product_id))]
pub async fn related_products_handler(
  app_state: web::Data<AppState>,
  product_id: web::Path<i64>,
  query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
  let limit = parse_limit(query.limit.as_deref(), RELATED_DEFAULT_LIMIT);
  let ids = app_state.ai.related_products(*product_id, limit).await?;
  let products = load_products_in_order(&app_state.db_pool, &ids).await?;
  Ok(HttpResponse::Ok().json(products))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn product(id: i64) -> Product {
    Product {
      id,
      name: format!("Dish {}", id),
      slug: format!("dish-{}", id),
      price: 10_000,
      quantity: 5,
      image: String::new(),
      description: String::new(),
      details: String::new(),
      category_id: None,
      calories: 0,
      protein_grams: 0,
      carb_grams: 0,
      fat_grams: 0,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn ranking_follows_ai_order_and_skips_missing_ids() {
    let ranked = order_by_ids(&[3, 99, 1, 2], vec![product(1), product(2), product(3)]);
    let ids: Vec<i64> = ranked.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
  }

  #[test]
  fn filter_binds_only_present_conditions() {
    let filter = ProductFilter {
      ids: None,
      name_contains: Some("pho".to_string()),
      category_slug: Some("noodles".to_string()),
    };
    let qb = filter.query("SELECT COUNT(p.id)");
    assert_eq!(
      qb.sql(),
      "SELECT COUNT(p.id) FROM products p LEFT JOIN categories c ON c.id = p.category_id WHERE TRUE \
       AND p.name ILIKE '%' || $1 || '%' AND c.slug = $2"
    );
  }

  #[test]
  fn limits_fall_back_on_garbage() {
    assert_eq!(parse_limit(Some("x"), 5), 5);
    assert_eq!(parse_limit(Some("0"), 5), 5);
    assert_eq!(parse_limit(Some("12"), 5), 12);
    assert_eq!(non_blank(Some("   ")), None);
  }
}
