// bistro_server/src/web/pagination.rs
use serde::{Deserialize, Serialize};

/// Raw `page`/`limit` query values. Anything missing, non-numeric or out of range falls back
/// to the defaults instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
  pub page: Option<String>,
  pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
  pub page: i64,
  pub limit: i64,
  pub offset: i64,
}

impl Pagination {
  pub fn resolve(page: Option<&str>, limit: Option<&str>, default_limit: i64) -> Self {
    let page = page
      .and_then(|raw| raw.trim().parse::<i64>().ok())
      .filter(|page| *page >= 1)
      .unwrap_or(1);
    let limit = limit
      .and_then(|raw| raw.trim().parse::<i64>().ok())
      .filter(|limit| *limit > 0)
      .unwrap_or(default_limit);
    Self {
      page,
      limit,
      offset: (page - 1).saturating_mul(limit),
    }
  }

  pub fn from_query(query: &PageQuery, default_limit: i64) -> Self {
    Self::resolve(query.page.as_deref(), query.limit.as_deref(), default_limit)
  }

  pub fn total_pages(&self, total_records: i64) -> i64 {
    if total_records <= 0 {
      return 0;
    }
    (total_records + self.limit - 1) / self.limit
  }

  /// Wraps one page of `items` under `key` together with the paging fields.
  pub fn page_of<T: Serialize>(&self, key: &str, items: Vec<T>, total_records: i64) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), serde_json::json!(items));
    body.insert("totalPages".to_string(), serde_json::json!(self.total_pages(total_records)));
    body.insert("page".to_string(), serde_json::json!(self.page));
    serde_json::Value::Object(body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn garbage_falls_back_to_defaults() {
    assert_eq!(
      Pagination::resolve(Some("abc"), Some("-4"), 9),
      Pagination { page: 1, limit: 9, offset: 0 }
    );
    assert_eq!(
      Pagination::resolve(None, None, 10),
      Pagination { page: 1, limit: 10, offset: 0 }
    );
  }

  #[test]
  fn offset_and_total_pages() {
    let p = Pagination::resolve(Some("3"), Some("9"), 9);
    assert_eq!(p.offset, 18);
    assert_eq!(p.total_pages(0), 0);
    assert_eq!(p.total_pages(18), 2);
    assert_eq!(p.total_pages(19), 3);
  }

  #[test]
  fn page_body_uses_collection_key() {
    let p = Pagination::resolve(Some("2"), Some("1"), 10);
    let body = p.page_of("categories", vec!["a"], 3);
    assert_eq!(body["categories"], serde_json::json!(["a"]));
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["page"], 2);
  }
}
