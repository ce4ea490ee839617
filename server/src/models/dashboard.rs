// bistro_server/src/models/dashboard.rs
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
  pub total_revenue: i64,
  pub total_orders: i64,
  pub total_customers: i64,
  pub total_products: i64,
  pub total_categories: i64,
  pub daily_revenue: Vec<DailyRevenue>,
  pub top_products: Vec<TopProduct>,
  pub top_customers: Vec<TopCustomer>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct DailyRevenue {
  /// Local date (`Asia/Ho_Chi_Minh`), `YYYY-MM-DD`.
  pub date: String,
  pub revenue: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
  pub name: String,
  pub total_sold: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
  pub name: String,
  pub total_spent: i64,
}
