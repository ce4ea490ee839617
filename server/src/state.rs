// bistro_server/src/state.rs
use crate::config::AppConfig;
use crate::db::PgStore;
use crate::errors::AppError;
use crate::services::ai_client::AiClient;
use crate::services::mailer::{LogMailer, Mailer};
use crate::services::momo::MomoGateway;
use bistro_core::{CommerceStore, OrderWorkflows, PaymentGateway, WorkflowSettings};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub config: Arc<AppConfig>, // Share loaded config
  pub workflows: Arc<OrderWorkflows>,
  /// Kept separately from the workflows' gateway handle for IPN signature checks.
  pub momo: Arc<MomoGateway>,
  pub mailer: Arc<dyn Mailer>,
  pub ai: AiClient,
}

impl AppState {
  /// Production wiring: Postgres-backed workflows paying through MoMo.
  pub fn new(config: Arc<AppConfig>, db_pool: PgPool) -> Result<Self, AppError> {
    let store: Arc<dyn CommerceStore> = Arc::new(PgStore::new(db_pool.clone()));
    Self::with_store(config, db_pool, store, None)
  }

  /// Wires the state around an arbitrary store. `gateway` replaces MoMo as the payment
  /// gateway the checkout workflow calls when given.
  pub fn with_store(
    config: Arc<AppConfig>,
    db_pool: PgPool,
    store: Arc<dyn CommerceStore>,
    gateway: Option<Arc<dyn PaymentGateway>>,
  ) -> Result<Self, AppError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.http_client_timeout_secs))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

    let momo = Arc::new(MomoGateway::new(http.clone(), &config));
    let gateway = gateway.unwrap_or_else(|| momo.clone() as Arc<dyn PaymentGateway>);
    let settings = WorkflowSettings {
      order_ref_prefix: config.order_ref_prefix.clone(),
    };

    Ok(Self {
      workflows: Arc::new(OrderWorkflows::new(store, gateway, settings)),
      momo,
      mailer: Arc::new(LogMailer),
      ai: AiClient::new(http, config.ai_service_url.clone()),
      db_pool,
      config,
    })
  }
}
