// bistro_server/src/main.rs

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing
use tracing_subscriber::EnvFilter;

use bistro_server::config::{AppConfig, LogFormat};
use bistro_server::db;
use bistro_server::state::AppState;
use bistro_server::web::configure_app_routes;

fn init_tracing(format: LogFormat) {
  // RUST_LOG wins over the INFO default.
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE); // Log when spans close, showing duration
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Text => builder.init(),
  }
}

fn cors_policy(allowed_origins: &[String]) -> Cors {
  let cors = if allowed_origins.iter().any(|origin| origin == "*") {
    Cors::default().allow_any_origin()
  } else {
    allowed_origins
      .iter()
      .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
  };
  cors
    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
    .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
    .max_age(3600)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = Arc::new(AppConfig::from_env().context("Failed to load application configuration")?);
  init_tracing(app_config.log_format);
  tracing::info!(config = ?app_config, "Starting BistroBliss API server...");

  let db_pool = db::connect_pool(&app_config)
    .await
    .context("Failed to connect to the database")?;
  tracing::info!("Successfully connected to the database.");

  if app_config.run_migrations {
    db::run_migrations(&db_pool)
      .await
      .context("Failed to apply database migrations")?;
  }

  let app_state = web::Data::new(AppState::new(app_config.clone(), db_pool)?);
  if !app_config.momo.is_configured() {
    tracing::warn!("MoMo credentials are not set; gateway checkouts will fail.");
  }

  let server_address = app_config.bind_address();
  let allowed_origins = app_config.cors_allowed_origins.clone();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(app_state.clone()) // Share AppState with handlers
      .wrap(cors_policy(&allowed_origins))
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;

  Ok(())
}
