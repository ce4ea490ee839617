// bistro_server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

impl FromStr for LogFormat {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "text" | "pretty" => Ok(LogFormat::Text),
      "json" => Ok(LogFormat::Json),
      other => Err(AppError::Config(format!("Invalid LOG_FORMAT '{}': expected 'text' or 'json'", other))),
    }
  }
}

/// MoMo merchant credentials. Empty credentials leave the gateway path unusable.
#[derive(Clone)]
pub struct MomoConfig {
  pub partner_code: String,
  pub access_key: String,
  pub secret_key: String,
  pub endpoint: String,
  pub verify_ipn_signature: bool,
}

impl MomoConfig {
  pub fn is_configured(&self) -> bool {
    !self.partner_code.is_empty() && !self.access_key.is_empty() && !self.secret_key.is_empty()
  }
}

impl fmt::Debug for MomoConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MomoConfig")
      .field("partner_code", &self.partner_code)
      .field("access_key", &"[REDACTED]")
      .field("secret_key", &"[REDACTED]")
      .field("endpoint", &self.endpoint)
      .field("verify_ipn_signature", &self.verify_ipn_signature)
      .finish()
  }
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,

  pub jwt_secret_key: String,
  pub jwt_ttl_hours: i64,

  /// Base of links sent to customers (payment redirect, password reset).
  pub frontend_url: String,
  /// Externally reachable base of this API, used for the gateway callback URL.
  pub public_api_url: String,

  pub ai_service_url: String,
  pub http_client_timeout_secs: u64,

  pub momo: MomoConfig,
  pub order_ref_prefix: String,

  pub mail_sender: String,
  pub cors_allowed_origins: Vec<String>,
  pub run_migrations: bool,
  pub log_format: LogFormat,
}

impl fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("database_max_connections", &self.database_max_connections)
      .field("jwt_secret_key", &"[REDACTED]")
      .field("jwt_ttl_hours", &self.jwt_ttl_hours)
      .field("frontend_url", &self.frontend_url)
      .field("public_api_url", &self.public_api_url)
      .field("ai_service_url", &self.ai_service_url)
      .field("http_client_timeout_secs", &self.http_client_timeout_secs)
      .field("momo", &self.momo)
      .field("order_ref_prefix", &self.order_ref_prefix)
      .field("mail_sender", &self.mail_sender)
      .field("cors_allowed_origins", &self.cors_allowed_origins)
      .field("run_migrations", &self.run_migrations)
      .field("log_format", &self.log_format)
      .finish()
  }
}

fn parse_value<T>(var_name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|var_name| env::var(var_name).ok())
  }

  /// Builds the configuration from any variable source. Blank values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let get_or = |var_name: &str, default: &str| get_env(var_name).unwrap_or_else(|_| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port: u16 = parse_value("SERVER_PORT", &get_or("SERVER_PORT", "8080"))?;
    let database_url = get_env("DATABASE_URL")?;
    let database_max_connections: u32 =
      parse_value("DATABASE_MAX_CONNECTIONS", &get_or("DATABASE_MAX_CONNECTIONS", "10"))?;

    let jwt_secret_key = get_env("JWT_SECRET_KEY")?;
    let jwt_ttl_hours: i64 = parse_value("JWT_TTL_HOURS", &get_or("JWT_TTL_HOURS", "24"))?;
    if jwt_ttl_hours <= 0 {
      return Err(AppError::Config("JWT_TTL_HOURS must be positive".to_string()));
    }

    let frontend_url = trim_url(get_or("FRONTEND_URL", "http://localhost:5173"));
    let public_api_url = trim_url(get_or("PUBLIC_API_URL", &format!("http://{}:{}", server_host, server_port)));
    let ai_service_url = trim_url(get_or("AI_SERVICE_URL", "http://localhost:8000"));
    let http_client_timeout_secs: u64 =
      parse_value("HTTP_CLIENT_TIMEOUT_SECS", &get_or("HTTP_CLIENT_TIMEOUT_SECS", "10"))?;

    let momo = MomoConfig {
      partner_code: get_or("MOMO_PARTNER_CODE", ""),
      access_key: get_or("MOMO_ACCESS_KEY", ""),
      secret_key: get_or("MOMO_SECRET_KEY", ""),
      endpoint: get_or("MOMO_ENDPOINT", "https://test-payment.momo.vn/v2/gateway/api/create"),
      verify_ipn_signature: parse_value(
        "MOMO_VERIFY_IPN_SIGNATURE",
        &get_or("MOMO_VERIFY_IPN_SIGNATURE", "false"),
      )?,
    };
    let order_ref_prefix = get_or("ORDER_REF_PREFIX", "BISTROBLISS");
    if order_ref_prefix.contains('_') {
      return Err(AppError::Config("ORDER_REF_PREFIX must not contain '_'".to_string()));
    }

    let mail_sender = get_or("MAIL_SENDER", "noreply@bistrobliss.local");
    let cors_allowed_origins = get_or("CORS_ALLOWED_ORIGINS", &frontend_url)
      .split(',')
      .map(|origin| trim_url(origin.trim().to_string()))
      .filter(|origin| !origin.is_empty())
      .collect();
    let run_migrations: bool = parse_value("RUN_MIGRATIONS", &get_or("RUN_MIGRATIONS", "true"))?;
    let log_format: LogFormat = get_or("LOG_FORMAT", "text").parse()?;

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      jwt_secret_key,
      jwt_ttl_hours,
      frontend_url,
      public_api_url,
      ai_service_url,
      http_client_timeout_secs,
      momo,
      order_ref_prefix,
      mail_sender,
      cors_allowed_origins,
      run_migrations,
      log_format,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn trim_url(url: String) -> String {
  url.trim_end_matches('/').to_string()
}
