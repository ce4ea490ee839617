// bistro_server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::db::is_unique_violation;
use crate::errors::{AppError, Result};
use crate::models::{ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest, User};
use crate::services::auth_service;
use crate::services::password_reset::{self, ResetMailSettings};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[instrument(
    name = "handler::register",
    skip(app_state, req_payload),
    fields(username = %req_payload.username)
)]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
  let req = req_payload.into_inner();
  let username = req.username.trim();
  let email = req.email.trim();
  if username.is_empty() || email.is_empty() || req.password.is_empty() {
    return Err(AppError::Validation("Username, email and password are required".to_string()));
  }
  if !email.contains('@') {
    return Err(AppError::Validation("Invalid email address".to_string()));
  }

  let password_hash = auth_service::hash_password(&req.password)?;
  let user_id: i64 =
    sqlx::query_scalar("INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id")
      .bind(username)
      .bind(email)
      .bind(&password_hash)
      .fetch_one(&app_state.db_pool)
      .await
      .map_err(|e| {
        if is_unique_violation(&e) {
          AppError::Validation("Username or email is already registered".to_string())
        } else {
          AppError::Sqlx(e)
        }
      })?;

  info!(user_id, "User registered.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Registration successful",
      "user_id": user_id,
  })))
}

#[instrument(
    name = "handler::login",
    skip(app_state, req_payload),
    fields(username = %req_payload.username)
)]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
  let user: Option<User> = sqlx::query_as(
    "SELECT id, username, email, password_hash, is_admin, created_at FROM users WHERE username = $1",
  )
  .bind(req_payload.username.trim())
  .fetch_optional(&app_state.db_pool)
  .await?;

  let Some(user) = user else {
    return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
  };
  if !auth_service::verify_password(&user.password_hash, &req_payload.password)? {
    warn!(user_id = user.id, "Password mismatch on login.");
    return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
  }

  let config = &app_state.config;
  let token = auth_service::issue_token(
    &config.jwt_secret_key,
    config.jwt_ttl_hours,
    user.id,
    &user.username,
    user.is_admin,
    Utc::now(),
  )?;

  info!(user_id = user.id, is_admin = user.is_admin, "User logged in.");
  Ok(HttpResponse::Ok().json(LoginResponse {
    id: user.id,
    email: user.email,
    token,
    username: user.username,
    is_admin: user.is_admin,
  }))
}

/// Tokens are stateless; the client drops its copy.
pub async fn logout_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "message": "Logged out successfully" }))
}

#[instrument(name = "handler::forgot_password", skip(app_state, req_payload))]
pub async fn forgot_password_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse> {
  let settings = ResetMailSettings {
    sender: &app_state.config.mail_sender,
    frontend_url: &app_state.config.frontend_url,
  };
  // The answer never depends on whether the account exists or the mail went out.
  if let Err(e) = password_reset::request_password_reset(
    &app_state.db_pool,
    app_state.mailer.as_ref(),
    settings,
    req_payload.email.trim(),
    Utc::now(),
  )
  .await
  {
    warn!(error = %e, "Password reset request could not be completed.");
  }

  Ok(HttpResponse::Ok().json(json!({
      "message": "If the email exists, a password reset link has been sent."
  })))
}

#[instrument(name = "handler::reset_password", skip(app_state, req_payload))]
pub async fn reset_password_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse> {
  let req = req_payload.into_inner();
  if req.token.trim().is_empty() || req.password.is_empty() {
    return Err(AppError::Validation("Token and new password are required".to_string()));
  }
  password_reset::reset_password(&app_state.db_pool, req.token.trim(), &req.password, Utc::now()).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Password has been reset successfully" })))
}
