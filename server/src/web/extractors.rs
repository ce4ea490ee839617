// bistro_server/src/web/extractors.rs

//! Request identity. Handlers name the level of access they need in their signature:
//! `AuthenticatedUser` and `AdminUser` reject the request, `MaybeUser` lets guests through.

use crate::errors::AppError;
use crate::services::auth_service::{self, Claims};
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
  pub user_id: i64,
  pub username: String,
  pub is_admin: bool,
}

impl From<Claims> for AuthenticatedUser {
  fn from(claims: Claims) -> Self {
    Self {
      user_id: claims.sub,
      username: claims.username,
      is_admin: claims.is_admin,
    }
  }
}

/// An authenticated user whose token carries the admin flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser(pub AuthenticatedUser);

/// `None` when the request carries no Authorization header. A header that is present but
/// invalid is still rejected with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl MaybeUser {
  pub fn user_id(&self) -> Option<i64> {
    self.0.as_ref().map(|user| user.user_id)
  }
}

fn authenticate(req: &HttpRequest) -> Result<Option<AuthenticatedUser>, AppError> {
  let Some(value) = req.headers().get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let value = value
    .to_str()
    .map_err(|_| AppError::Auth("Invalid token format".to_string()))?;
  let token = value
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|token| !token.is_empty())
    .ok_or_else(|| AppError::Auth("Invalid token format".to_string()))?;

  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not registered".to_string()))?;
  let claims = auth_service::decode_token(&state.config.jwt_secret_key, token)?;
  Ok(Some(claims.into()))
}

fn require_user(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  authenticate(req)?.ok_or_else(|| AppError::Auth("Authorization header required".to_string()))
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(require_user(req))
  }
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(require_user(req).and_then(|user| {
      if user.is_admin {
        Ok(AdminUser(user))
      } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
      }
    }))
  }
}

impl FromRequest for MaybeUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(authenticate(req).map(MaybeUser))
  }
}
