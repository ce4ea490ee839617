// bistro_server/src/services/auth_service.rs

//! Password hashing and bearer-token handling.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

/// Hashes a plain-text password using Argon2 with a fresh random salt.
///
/// Returns the PHC string form of the hash.
#[instrument(name = "service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// Verifies a plain-text password against a stored Argon2 hash.
///
/// `Ok(false)` means the password does not match. A malformed stored hash is an internal error.
#[instrument(
  name = "service::verify_password",
  skip(hashed_password_str, provided_password),
  err(Display),
  fields(hash_len = hashed_password_str.len())
)]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

/// Bearer token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// User id.
  pub sub: i64,
  pub username: String,
  pub is_admin: bool,
  pub iat: i64,
  pub exp: i64,
}

/// Signs an HS256 token for the user, valid for `ttl_hours` from `now`.
pub fn issue_token(
  secret: &str,
  ttl_hours: i64,
  user_id: i64,
  username: &str,
  is_admin: bool,
  now: DateTime<Utc>,
) -> Result<String, AppError> {
  let claims = Claims {
    sub: user_id,
    username: username.to_string(),
    is_admin,
    iat: now.timestamp(),
    exp: (now + Duration::hours(ttl_hours)).timestamp(),
  };
  encode(
    &Header::new(Algorithm::HS256),
    &claims,
    &EncodingKey::from_secret(secret.as_bytes()),
  )
  .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Validates signature and expiry of an HS256 token.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
  let validation = Validation::new(Algorithm::HS256);
  decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
    .map(|data| data.claims)
    .map_err(|e| {
      debug!(error = %e, "Rejected bearer token.");
      AppError::Auth("Invalid or expired token".to_string())
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "test-secret";

  #[test]
  fn password_hash_round_trip() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password(&hash, "correct horse").unwrap());
    assert!(!verify_password(&hash, "battery staple").unwrap());
    assert!(!verify_password(&hash, "").unwrap());
  }

  #[test]
  fn empty_password_cannot_be_hashed() {
    assert!(matches!(hash_password(""), Err(AppError::Validation(_))));
  }

  #[test]
  fn issued_token_decodes_to_same_identity() {
    let token = issue_token(SECRET, 24, 7, "alice", true, Utc::now()).unwrap();
    let claims = decode_token(SECRET, &token).unwrap();
    assert_eq!(claims.sub, 7);
    assert_eq!(claims.username, "alice");
    assert!(claims.is_admin);
  }

  #[test]
  fn token_signed_with_other_secret_is_rejected() {
    let token = issue_token("other-secret", 24, 7, "alice", false, Utc::now()).unwrap();
    assert!(matches!(decode_token(SECRET, &token), Err(AppError::Auth(_))));
  }

  #[test]
  fn expired_token_is_rejected() {
    let issued = Utc::now() - Duration::hours(48);
    let token = issue_token(SECRET, 24, 7, "alice", false, issued).unwrap();
    assert!(matches!(decode_token(SECRET, &token), Err(AppError::Auth(_))));
  }
}
