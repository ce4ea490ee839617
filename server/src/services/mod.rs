// bistro_server/src/services/mod.rs

pub mod ai_client;
pub mod auth_service;
pub mod mailer;
pub mod momo;
pub mod password_reset;
