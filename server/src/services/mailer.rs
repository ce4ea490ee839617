// bistro_server/src/services/mailer.rs
use crate::errors::AppError;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub html_body: String,
}

/// Outbound email. Delivery is best effort; callers decide whether a failure matters.
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, message: &EmailMessage) -> Result<(), AppError>;
}

/// Writes messages to the log instead of a relay.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
    let body_preview = message.html_body.chars().take(50).collect::<String>() + "...";
    info!(
      to = %message.to,
      from = %message.from,
      subject = %message.subject,
      %body_preview,
      "Email handed to log mailer."
    );
    Ok(())
  }
}

pub fn password_reset_email(sender: &str, frontend_url: &str, to: &str, token: &str) -> EmailMessage {
  let link = format!("{}/reset-password/{}", frontend_url, token);
  EmailMessage {
    to: to.to_string(),
    from: sender.to_string(),
    subject: "Reset your BistroBliss password".to_string(),
    html_body: format!(
      "<p>We received a request to reset your password.</p>\
       <p><a href=\"{link}\">Reset password</a></p>\
       <p>This link expires in 15 minutes. If you did not ask for it, ignore this email.</p>"
    ),
  }
}
