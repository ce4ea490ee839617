// bistro-core/src/gateway.rs

//! Outbound payment gateway seam used by the redirect checkout path.

use crate::error::CommerceResult;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
  pub order_id: i64,
  /// Amount to charge, after discount.
  pub amount: i64,
}

/// Where to send the customer, and the reference the gateway will echo back in its callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRedirect {
  pub pay_url: String,
  pub order_reference: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Registers the payment with the gateway. Called inside the checkout transaction, so an
  /// error here rolls the freshly created order back.
  async fn create_payment(&self, request: &PaymentRequest) -> CommerceResult<PaymentRedirect>;
}
