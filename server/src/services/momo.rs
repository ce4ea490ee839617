// bistro_server/src/services/momo.rs

//! MoMo wallet gateway: signed "create payment" requests and IPN signature checks.
//!
//! Both directions sign a canonical `key=value&...` string with HMAC-SHA256 over the
//! merchant secret key, hex encoded. Field order is fixed by MoMo and differs between
//! the create request and the IPN.

use crate::config::{AppConfig, MomoConfig};
use async_trait::async_trait;
use bistro_core::domain::OrderReference;
use bistro_core::{CommerceError, CommerceResult, PaymentGateway, PaymentNotification, PaymentRedirect, PaymentRequest};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, instrument, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TYPE: &str = "captureWallet";
const ORDER_INFO: &str = "Payment for your order";

/// HMAC-SHA256 of `raw` under `secret_key`, lowercase hex.
pub fn sign(secret_key: &str, raw: &str) -> String {
  let mut mac = mac_for(secret_key);
  mac.update(raw.as_bytes());
  hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of a hex signature against `raw`.
pub fn verify_signature(secret_key: &str, raw: &str, signature_hex: &str) -> bool {
  let Ok(expected) = hex::decode(signature_hex.trim()) else {
    return false;
  };
  let mut mac = mac_for(secret_key);
  mac.update(raw.as_bytes());
  mac.verify_slice(&expected).is_ok()
}

fn mac_for(secret_key: &str) -> HmacSha256 {
  // HMAC takes keys of any length, so this never falls back.
  HmacSha256::new_from_slice(secret_key.as_bytes()).unwrap_or_else(|_| HmacSha256::new(&Default::default()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
  pub partner_code: String,
  pub request_id: String,
  pub amount: i64,
  pub order_id: String,
  pub order_info: String,
  pub redirect_url: String,
  pub ipn_url: String,
  pub request_type: String,
  pub extra_data: String,
  pub lang: String,
  pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentResponse {
  result_code: i64,
  #[serde(default)]
  message: String,
  #[serde(default)]
  pay_url: Option<String>,
}

/// Instant payment notification posted by MoMo to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomoIpn {
  #[serde(default)]
  pub partner_code: String,
  pub order_id: String,
  #[serde(default)]
  pub request_id: String,
  #[serde(default)]
  pub amount: i64,
  #[serde(default)]
  pub order_info: String,
  #[serde(default)]
  pub order_type: String,
  #[serde(default)]
  pub trans_id: i64,
  pub result_code: i64,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub pay_type: String,
  #[serde(default)]
  pub response_time: i64,
  #[serde(default)]
  pub extra_data: String,
  #[serde(default)]
  pub signature: String,
}

impl MomoIpn {
  pub fn notification(&self) -> PaymentNotification {
    PaymentNotification {
      order_reference: self.order_id.clone(),
      result_code: self.result_code,
    }
  }

  fn raw_signature(&self, access_key: &str) -> String {
    format!(
      "accessKey={}&amount={}&extraData={}&message={}&orderId={}&orderInfo={}&orderType={}&partnerCode={}&payType={}&requestId={}&responseTime={}&resultCode={}&transId={}",
      access_key,
      self.amount,
      self.extra_data,
      self.message,
      self.order_id,
      self.order_info,
      self.order_type,
      self.partner_code,
      self.pay_type,
      self.request_id,
      self.response_time,
      self.result_code,
      self.trans_id
    )
  }
}

pub struct MomoGateway {
  client: reqwest::Client,
  config: MomoConfig,
  redirect_url: String,
  ipn_url: String,
  order_ref_prefix: String,
}

impl MomoGateway {
  pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
    Self {
      client,
      config: config.momo.clone(),
      redirect_url: format!("{}/order-result", config.frontend_url),
      ipn_url: format!("{}/api/webhook/momo", config.public_api_url),
      order_ref_prefix: config.order_ref_prefix.clone(),
    }
  }

  pub fn verifies_ipn(&self) -> bool {
    self.config.verify_ipn_signature
  }

  /// Builds and signs the create request for one order and gateway request id.
  pub fn build_request(&self, request: &PaymentRequest, request_id: &str) -> CreatePaymentRequest {
    let order_id = OrderReference::new(request.order_id, request_id).format(&self.order_ref_prefix);
    let raw = format!(
      "accessKey={}&amount={}&extraData={}&ipnUrl={}&orderId={}&orderInfo={}&partnerCode={}&redirectUrl={}&requestId={}&requestType={}",
      self.config.access_key,
      request.amount,
      "",
      self.ipn_url,
      order_id,
      ORDER_INFO,
      self.config.partner_code,
      self.redirect_url,
      request_id,
      REQUEST_TYPE
    );
    CreatePaymentRequest {
      partner_code: self.config.partner_code.clone(),
      request_id: request_id.to_string(),
      amount: request.amount,
      order_id,
      order_info: ORDER_INFO.to_string(),
      redirect_url: self.redirect_url.clone(),
      ipn_url: self.ipn_url.clone(),
      request_type: REQUEST_TYPE.to_string(),
      extra_data: String::new(),
      lang: "vi".to_string(),
      signature: sign(&self.config.secret_key, &raw),
    }
  }

  pub fn verify_ipn(&self, ipn: &MomoIpn) -> bool {
    verify_signature(
      &self.config.secret_key,
      &ipn.raw_signature(&self.config.access_key),
      &ipn.signature,
    )
  }
}

#[async_trait]
impl PaymentGateway for MomoGateway {
  #[instrument(
    name = "service::momo_create_payment",
    skip(self, request),
    fields(order_id = request.order_id, amount = request.amount),
    err(Display)
  )]
  async fn create_payment(&self, request: &PaymentRequest) -> CommerceResult<PaymentRedirect> {
    if !self.config.is_configured() {
      return Err(CommerceError::Gateway("MoMo credentials are not configured".to_string()));
    }

    let body = self.build_request(request, &Uuid::new_v4().to_string());
    let response = self
      .client
      .post(&self.config.endpoint)
      .json(&body)
      .send()
      .await
      .map_err(|e| CommerceError::Gateway(format!("MoMo request failed: {}", e)))?;
    let http_status = response.status();
    let parsed: CreatePaymentResponse = response
      .json()
      .await
      .map_err(|e| CommerceError::Gateway(format!("unreadable MoMo response (HTTP {}): {}", http_status, e)))?;

    if parsed.result_code != 0 {
      warn!(result_code = parsed.result_code, message = %parsed.message, "MoMo rejected payment creation.");
      return Err(CommerceError::Gateway(format!(
        "MoMo payment creation failed (code {}): {}",
        parsed.result_code, parsed.message
      )));
    }
    let pay_url = parsed
      .pay_url
      .filter(|url| !url.is_empty())
      .ok_or_else(|| CommerceError::Gateway("MoMo response carried no payUrl".to_string()))?;

    info!(order_reference = %body.order_id, "MoMo payment created.");
    Ok(PaymentRedirect {
      pay_url,
      order_reference: body.order_id,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  const ACCESS_KEY: &str = "F8BBA842ECF85";
  const SECRET_KEY: &str = "K951B6PE1waDMi640xX08PD3vg6EkVlz";

  fn gateway(extra: &[(&str, &str)]) -> MomoGateway {
    let mut vars: HashMap<String, String> = [
      ("DATABASE_URL", "postgres://localhost/bistro"),
      ("JWT_SECRET_KEY", "secret"),
      ("FRONTEND_URL", "https://bistro.example/"),
      ("PUBLIC_API_URL", "https://api.bistro.example"),
      ("MOMO_PARTNER_CODE", "MOMO"),
      ("MOMO_ACCESS_KEY", ACCESS_KEY),
      ("MOMO_SECRET_KEY", SECRET_KEY),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
      vars.insert(k.to_string(), v.to_string());
    }
    let config = AppConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();
    MomoGateway::new(reqwest::Client::new(), &config)
  }

  fn sample_ipn() -> MomoIpn {
    MomoIpn {
      partner_code: "MOMO".to_string(),
      order_id: "BISTROBLISS_42_req-1".to_string(),
      request_id: "req-1".to_string(),
      amount: 80_000,
      order_info: ORDER_INFO.to_string(),
      order_type: "momo_wallet".to_string(),
      trans_id: 4_088_878_653,
      result_code: 0,
      message: "Successful.".to_string(),
      pay_type: "qr".to_string(),
      response_time: 1_721_720_663_942,
      extra_data: String::new(),
      signature: "48fcf42289d38b4330562a5cebdae4ecfda0c2cc3dab0bd54db7cdbffc3295c9".to_string(),
    }
  }

  #[test]
  fn create_request_is_signed_over_canonical_fields() {
    let request = gateway(&[]).build_request(
      &PaymentRequest {
        order_id: 42,
        amount: 80_000,
      },
      "req-1",
    );
    assert_eq!(request.order_id, "BISTROBLISS_42_req-1");
    assert_eq!(request.redirect_url, "https://bistro.example/order-result");
    assert_eq!(request.ipn_url, "https://api.bistro.example/api/webhook/momo");
    assert_eq!(request.request_type, "captureWallet");
    assert_eq!(
      request.signature,
      "ea1ab526a2e9980a5c6b9ad008ec39246b4ab1258c92e7c26ee44df838e924da"
    );
  }

  #[test]
  fn create_request_serializes_camel_case() {
    let request = gateway(&[]).build_request(&PaymentRequest { order_id: 1, amount: 5 }, "r");
    let value = serde_json::to_value(&request).unwrap();
    for key in ["partnerCode", "requestId", "orderId", "orderInfo", "redirectUrl", "ipnUrl", "requestType", "extraData"] {
      assert!(value.get(key).is_some(), "missing {}", key);
    }
  }

  #[test]
  fn ipn_signature_verifies_and_detects_tampering() {
    let gateway = gateway(&[]);
    let ipn = sample_ipn();
    assert!(gateway.verify_ipn(&ipn));

    let mut tampered = sample_ipn();
    tampered.result_code = 1006;
    assert!(!gateway.verify_ipn(&tampered));

    let mut garbage = sample_ipn();
    garbage.signature = "not-hex".to_string();
    assert!(!gateway.verify_ipn(&garbage));
  }

  #[test]
  fn ipn_maps_to_notification() {
    let notification = sample_ipn().notification();
    assert_eq!(notification.order_reference, "BISTROBLISS_42_req-1");
    assert!(notification.is_success());
  }

  #[actix_rt::test]
  async fn unconfigured_gateway_fails_without_calling_out() {
    let gateway = gateway(&[("MOMO_SECRET_KEY", "")]);
    let err = gateway
      .create_payment(&PaymentRequest {
        order_id: 1,
        amount: 10_000,
      })
      .await
      .unwrap_err();
    assert!(matches!(err, CommerceError::Gateway(_)));
  }
}
