// bistro-core/src/workflows.rs

//! `OrderWorkflows`: the pipelines built once at startup, plus the store and gateway they run against.

use crate::checkout::{self, CheckoutContext, CheckoutReceipt, CheckoutRequest};
use crate::domain::{ClaimedVoucher, OrderStatus};
use crate::error::{CommerceError, CommerceResult};
use crate::gateway::PaymentGateway;
use crate::lifecycle::{self, StatusChange, StatusUpdateContext};
use crate::pipeline::Pipeline;
use crate::reconcile::{self, PaymentNotification, ReconcileContext, ReconcileOutcome};
use crate::store::CommerceStore;
use crate::vouchers;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
  /// Merchant prefix of gateway order references (`<prefix>_<orderID>_<requestID>`).
  pub order_ref_prefix: String,
}

impl Default for WorkflowSettings {
  fn default() -> Self {
    Self {
      order_ref_prefix: "BISTROBLISS".to_string(),
    }
  }
}

pub struct OrderWorkflows {
  store: Arc<dyn CommerceStore>,
  gateway: Arc<dyn PaymentGateway>,
  settings: WorkflowSettings,
  checkout: Pipeline<CheckoutContext, CommerceError>,
  status_update: Pipeline<StatusUpdateContext, CommerceError>,
  reconcile: Pipeline<ReconcileContext, CommerceError>,
}

impl OrderWorkflows {
  pub fn new(store: Arc<dyn CommerceStore>, gateway: Arc<dyn PaymentGateway>, settings: WorkflowSettings) -> Self {
    Self {
      store,
      gateway,
      settings,
      checkout: checkout::build_pipeline(),
      status_update: lifecycle::build_pipeline(),
      reconcile: reconcile::build_pipeline(),
    }
  }

  pub async fn checkout(&self, request: CheckoutRequest, now: DateTime<Utc>) -> CommerceResult<CheckoutReceipt> {
    checkout::execute(&self.checkout, self.store.as_ref(), self.gateway.clone(), request, now).await
  }

  pub async fn update_status(&self, order_id: i64, target: OrderStatus) -> CommerceResult<StatusChange> {
    lifecycle::execute(&self.status_update, self.store.as_ref(), order_id, target).await
  }

  pub async fn reconcile(&self, notification: PaymentNotification) -> CommerceResult<ReconcileOutcome> {
    reconcile::execute(
      &self.reconcile,
      self.store.as_ref(),
      &self.settings.order_ref_prefix,
      notification,
    )
    .await
  }

  pub async fn claim_voucher(&self, voucher_id: i64, user_id: i64, now: DateTime<Utc>) -> CommerceResult<ClaimedVoucher> {
    vouchers::claim(self.store.as_ref(), voucher_id, user_id, now).await
  }
}
