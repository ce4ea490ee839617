// bistro-core/src/lib.rs

//! Order, payment and inventory consistency workflows for the BistroBliss backend.
//!
//! The crate is storage-agnostic: workflows talk to a [`store::CommerceStore`] that hands out
//! transactions, and to a [`gateway::PaymentGateway`] for redirect payments. Each multi-step
//! operation is a named-step [`pipeline::Pipeline`] run against one transaction:
//!
//!  - **checkout**: price the cart, apply a voucher, create the order, reserve stock or
//!    register the gateway payment.
//!  - **lifecycle**: admin status changes, deducting stock on shipped/completed and restoring
//!    it when a deducted order is cancelled.
//!  - **reconcile**: idempotent handling of gateway payment notifications.
//!  - **vouchers**: claim-window guard and per-order redemption guard.
//!
//! Whether inventory moves is decided in exactly one place, [`domain::stock_effect`].

pub mod checkout;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod lifecycle;
pub mod pipeline;
pub mod reconcile;
pub mod store;
pub mod vouchers;
pub mod workflows;

pub use crate::checkout::{CheckoutReceipt, CheckoutRequest};
pub use crate::error::{CommerceError, CommerceResult, PipelineError};
pub use crate::gateway::{PaymentGateway, PaymentRedirect, PaymentRequest};
pub use crate::lifecycle::StatusChange;
pub use crate::pipeline::{Pipeline, PipelineControl, PipelineResult, StepFuture};
pub use crate::reconcile::{PaymentNotification, ReconcileOutcome};
pub use crate::store::{CommerceStore, MemoryStore, StoreTx};
pub use crate::workflows::{OrderWorkflows, WorkflowSettings};
