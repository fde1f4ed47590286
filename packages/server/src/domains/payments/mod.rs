//! Payments domain - bridges the card processor and the order lifecycle
//!
//! The processor itself is behind `BasePaymentGateway`. This domain starts
//! payment sessions for orders and turns processor webhooks into `paid` /
//! `payment_failed` lifecycle signals.

pub mod actions;
pub mod webhook;

pub use actions::{confirm_payment, handle_webhook, initiate_payment, report_payment_failure, PaymentStarted};
pub use webhook::{verify_webhook_signature, WebhookError, WebhookEvent};
