use serde::Serialize;
use tracing::{info, warn};

use super::webhook::{verify_webhook_signature, WebhookEvent};
use crate::common::{Actor, DomainError, DomainResult, OrderId, Role};
use crate::domains::orders::events::{publish_order_event, OrderEvent};
use crate::domains::orders::lifecycle::load_order;
use crate::domains::orders::models::{Order, OrderStatus};
use crate::domains::orders::store::{OrderGuard, OrderUpdate};
use crate::kernel::{PaymentRequest, ServerDeps};

/// Response to a payment initiation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentStarted {
    pub order_id: OrderId,
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub status: OrderStatus,
}

/// Opens (or reopens) a processor payment session for the client's order.
///
/// The first call creates a session and moves the order to
/// `pending_payment`; later calls return the existing session unchanged.
/// A gateway failure leaves the order untouched.
pub async fn initiate_payment(
    deps: &ServerDeps,
    actor: Actor,
    order_id: OrderId,
) -> DomainResult<PaymentStarted> {
    let order = load_order(deps, order_id).await?;
    if actor.role != Role::Client || !order.is_client(actor.id) {
        return Err(DomainError::forbidden("only the ordering client can pay"));
    }
    if !OrderStatus::CLIENT_EDITABLE.contains(&order.status) {
        return Err(DomainError::invalid(format!(
            "order cannot be paid in status {}",
            order.status
        )));
    }
    let amount_minor = order.amount_minor();
    if amount_minor <= 0 {
        return Err(DomainError::invalid("order total must be positive"));
    }

    if !order.payment_reference.is_empty() {
        let session = deps
            .payments
            .retrieve_payment(&order.payment_reference)
            .await
            .map_err(|e| DomainError::PaymentGateway(e.to_string()))?;
        return Ok(PaymentStarted {
            order_id,
            payment_intent_id: session.reference,
            client_secret: session.client_secret,
            status: order.status,
        });
    }

    let request = PaymentRequest {
        order_id,
        client_id: actor.id,
        amount_minor,
        currency: deps.payment_settings.currency.clone(),
    };
    let session = deps
        .payments
        .create_payment(&request)
        .await
        .map_err(|e| {
            warn!(order_id = %order_id, error = %e, "Payment gateway refused session");
            DomainError::PaymentGateway(e.to_string())
        })?;

    // Empty reference in the guard: a concurrent initiation must not be overwritten
    let guard = OrderGuard::in_statuses(&OrderStatus::CLIENT_EDITABLE)
        .owned_by(actor.id)
        .with_reference("");
    let updated = deps
        .orders
        .compare_and_set(
            order_id,
            &guard,
            &OrderUpdate::payment_started(session.reference.clone()),
        )
        .await?
        .ok_or_else(|| DomainError::conflict("order changed while starting payment"))?;

    info!(
        order_id = %order_id,
        reference = %session.reference,
        amount_minor,
        "Payment session created"
    );
    publish_order_event(deps.events.as_ref(), OrderEvent::PaymentCreated { order_id }).await;

    Ok(PaymentStarted {
        order_id,
        payment_intent_id: session.reference,
        client_secret: session.client_secret,
        status: updated.status,
    })
}

/// Marks an order paid when the processor confirms the matching session.
///
/// Returns `None` when no unpaid order carries that reference; the signal is
/// then only logged.
pub async fn confirm_payment(
    deps: &ServerDeps,
    order_id: OrderId,
    reference: &str,
) -> DomainResult<Option<Order>> {
    let guard = OrderGuard::in_statuses(&OrderStatus::CLIENT_EDITABLE).with_reference(reference);
    let paid = deps
        .orders
        .compare_and_set(order_id, &guard, &OrderUpdate::status(OrderStatus::Paid))
        .await?;

    match &paid {
        Some(_) => {
            info!(order_id = %order_id, reference, "Order paid");
            publish_order_event(deps.events.as_ref(), OrderEvent::Paid { order_id }).await;
        }
        None => warn!(order_id = %order_id, reference, "Unmatched payment confirmation"),
    }
    Ok(paid)
}

/// Tells subscribers a payment attempt failed. The order is not modified;
/// the client may retry or cancel.
pub async fn report_payment_failure(
    deps: &ServerDeps,
    order_id: OrderId,
    reference: &str,
) -> DomainResult<bool> {
    let matches = deps
        .orders
        .find(order_id)
        .await?
        .is_some_and(|order| order.payment_reference == reference);

    if matches {
        info!(order_id = %order_id, reference, "Payment failed");
        publish_order_event(deps.events.as_ref(), OrderEvent::PaymentFailed { order_id }).await;
    } else {
        warn!(order_id = %order_id, reference, "Unmatched payment failure");
    }
    Ok(matches)
}

/// Verifies and applies one processor webhook delivery.
pub async fn handle_webhook(
    deps: &ServerDeps,
    payload: &[u8],
    signature: Option<&str>,
) -> DomainResult<WebhookEvent> {
    let settings = &deps.payment_settings;
    match &settings.webhook_secret {
        Some(secret) => {
            let header =
                signature.ok_or_else(|| DomainError::invalid("missing Stripe-Signature"))?;
            verify_webhook_signature(payload, header, secret, chrono::Utc::now().timestamp())
                .map_err(|e| DomainError::invalid(e.to_string()))?;
        }
        None if settings.allow_unsigned_webhooks => {}
        None => {
            warn!("Rejecting webhook: no signing secret configured");
            return Err(DomainError::invalid("webhook signing secret is not configured"));
        }
    }

    let event = WebhookEvent::parse(payload).map_err(|e| DomainError::invalid(e.to_string()))?;
    match &event {
        WebhookEvent::Succeeded {
            order_id,
            reference,
        } => {
            confirm_payment(deps, *order_id, reference).await?;
        }
        WebhookEvent::Failed {
            order_id,
            reference,
        } => {
            report_payment_failure(deps, *order_id, reference).await?;
        }
        WebhookEvent::Ignored { kind } => {
            tracing::debug!(kind = %kind, "Ignoring webhook event");
        }
    }
    Ok(event)
}
