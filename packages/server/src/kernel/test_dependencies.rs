// Mock implementations for testing
//
// These mocks stand in for the payment processor and record everything the
// domain publishes, so tests can assert on side effects without a network.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::deps::{PaymentSettings, ServerDeps};
use super::stream_hub::StreamHub;
use super::{BaseEventBus, BasePaymentGateway, EventFeed, PaymentRequest, PaymentSession};
use crate::common::OrderId;
use crate::domains::orders::order_topic;
use crate::domains::restaurants::MemoryRestaurantDirectory;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// Mock Payment Gateway
// =============================================================================

pub struct MockPaymentGateway {
    created: Arc<Mutex<Vec<PaymentRequest>>>,
    retrieved: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            created: Arc::new(Mutex::new(Vec::new())),
            retrieved: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Reference handed out for an order, so tests can forge webhooks.
    pub fn reference_for(order_id: OrderId) -> String {
        format!("pi_{}", order_id.as_uuid().simple())
    }

    pub fn created_requests(&self) -> Vec<PaymentRequest> {
        lock(&self.created).clone()
    }

    pub fn retrieved_references(&self) -> Vec<String> {
        lock(&self.retrieved).clone()
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePaymentGateway for MockPaymentGateway {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentSession> {
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        lock(&self.created).push(request.clone());
        let reference = Self::reference_for(request.order_id);
        Ok(PaymentSession {
            client_secret: Some(format!("{}_secret", reference)),
            reference,
            status: "requires_payment_method".to_string(),
        })
    }

    async fn retrieve_payment(&self, reference: &str) -> Result<PaymentSession> {
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        lock(&self.retrieved).push(reference.to_string());
        Ok(PaymentSession {
            reference: reference.to_string(),
            client_secret: Some(format!("{}_secret", reference)),
            status: "requires_payment_method".to_string(),
        })
    }
}

// =============================================================================
// Recording Event Bus
// =============================================================================

/// A published event as the bus saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl PublishedEvent {
    pub fn kind(&self) -> Option<&str> {
        self.payload.get("type").and_then(|t| t.as_str())
    }
}

/// Records every publish, then forwards to a real hub so subscriptions work.
#[derive(Clone, Default)]
pub struct RecordingEventBus {
    hub: StreamHub,
    published: Arc<Mutex<Vec<PublishedEvent>>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<PublishedEvent> {
        lock(&self.published).clone()
    }

    /// Events published on one order's topic, in order.
    pub fn events_for(&self, order_id: OrderId) -> Vec<PublishedEvent> {
        let topic = order_topic(order_id);
        lock(&self.published)
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    /// Event types seen on one order's topic, in order.
    pub fn kinds_for(&self, order_id: OrderId) -> Vec<String> {
        self.events_for(order_id)
            .iter()
            .filter_map(|e| e.kind().map(str::to_string))
            .collect()
    }

    pub fn count_kind(&self, order_id: OrderId, kind: &str) -> usize {
        self.kinds_for(order_id).iter().filter(|k| *k == kind).count()
    }

    pub fn clear(&self) {
        lock(&self.published).clear();
    }
}

#[async_trait]
impl BaseEventBus for RecordingEventBus {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        lock(&self.published).push(PublishedEvent {
            topic: topic.to_string(),
            payload: payload.clone(),
        });
        BaseEventBus::publish(&self.hub, topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> Result<EventFeed> {
        BaseEventBus::subscribe(&self.hub, topic).await
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub payments: Arc<MockPaymentGateway>,
    pub events: RecordingEventBus,
    pub payment_settings: PaymentSettings,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            payments: Arc::new(MockPaymentGateway::new()),
            events: RecordingEventBus::new(),
            payment_settings: PaymentSettings {
                allow_unsigned_webhooks: true,
                ..PaymentSettings::default()
            },
        }
    }

    /// Set a mock payment gateway
    pub fn mock_payments(mut self, gateway: MockPaymentGateway) -> Self {
        self.payments = Arc::new(gateway);
        self
    }

    /// Require signed webhooks with this secret
    pub fn webhook_secret(mut self, secret: &str) -> Self {
        self.payment_settings.webhook_secret = Some(secret.to_string());
        self
    }

    /// Reject unsigned webhooks the way a production deployment does
    pub fn require_signed_webhooks(mut self) -> Self {
        self.payment_settings.allow_unsigned_webhooks = false;
        self
    }

    /// Convert into in-memory ServerDeps; the directory is returned for seeding
    pub fn into_deps(self) -> (ServerDeps, Arc<MemoryRestaurantDirectory>) {
        ServerDeps::in_memory(
            Arc::new(self.events),
            self.payments,
            self.payment_settings,
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
