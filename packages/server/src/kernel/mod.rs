//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod nats;
pub mod stream_hub;
pub mod stripe_client;
pub mod test_dependencies;
pub mod traits;

pub use deps::{GeoRankingKind, PaymentSettings, ServerDeps};
pub use nats::NatsEventBus;
pub use stream_hub::StreamHub;
pub use stripe_client::{DisabledPaymentGateway, StripePaymentGateway};
pub use test_dependencies::{
    MockPaymentGateway, PublishedEvent, RecordingEventBus, TestDependencies,
};
pub use traits::*;
