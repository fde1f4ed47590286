//! Server dependencies for domain actions (using traits for testability)
//!
//! Every store and outside service sits behind a trait object so the same
//! actions run against Postgres in production and in-memory stores in tests.

use sqlx::PgPool;
use std::sync::Arc;

use crate::domains::dispatch::{GeoRanking, HaversineRanking, PostgresGeoRanking};
use crate::domains::orders::{MemoryOrderStore, OrderStore, PgOrderStore};
use crate::domains::restaurants::{MemoryRestaurantDirectory, PgRestaurantDirectory, RestaurantDirectory};
use crate::domains::tracking::{LocationStore, MemoryLocationStore, PgLocationStore};
use crate::kernel::{BaseEventBus, BasePaymentGateway};

/// Which geo ranking backs the available-orders query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoRankingKind {
    #[default]
    Haversine,
    Postgres,
}

impl std::str::FromStr for GeoRankingKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haversine" | "" => Ok(Self::Haversine),
            "postgres" | "postgis" => Ok(Self::Postgres),
            other => anyhow::bail!("unknown geo ranking: {}", other),
        }
    }
}

/// Payment knobs that are not part of the gateway itself.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// ISO currency code sent with every payment session.
    pub currency: String,
    /// When set, webhook deliveries must carry a valid signature.
    pub webhook_secret: Option<String>,
    /// Accept unsigned deliveries when no secret is set. Only for local
    /// gateways whose signals cannot move real money.
    pub allow_unsigned_webhooks: bool,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            webhook_secret: None,
            allow_unsigned_webhooks: false,
        }
    }
}

/// Dependencies accessible to every domain action
#[derive(Clone)]
pub struct ServerDeps {
    pub orders: Arc<dyn OrderStore>,
    pub restaurants: Arc<dyn RestaurantDirectory>,
    pub locations: Arc<dyn LocationStore>,
    pub geo: Arc<dyn GeoRanking>,
    /// Per-order event fan-out (in-process hub or NATS)
    pub events: Arc<dyn BaseEventBus>,
    pub payments: Arc<dyn BasePaymentGateway>,
    pub payment_settings: PaymentSettings,
    /// Present only when running against Postgres (health checks use it)
    pub db_pool: Option<PgPool>,
}

impl ServerDeps {
    /// Postgres-backed stores sharing one pool.
    pub fn postgres(
        pool: PgPool,
        geo: GeoRankingKind,
        events: Arc<dyn BaseEventBus>,
        payments: Arc<dyn BasePaymentGateway>,
        payment_settings: PaymentSettings,
    ) -> Self {
        let geo: Arc<dyn GeoRanking> = match geo {
            GeoRankingKind::Haversine => Arc::new(HaversineRanking),
            GeoRankingKind::Postgres => Arc::new(PostgresGeoRanking::new(pool.clone())),
        };

        Self {
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            restaurants: Arc::new(PgRestaurantDirectory::new(pool.clone())),
            locations: Arc::new(PgLocationStore::new(pool.clone())),
            geo,
            events,
            payments,
            payment_settings,
            db_pool: Some(pool),
        }
    }

    /// Process-local stores. The restaurant directory is returned so the
    /// caller can seed it.
    pub fn in_memory(
        events: Arc<dyn BaseEventBus>,
        payments: Arc<dyn BasePaymentGateway>,
        payment_settings: PaymentSettings,
    ) -> (Self, Arc<MemoryRestaurantDirectory>) {
        let directory = Arc::new(MemoryRestaurantDirectory::new());
        let deps = Self {
            orders: Arc::new(MemoryOrderStore::new()),
            restaurants: directory.clone(),
            locations: Arc::new(MemoryLocationStore::new()),
            geo: Arc::new(HaversineRanking),
            events,
            payments,
            payment_settings,
            db_pool: None,
        };
        (deps, directory)
    }
}
