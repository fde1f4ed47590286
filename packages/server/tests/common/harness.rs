//! Test harnesses for integration testing.
//!
//! `TestHarness` wires every domain action against in-memory stores, a
//! recording event bus and a mock payment gateway. `PgHarness` runs the same
//! stores against a shared Postgres container (tests using it are `#[ignore]`d
//! since they need Docker).

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use server_core::common::{Actor, Role, UserId};
use server_core::domains::auth::JwtService;
use server_core::domains::restaurants::MemoryRestaurantDirectory;
use server_core::kernel::{
    GeoRankingKind, MockPaymentGateway, PaymentSettings, RecordingEventBus, ServerDeps,
    TestDependencies,
};
use server_core::server::build_app;

pub const TEST_JWT_SECRET: &str = "test_secret";
pub const TEST_JWT_ISSUER: &str = "foodradar-test";

fn init_tracing() {
    // Run tests with: RUST_LOG=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory harness.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &mut TestHarness) {
///     let client = ctx.client();
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    pub deps: Arc<ServerDeps>,
    /// Seed restaurants and dishes here.
    pub directory: Arc<MemoryRestaurantDirectory>,
    pub events: RecordingEventBus,
    pub payments: Arc<MockPaymentGateway>,
    pub jwt_service: Arc<JwtService>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_dependencies(TestDependencies::new())
    }

    pub fn with_dependencies(test_deps: TestDependencies) -> Self {
        init_tracing();
        let events = test_deps.events.clone();
        let payments = test_deps.payments.clone();
        let (deps, directory) = test_deps.into_deps();

        Self {
            deps: Arc::new(deps),
            directory,
            events,
            payments,
            jwt_service: Arc::new(JwtService::new(TEST_JWT_SECRET, TEST_JWT_ISSUER.to_string())),
        }
    }

    pub fn client(&self) -> Actor {
        Actor::client(UserId::new())
    }

    pub fn courier(&self) -> Actor {
        Actor::courier(UserId::new())
    }

    pub fn restaurant_owner(&self) -> Actor {
        Actor::restaurant(UserId::new())
    }

    pub fn admin(&self) -> Actor {
        Actor::admin(UserId::new())
    }

    /// Bearer token for `actor`.
    pub fn token(&self, actor: Actor) -> String {
        self.jwt_service
            .create_token(actor.id, actor.role)
            .expect("Failed to create test token")
    }

    pub fn token_for(&self, user_id: UserId, role: Role) -> String {
        self.token(Actor::new(user_id, role))
    }

    /// Full HTTP router over this harness's dependencies.
    pub fn app(&self) -> Router {
        build_app(self.deps.clone(), self.jwt_service.clone(), &[])
    }
}

// =============================================================================
// Postgres
// =============================================================================

/// Shared test infrastructure that persists across all tests.
/// The container is started once and reused, migrations run once.
struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

/// Global shared infrastructure - initialized once, reused by all tests.
static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        init_tracing();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Postgres-backed harness. Each test gets a fresh pool on the shared
/// database; tests isolate themselves by creating their own users and rows.
pub struct PgHarness {
    pub db_pool: PgPool,
    pub deps: Arc<ServerDeps>,
    pub events: RecordingEventBus,
}

impl AsyncTestContext for PgHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create Postgres harness")
    }
}

impl PgHarness {
    pub async fn new() -> Result<Self> {
        Self::with_geo(GeoRankingKind::Haversine).await
    }

    pub async fn with_geo(geo: GeoRankingKind) -> Result<Self> {
        let infra = SharedTestInfra::get().await;
        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        let events = RecordingEventBus::new();
        let deps = ServerDeps::postgres(
            db_pool.clone(),
            geo,
            Arc::new(events.clone()),
            Arc::new(MockPaymentGateway::new()),
            PaymentSettings::default(),
        );

        Ok(Self {
            db_pool,
            deps: Arc::new(deps),
            events,
        })
    }
}
