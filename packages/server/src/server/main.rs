// Main entry point for API server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use server_core::domains::auth::JwtService;
use server_core::kernel::{
    BaseEventBus, BasePaymentGateway, DisabledPaymentGateway, NatsEventBus, PaymentSettings,
    ServerDeps, StreamHub, StripePaymentGateway,
};
use server_core::server::{build_app, spawn_stream_hub_cleanup};
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting food delivery API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Event bus: NATS when configured, in-process hub otherwise
    let events: Arc<dyn BaseEventBus> = match &config.nats_url {
        Some(url) => {
            tracing::info!(url = %url, "Connecting to NATS...");
            Arc::new(NatsEventBus::connect(url).await?)
        }
        None => {
            let hub = StreamHub::new();
            spawn_stream_hub_cleanup(hub.clone(), Duration::from_secs(60));
            tracing::info!("Using in-process event hub");
            Arc::new(hub)
        }
    };

    // Payment gateway
    let payments: Arc<dyn BasePaymentGateway> = match &config.stripe_secret_key {
        Some(key) => Arc::new(StripePaymentGateway::new(key.clone())),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, payments disabled");
            Arc::new(DisabledPaymentGateway)
        }
    };
    let payment_settings = PaymentSettings {
        currency: config.payment_currency.clone(),
        webhook_secret: config.stripe_webhook_secret.clone(),
        allow_unsigned_webhooks: false,
    };

    let deps = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connected");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");

            ServerDeps::postgres(pool, config.geo_ranking, events, payments, payment_settings)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores (data is not persisted)");
            ServerDeps::in_memory(events, payments, payment_settings).0
        }
    };

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let app = build_app(Arc::new(deps), jwt_service, &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
