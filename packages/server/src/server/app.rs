//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domains::auth::JwtService;
use crate::kernel::{ServerDeps, StreamHub};
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    accept_order_handler, available_orders_handler, create_order_handler, health_handler,
    my_location_handler, my_orders_handler, order_detail_handler, order_events_handler,
    pay_order_handler, post_location_handler, stripe_webhook_handler, update_items_handler,
    update_status_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: Arc<ServerDeps>,
    pub jwt_service: Arc<JwtService>,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

fn api_routes() -> Router {
    Router::new()
        .route("/orders", post(create_order_handler))
        .route("/orders/my", get(my_orders_handler))
        .route("/orders/:id", get(order_detail_handler))
        .route("/orders/:id/status", patch(update_status_handler))
        .route("/orders/:id/items", put(update_items_handler))
        .route("/orders/:id/pay", post(pay_order_handler))
        .route("/orders/:id/events", get(order_events_handler))
        .route("/courier/orders/available", get(available_orders_handler))
        .route("/courier/orders/:id/accept", post(accept_order_handler))
        .route(
            "/courier/location",
            get(my_location_handler).post(post_location_handler),
        )
        .route("/stripe/webhook", post(stripe_webhook_handler))
}

/// Build the Axum application router
pub fn build_app(
    deps: Arc<ServerDeps>,
    jwt_service: Arc<JwtService>,
    allowed_origins: &[String],
) -> Router {
    let app_state = AxumAppState {
        deps,
        jwt_service: jwt_service.clone(),
    };

    Router::new()
        .nest("/api/v1", api_routes())
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(app_state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Periodically drops hub channels nobody listens to anymore.
pub fn spawn_stream_hub_cleanup(hub: StreamHub, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = hub.cleanup().await;
            if removed > 0 {
                tracing::debug!(removed, "Swept idle stream hub topics");
            }
        }
    })
}
