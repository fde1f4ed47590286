//! Stripe webhook ingestion. No JWT: authenticity comes from the
//! `Stripe-Signature` header when a webhook secret is configured.

use axum::{body::Bytes, extract::Extension, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::domains::payments::{handle_webhook, WebhookEvent};
use crate::server::app::AxumAppState;
use crate::server::error::ApiResult;

pub async fn stripe_webhook_handler(
    Extension(state): Extension<AxumAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    let event = handle_webhook(&state.deps, &body, signature).await?;
    let handled = !matches!(event, WebhookEvent::Ignored { .. });
    Ok(Json(json!({ "received": true, "handled": handled })))
}
