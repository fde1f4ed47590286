//! SSE order event feed.
//!
//! GET /api/v1/orders/:id/events?token=JWT
//!
//! Auth strategy: JWT passed as `?token=` query param, falling back to the
//! Authorization header. EventSource can't send custom headers, so browser
//! clients append the token to the URL.

use std::convert::Infallible;

use axum::{
    extract::{Extension, Path, Query},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::common::OrderId;
use crate::domains::orders::actions::get_order_detail;
use crate::domains::orders::order_topic;
use crate::kernel::FeedItem;
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::middleware::{auth_user_from_token, bearer_token};

#[derive(Deserialize)]
pub struct StreamQuery {
    /// JWT token for authentication
    token: Option<String>,
}

/// SSE stream handler.
///
/// Starts with a `connected` event, then forwards each order event with the
/// SSE event name set to its `type`. A subscriber that falls behind gets a
/// `lagged` event carrying the number of missed events.
pub async fn order_events_handler(
    Extension(state): Extension<AxumAppState>,
    Path(order_id): Path<OrderId>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> ApiResult<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>> {
    let token = query
        .token
        .as_deref()
        .or_else(|| bearer_token(&headers))
        .ok_or(ApiError::Unauthorized)?;
    let user = auth_user_from_token(token, &state.jwt_service).ok_or(ApiError::Unauthorized)?;

    get_order_detail(&state.deps, user.actor(), order_id).await?;

    let feed = state
        .deps
        .events
        .subscribe(&order_topic(order_id))
        .await
        .map_err(|e| ApiError::Domain(e.into()))?;
    debug!(order_id = %order_id, user_id = %user.user_id, "Order feed subscribed");

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let events = feed.filter_map(|item| async move {
        match item {
            FeedItem::Event(value) => {
                let event_name = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("message")
                    .to_string();
                Event::default()
                    .event(event_name)
                    .json_data(&value)
                    .ok()
                    .map(Ok)
            }
            FeedItem::Lagged(n) => Event::default()
                .event("lagged")
                .json_data(serde_json::json!({ "missed": n }))
                .ok()
                .map(Ok),
        }
    });

    Ok(Sse::new(connected.chain(events)).keep_alive(KeepAlive::default()))
}
