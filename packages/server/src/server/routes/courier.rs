//! Courier endpoints under `/api/v1/courier`.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::common::OrderId;
use crate::domains::dispatch::{accept_order, available_orders, AvailableOrder};
use crate::domains::orders::Order;
use crate::domains::tracking::{most_recent_location, record_location, LocationSample};
use crate::server::app::AxumAppState;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthUser;

#[derive(Debug, Serialize)]
pub struct AvailableOrdersResponse {
    pub results: Vec<AvailableOrder>,
}

#[derive(Debug, Deserialize)]
pub struct LocationBody {
    pub lat: f64,
    pub lon: f64,
}

pub async fn available_orders_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
) -> ApiResult<Json<AvailableOrdersResponse>> {
    let results = available_orders(&state.deps, user.actor()).await?;
    Ok(Json(AvailableOrdersResponse { results }))
}

pub async fn accept_order_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(order_id): Path<OrderId>,
) -> ApiResult<Json<Order>> {
    Ok(Json(accept_order(&state.deps, user.actor(), order_id).await?))
}

pub async fn post_location_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Json(body): Json<LocationBody>,
) -> ApiResult<(StatusCode, Json<LocationSample>)> {
    let sample = record_location(&state.deps, user.actor(), body.lat, body.lon).await?;
    Ok((StatusCode::CREATED, Json(sample)))
}

/// Latest sample for the calling courier; `null` before the first post.
pub async fn my_location_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
) -> ApiResult<Json<Option<LocationSample>>> {
    Ok(Json(
        most_recent_location(&state.deps, user.actor(), user.user_id).await?,
    ))
}
