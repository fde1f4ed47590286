//! Order endpoints under `/api/v1/orders`.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::common::{OrderId, Page, PageParams, PageQuery};
use crate::domains::orders::actions::{
    create_order, get_order_detail, list_my_orders, update_items, CartLine, CreateOrderInput,
};
use crate::domains::orders::{request_transition, Order, OrderStatus};
use crate::domains::payments::{initiate_payment, PaymentStarted};
use crate::server::app::AxumAppState;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct MyOrdersQuery {
    pub status: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemsBody {
    pub items: Vec<CartLine>,
}

pub async fn create_order_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Json(input): Json<CreateOrderInput>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = create_order(&state.deps, user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn my_orders_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Query(query): Query<MyOrdersQuery>,
) -> ApiResult<Json<Page<Order>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let page = PageParams::from_query(&query.page);
    Ok(Json(
        list_my_orders(&state.deps, user.actor(), status, page).await?,
    ))
}

pub async fn order_detail_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(order_id): Path<OrderId>,
) -> ApiResult<Json<Order>> {
    Ok(Json(
        get_order_detail(&state.deps, user.actor(), order_id).await?,
    ))
}

pub async fn update_status_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(order_id): Path<OrderId>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<Order>> {
    let target: OrderStatus = body.status.parse()?;
    Ok(Json(
        request_transition(&state.deps, user.actor(), order_id, target).await?,
    ))
}

pub async fn update_items_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(order_id): Path<OrderId>,
    Json(body): Json<ItemsBody>,
) -> ApiResult<Json<Order>> {
    Ok(Json(
        update_items(&state.deps, user.actor(), order_id, body.items).await?,
    ))
}

pub async fn pay_order_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(order_id): Path<OrderId>,
) -> ApiResult<Json<PaymentStarted>> {
    Ok(Json(
        initiate_payment(&state.deps, user.actor(), order_id).await?,
    ))
}
