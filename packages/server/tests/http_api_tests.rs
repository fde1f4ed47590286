//! HTTP surface: routing, auth, status codes and response shapes.

mod common;

use axum::http::StatusCode;
use hmac::{Hmac, Mac};
use serde_json::json;
use server_core::common::Role;
use server_core::kernel::TestDependencies;
use sha2::Sha256;
use test_context::test_context;

use crate::common::*;

fn api(ctx: &TestHarness, token: String) -> ApiClient {
    ApiClient::new(ctx.app()).with_token(token)
}

#[test_context(TestHarness)]
#[tokio::test]
async fn health_reports_memory_mode(ctx: &mut TestHarness) {
    let res = ApiClient::new(ctx.app()).get("/health").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["database"]["status"], "memory");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn missing_or_bad_token_is_401(ctx: &mut TestHarness) {
    let anonymous = ApiClient::new(ctx.app());
    let res = anonymous.get("/api/v1/orders/my").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.body["detail"].is_string());

    let forged = ApiClient::new(ctx.app()).with_token("not-a-jwt".to_string());
    let res = forged.get("/api/v1/courier/orders/available").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn order_flow_over_http(ctx: &mut TestHarness) {
    let menu = seed_menu(ctx, Some((44.98, -93.27)));
    let client = ctx.client();
    let courier = ctx.courier();
    let as_client = api(ctx, ctx.token(client));
    let as_owner = api(ctx, ctx.token(menu.owner));
    let as_courier = api(ctx, ctx.token(courier));

    let res = as_client
        .post(
            "/api/v1/orders",
            json!({
                "restaurant_id": menu.restaurant.id,
                "items": [{"dish_id": menu.dish.id, "qty": 2}]
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["status"], "created");
    assert_eq!(res.body["total"], "25.00");
    let order_id = res.body["id"].as_str().unwrap().to_string();

    let res = as_owner
        .patch(
            &format!("/api/v1/orders/{}/status", order_id),
            json!({"status": "ready_for_pickup"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ready_for_pickup");

    let res = as_courier.get("/api/v1/courier/orders/available").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["results"][0]["id"], order_id.as_str());

    let res = as_courier
        .post(&format!("/api/v1/courier/orders/{}/accept", order_id), json!({}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "accepted");
    assert_eq!(res.body["courier_id"], courier.id.to_string());

    let res = api(ctx, ctx.token(ctx.courier()))
        .post(&format!("/api/v1/courier/orders/{}/accept", order_id), json!({}))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = as_courier
        .post("/api/v1/courier/location", json!({"lat": 44.97, "lon": -93.26}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["latitude"], 44.97);

    let res = as_client.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "in_transit");

    let res = as_courier.get("/api/v1/courier/location").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["longitude"], -93.26);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn error_status_mapping(ctx: &mut TestHarness) {
    let menu = seed_menu(ctx, None);
    let client = ctx.client();
    let order = place_order(ctx, &menu, client, 1).await;
    let as_client = api(ctx, ctx.token(client));

    // Client may not deliver
    let res = as_client
        .patch(
            &format!("/api/v1/orders/{}/status", order.id),
            json!({"status": "delivered"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    // Unknown status name
    let res = as_client
        .patch(
            &format!("/api/v1/orders/{}/status", order.id),
            json!({"status": "teleported"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Unknown order
    let res = as_client
        .get(&format!("/api/v1/orders/{}", server_core::common::OrderId::new()))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    // Bad coordinates
    let res = api(ctx, ctx.token(ctx.courier()))
        .post("/api/v1/courier/location", json!({"lat": 123.0, "lon": 0.0}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Wrong role
    let res = as_client
        .post("/api/v1/courier/location", json!({"lat": 1.0, "lon": 1.0}))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(res.body["detail"].is_string());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn my_orders_paging_clamps(ctx: &mut TestHarness) {
    let menu = seed_menu(ctx, None);
    let client = ctx.client();
    for _ in 0..3 {
        place_order(ctx, &menu, client, 1).await;
    }
    let as_client = api(ctx, ctx.token(client));

    let res = as_client.get("/api/v1/orders/my?page=abc&page_size=500").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 3);
    assert_eq!(res.body["page"], 1);
    assert_eq!(res.body["page_size"], 100);

    let res = as_client.get("/api/v1/orders/my?page_size=2&page=2").await;
    assert_eq!(res.body["results"].as_array().unwrap().len(), 1);

    let res = as_client.get("/api/v1/orders/my?status=canceled").await;
    assert_eq!(res.body["count"], 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn update_items_over_http(ctx: &mut TestHarness) {
    let menu = seed_menu(ctx, None);
    let client = ctx.client();
    let order = place_order(ctx, &menu, client, 1).await;

    let res = api(ctx, ctx.token(client))
        .put(
            &format!("/api/v1/orders/{}/items", order.id),
            json!({"items": [{"dish_id": menu.dish.id, "qty": 3}]}),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["total"], "37.50");
}

fn stripe_signature(payload: &[u8], secret: &str) -> String {
    let ts = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.", ts).as_bytes());
    mac.update(payload);
    format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes()))
}

#[tokio::test]
async fn signed_webhook_marks_order_paid() {
    let harness = TestHarness::with_dependencies(TestDependencies::new().webhook_secret("whsec_test"));
    let menu = seed_menu(&harness, None);
    let client = harness.client();
    let order = place_order(&harness, &menu, client, 1).await;

    let res = api(&harness, harness.token_for(client.id, Role::Client))
        .post(&format!("/api/v1/orders/{}/pay", order.id), json!({}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "pending_payment");
    let reference = res.body["payment_intent_id"].as_str().unwrap().to_string();

    let payload = json!({
        "type": "payment_intent.succeeded",
        "data": {"object": {"id": reference, "metadata": {"order_id": order.id.to_string()}}}
    })
    .to_string()
    .into_bytes();

    // Webhooks need no JWT, only a valid signature
    let webhook = ApiClient::new(harness.app());
    let res = webhook
        .post_raw("/api/v1/stripe/webhook", payload.clone(), &[("stripe-signature", "t=1,v1=00")])
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let signature = stripe_signature(&payload, "whsec_test");
    let res = webhook
        .post_raw("/api/v1/stripe/webhook", payload, &[("stripe-signature", signature.as_str())])
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["handled"], true);

    assert_eq!(
        current(&harness, order.id).await.status,
        server_core::domains::orders::OrderStatus::Paid
    );
}

#[tokio::test]
async fn unsigned_webhook_cannot_mark_order_paid() {
    let harness = TestHarness::with_dependencies(TestDependencies::new().require_signed_webhooks());
    let menu = seed_menu(&harness, None);
    let client = harness.client();
    let order = place_order(&harness, &menu, client, 1).await;

    let res = api(&harness, harness.token_for(client.id, Role::Client))
        .post(&format!("/api/v1/orders/{}/pay", order.id), json!({}))
        .await;
    let reference = res.body["payment_intent_id"].as_str().unwrap().to_string();

    let payload = json!({
        "type": "payment_intent.succeeded",
        "data": {"object": {"id": reference, "metadata": {"order_id": order.id.to_string()}}}
    })
    .to_string()
    .into_bytes();
    let res = ApiClient::new(harness.app())
        .post_raw("/api/v1/stripe/webhook", payload, &[])
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    assert_eq!(
        current(&harness, order.id).await.status,
        server_core::domains::orders::OrderStatus::PendingPayment
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn event_stream_requires_access(ctx: &mut TestHarness) {
    let menu = seed_menu(ctx, None);
    let client = ctx.client();
    let order = place_order(ctx, &menu, client, 1).await;
    let uri = format!("/api/v1/orders/{}/events", order.id);

    let res = ApiClient::new(ctx.app()).get(&uri).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let stranger = ctx.token(ctx.client());
    let res = ApiClient::new(ctx.app())
        .get(&format!("{}?token={}", uri, stranger))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}
