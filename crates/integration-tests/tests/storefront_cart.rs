//! Integration tests for the visitor cart and checkout.
//!
//! The storefront runs in-process against the fake API; each test gets its
//! own server, data directory and cookie jar.

#![allow(clippy::unwrap_used)]

use std::str::FromStr;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use dowslakers_integration_tests::{TestStorefront, seed, visitor};

async fn add(app: &TestStorefront, product_id: &str, size: &str, quantity: u32) -> reqwest::Response {
    app.client
        .post(app.url("/api/cart/items"))
        .json(&json!({ "product_id": product_id, "size": size, "quantity": quantity }))
        .send()
        .await
        .unwrap()
}

async fn cart(app: &TestStorefront) -> Value {
    app.client
        .get(app.url("/api/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn decimal(value: &Value) -> Decimal {
    serde_json::from_value(value.clone()).unwrap()
}

fn checkout_form() -> Value {
    json!({
        "full_name": "Ada Obi",
        "phone": " 08030000000 ",
        "address": "12 Marina Road, Lagos",
        "delivery_method": "delivery",
        "notes": "Call on arrival",
    })
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestStorefront::start().await;
    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_same_product_and_size_merge() {
    let app = TestStorefront::start().await;

    assert_eq!(add(&app, seed::DRESS, "M", 1).await.status(), StatusCode::OK);
    assert_eq!(add(&app, seed::DRESS, "M", 2).await.status(), StatusCode::OK);
    assert_eq!(add(&app, seed::DRESS, "L", 1).await.status(), StatusCode::OK);

    let body = cart(&app).await;
    let lines = body["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["size"], "M");
    assert_eq!(lines[0]["quantity"], 3);
    assert_eq!(lines[0]["line_total"], "₦45,000");
    assert_eq!(body["total_items"], 4);
    assert_eq!(body["total_amount"], "₦60,000");
}

#[tokio::test]
async fn test_cart_is_per_visitor() {
    let app = TestStorefront::start().await;
    add(&app, seed::KAFTAN, "", 1).await;

    let stranger = visitor();
    let body: Value = stranger
        .get(app.url("/api/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total_items"], 0);
}

#[tokio::test]
async fn test_unoffered_size_is_rejected() {
    let app = TestStorefront::start().await;

    let resp = add(&app, seed::DRESS, "XXL", 1).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid");

    assert_eq!(cart(&app).await["total_items"], 0);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = TestStorefront::start().await;

    let resp = add(&app, &uuid::Uuid::new_v4().to_string(), "M", 1).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let app = TestStorefront::start().await;
    add(&app, seed::DRESS, "M", 1).await;
    add(&app, seed::KAFTAN, "", 1).await;

    let resp = app
        .client
        .patch(app.url("/api/cart/items"))
        .json(&json!({ "product_id": seed::DRESS, "size": "M", "quantity": 4 }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_items"], 5);

    // Zero quantity removes the line.
    let resp = app
        .client
        .patch(app.url("/api/cart/items"))
        .json(&json!({ "product_id": seed::KAFTAN, "size": "", "quantity": 0 }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["lines"].as_array().unwrap().len(), 1);

    let resp = app
        .client
        .delete(app.url(&format!("/api/cart/items/{}/M", seed::DRESS)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_items"], 0);
}

#[tokio::test]
async fn test_padded_size_matches_line_everywhere() {
    let app = TestStorefront::start().await;
    add(&app, seed::DRESS, " M ", 1).await;
    assert_eq!(cart(&app).await["lines"][0]["size"], "M");

    let resp = app
        .client
        .patch(app.url("/api/cart/items"))
        .json(&json!({ "product_id": seed::DRESS, "size": " M ", "quantity": 3 }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_items"], 3);

    let resp = app
        .client
        .delete(app.url(&format!("/api/cart/items/{}/%20M%20", seed::DRESS)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_items"], 0);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_quote_waives_fee_for_pickup() {
    let app = TestStorefront::start().await;
    add(&app, seed::DRESS, "S", 2).await;

    let mut form = checkout_form();
    let delivery: Value = app
        .client
        .post(app.url("/api/checkout/quote"))
        .json(&form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decimal(&delivery["subtotal"]), Decimal::from(30_000));
    assert_eq!(decimal(&delivery["shipping_fee"]), Decimal::from(3_500));
    assert_eq!(decimal(&delivery["grand_total"]), Decimal::from(33_500));

    form["delivery_method"] = json!("pickup");
    let pickup: Value = app
        .client
        .post(app.url("/api/checkout/quote"))
        .json(&form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decimal(&pickup["grand_total"]), Decimal::from(30_000));
}

#[tokio::test]
async fn test_checkout_requires_sign_in_before_any_write() {
    let app = TestStorefront::start().await;
    add(&app, seed::DRESS, "M", 1).await;

    let resp = app
        .client
        .post(app.url("/api/checkout"))
        .json(&checkout_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "auth_required");

    assert_eq!(app.api.state.count("POST /orders"), 0);
    assert_eq!(cart(&app).await["total_items"], 1);
}

#[tokio::test]
async fn test_checkout_rejects_empty_cart_and_missing_fields() {
    let app = TestStorefront::start().await;
    app.sign_in().await;

    let resp = app
        .client
        .post(app.url("/api/checkout"))
        .json(&checkout_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    add(&app, seed::DRESS, "M", 1).await;
    let mut form = checkout_form();
    form["address"] = json!("   ");
    let resp = app
        .client
        .post(app.url("/api/checkout"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(app.api.state.count("POST /orders"), 0);
}

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let app = TestStorefront::start().await;
    app.sign_in().await;
    add(&app, seed::DRESS, "M", 2).await;

    let resp = app
        .client
        .post(app.url("/api/checkout"))
        .json(&checkout_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();

    let orders = app.api.state.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(body["order_id"], order["id"]);
    assert_eq!(order["order_type"], "product");
    assert_eq!(order["delivery_method"], "delivery");
    assert_eq!(order["delivery_contact"], "08030000000");
    assert_eq!(decimal(&order["total_amount"]), Decimal::from(30_000));

    let items = app.api.state.order_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["order_id"], order["id"]);
    assert_eq!(items[0]["size"], "M");
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(decimal(&items[0]["price"]), Decimal::from(15_000));

    assert_eq!(cart(&app).await["total_items"], 0);

    let history: Value = app
        .client
        .get(app.url("/api/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status_label"], "Pending");
    assert_eq!(history[0]["item_count"], 2);
}

#[tokio::test]
async fn test_item_failure_reports_order_and_keeps_cart() {
    let app = TestStorefront::start().await;
    app.sign_in().await;
    add(&app, seed::KAFTAN, "", 1).await;
    app.api.fail_order_items(true);

    let resp = app
        .client
        .post(app.url("/api/checkout"))
        .json(&checkout_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "partial_failure");

    let orders = app.api.state.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(body["order_id"], orders[0]["id"]);
    assert!(uuid::Uuid::from_str(body["order_id"].as_str().unwrap()).is_ok());

    assert_eq!(cart(&app).await["total_items"], 1);
}
