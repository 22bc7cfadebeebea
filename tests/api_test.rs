//! HTTP tests: the full actix app over the in-memory repositories.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use storefront_service::application::side_effects::{SideEffect, SideEffects};
use storefront_service::infrastructure::cache::NoopCache;
use storefront_service::infrastructure::memory::InMemoryStore;
use storefront_service::{configure, AppState, Repositories};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

fn state() -> (AppState, UnboundedReceiver<SideEffect>) {
    let (effects, rx) = SideEffects::channel();
    let state = AppState::new(
        Repositories::in_memory(InMemoryStore::new()),
        Arc::new(NoopCache),
        Duration::from_secs(60),
        effects,
    );
    (state, rx)
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(configure),
        )
        .await
    };
}

fn as_admin(req: test::TestRequest, admin: Uuid) -> test::TestRequest {
    req.insert_header(("X-User-Id", admin.to_string()))
        .insert_header(("X-User-Role", "admin"))
}

fn as_customer(req: test::TestRequest, user: Uuid) -> test::TestRequest {
    req.insert_header(("X-User-Id", user.to_string()))
}

fn checkout_body(method: &str) -> Value {
    json!({
        "shippingAddress": {
            "recipientName": "Dewi",
            "phone": "081234567890",
            "street": "Jl. Diponegoro 10",
            "city": "Surabaya",
            "province": "Jawa Timur",
            "postalCode": "60241"
        },
        "paymentMethod": "bank_transfer",
        "shippingMethod": method
    })
}

fn product_body(stock: i32) -> Value {
    json!({
        "name": "Mechanical keyboard",
        "category": "electronics",
        "price": "100000",
        "stock": stock
    })
}

#[actix_web::test]
async fn health_uses_success_envelope() {
    let (state, _rx) = state();
    let app = app!(state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "success");
}

#[actix_web::test]
async fn missing_identity_is_unauthorized() {
    let (state, _rx) = state();
    let app = app!(state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/cart").to_request()).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");
}

#[actix_web::test]
async fn malformed_input_is_a_bad_request() {
    let (state, _rx) = state();
    let app = app!(state);
    let user = Uuid::new_v4();

    let req = as_customer(test::TestRequest::post().uri("/cart/items"), user)
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");

    let req = as_customer(test::TestRequest::get().uri("/orders/not-a-uuid"), user).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/products?page=0&limit=10")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/products?limit=101").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn customers_cannot_create_products() {
    let (state, _rx) = state();
    let app = app!(state);

    let req = as_customer(test::TestRequest::post().uri("/products"), Uuid::new_v4())
        .set_json(product_body(5))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn checkout_and_cancel_round_trip_stock() {
    let (state, _rx) = state();
    let app = app!(state);
    let admin = Uuid::new_v4();
    let customer = Uuid::new_v4();

    // Admin creates P1 with stock 5
    let req = as_admin(test::TestRequest::post().uri("/products"), admin)
        .set_json(product_body(5))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let product_id = body["data"]["id"].as_str().expect("id").to_string();

    // Add 3 to the cart; stock is not reserved yet
    let req = as_customer(test::TestRequest::post().uri("/cart/items"), customer)
        .set_json(json!({ "productId": product_id, "quantity": 3 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["subtotal"], "300000.00");
    assert_eq!(body["data"]["items"][0]["quantity"], 3);
    assert_eq!(body["data"]["items"][0]["stock"], 5);

    // Checkout
    let req = as_customer(test::TestRequest::post().uri("/orders"), customer)
        .set_json(checkout_body("regular"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let order = &body["data"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["itemsPrice"], "300000.00");
    assert_eq!(order["shippingPrice"], "20000.00");
    assert_eq!(order["taxPrice"], "33000.00");
    assert_eq!(order["totalPrice"], "353000.00");
    let order_id = order["id"].as_str().expect("id").to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/products/{product_id}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["stock"], 2);

    // A second checkout finds the cart empty
    let req = as_customer(test::TestRequest::post().uri("/orders"), customer)
        .set_json(checkout_body("regular"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Cancel restores stock
    let req = as_customer(
        test::TestRequest::patch().uri(&format!("/orders/{order_id}/cancel")),
        customer,
    )
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "cancelled");
    let history = body["data"]["statusHistory"].as_array().expect("history");
    assert_eq!(history.last().expect("entry")["status"], "cancelled");

    let req = test::TestRequest::get()
        .uri(&format!("/products/{product_id}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["stock"], 5);
}

#[actix_web::test]
async fn update_item_to_zero_is_rejected() {
    let (state, _rx) = state();
    let app = app!(state);
    let admin = Uuid::new_v4();
    let customer = Uuid::new_v4();

    let req = as_admin(test::TestRequest::post().uri("/products"), admin)
        .set_json(product_body(5))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let product_id = body["data"]["id"].as_str().expect("id").to_string();

    let req = as_customer(test::TestRequest::post().uri("/cart/items"), customer)
        .set_json(json!({ "productId": product_id, "quantity": 1 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let item_id = body["data"]["items"][0]["id"].as_str().expect("id").to_string();

    let req = as_customer(
        test::TestRequest::patch().uri(&format!("/cart/items/{item_id}")),
        customer,
    )
    .set_json(json!({ "quantity": 0 }))
    .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");
}

#[actix_web::test]
async fn coupon_discount_is_capped_and_carried_into_the_order() {
    let (state, _rx) = state();
    let app = app!(state);
    let admin = Uuid::new_v4();
    let customer = Uuid::new_v4();

    let req = as_admin(test::TestRequest::post().uri("/products"), admin)
        .set_json(product_body(5))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let product_id = body["data"]["id"].as_str().expect("id").to_string();

    let now = chrono::Utc::now();
    let req = as_admin(test::TestRequest::post().uri("/coupons"), admin)
        .set_json(json!({
            "code": "save10",
            "kind": "percentage",
            "amount": "10",
            "maxDiscount": "5000",
            "startsAt": (now - chrono::Duration::days(1)).to_rfc3339(),
            "endsAt": (now + chrono::Duration::days(1)).to_rfc3339()
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["code"], "SAVE10");

    let req = as_customer(test::TestRequest::post().uri("/cart/items"), customer)
        .set_json(json!({ "productId": product_id, "quantity": 3 }))
        .to_request();
    test::call_service(&app, req).await;

    let req = as_customer(test::TestRequest::post().uri("/coupons/apply"), customer)
        .set_json(json!({ "code": "SAVE10" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["discount"], "5000.00");
    assert_eq!(body["data"]["cart"]["total"], "295000.00");

    let req = as_customer(test::TestRequest::post().uri("/orders"), customer)
        .set_json(checkout_body("express"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["couponCode"], "SAVE10");
    assert_eq!(body["data"]["couponDiscount"], "5000.00");
    assert_eq!(body["data"]["itemsPrice"], "295000.00");
    assert_eq!(body["data"]["shippingPrice"], "40000.00");

    let req = as_admin(test::TestRequest::get().uri("/coupons"), admin).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["usedCount"], 1);
}

#[actix_web::test]
async fn order_access_and_admin_transitions() {
    let (state, _rx) = state();
    let app = app!(state);
    let admin = Uuid::new_v4();
    let customer = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let req = as_admin(test::TestRequest::post().uri("/products"), admin)
        .set_json(product_body(5))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let product_id = body["data"]["id"].as_str().expect("id").to_string();

    let req = as_customer(test::TestRequest::post().uri("/cart/items"), customer)
        .set_json(json!({ "productId": product_id, "quantity": 1 }))
        .to_request();
    test::call_service(&app, req).await;
    let req = as_customer(test::TestRequest::post().uri("/orders"), customer)
        .set_json(checkout_body("regular"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["data"]["id"].as_str().expect("id").to_string();
    let order_uri = format!("/orders/{order_id}");

    let req = as_customer(test::TestRequest::get().uri(&order_uri), stranger).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = as_customer(test::TestRequest::get().uri("/orders"), stranger).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["total"], 0);

    let req = as_admin(test::TestRequest::get().uri("/orders"), admin).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["total"], 1);

    // Customers cannot drive fulfilment
    let req = as_customer(
        test::TestRequest::patch().uri(&format!("{order_uri}/status")),
        customer,
    )
    .set_json(json!({ "status": "shipped" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = as_admin(
        test::TestRequest::patch().uri(&format!("{order_uri}/payment")),
        admin,
    )
    .set_json(json!({ "status": "paid" }))
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "processing");
    assert_eq!(body["data"]["paymentStatus"], "paid");

    let req = as_admin(
        test::TestRequest::patch().uri(&format!("{order_uri}/status")),
        admin,
    )
    .set_json(json!({ "status": "shipped", "note": "JNE 123" }))
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "shipped");

    // Shipped orders can no longer be cancelled
    let req = as_admin(
        test::TestRequest::patch().uri(&format!("{order_uri}/status")),
        admin,
    )
    .set_json(json!({ "status": "cancelled" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = as_customer(
        test::TestRequest::patch().uri(&format!("{order_uri}/deliver")),
        customer,
    )
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "delivered");
    assert!(body["data"]["deliveredAt"].is_string());
}
