use std::sync::Arc;

use axum::{
    http::{header, Request, StatusCode},
    routing::{get, patch, post},
    Router,
};
use http_body_util::BodyExt;
use mongodb::{bson::oid::ObjectId, Client};
use serde_json::{json, Value};
use tower::ServiceExt;

use moneytrading::controllers::order_controller;
use moneytrading::models::CurrentUser;
use moneytrading::services::clock::ManualClock;
use moneytrading::services::market_service::MarketData;
use moneytrading::services::notifier::RecordingNotifier;
use moneytrading::services::order_service::{self, PlaceOrderRequest};
use moneytrading::services::order_store::{MemoryOrderStore, OrderStore};
use moneytrading::services::scheduler::ManualScheduler;
use moneytrading::{config, routes, AppState};

async fn test_state() -> (AppState, Arc<MemoryOrderStore>) {
    let settings = config::load();

    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("mongodb client");
    let db = client.database(&settings.mongodb_db);

    let store = Arc::new(MemoryOrderStore::new());

    let state = AppState {
        db,
        settings,
        orders: store.clone(),
        clock: Arc::new(ManualClock::new(1_700_000_000_000)),
        scheduler: Arc::new(ManualScheduler::new()),
        notifier: Arc::new(RecordingNotifier::default()),
        market: Arc::new(MarketData::default_fixture()),
    };

    (state, store)
}

fn order_router(state: AppState) -> Router {
    Router::new()
        .route("/api/orders/place", post(order_controller::place_order))
        .route("/api/orders/history", get(order_controller::get_order_history))
        .route("/api/orders/summary", get(order_controller::get_order_summary))
        .route("/api/orders/:order_id", get(order_controller::get_order_by_id))
        .route(
            "/api/orders/:order_id/cancel",
            patch(order_controller::cancel_order),
        )
        .with_state(state)
}

fn authed_json_request(method: &str, uri: &str, user: &CurrentUser, body: Value) -> Request<axum::body::Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    req.extensions_mut().insert(user.clone());
    req
}

fn authed_get(uri: &str, user: &CurrentUser) -> Request<axum::body::Body> {
    let mut req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    req.extensions_mut().insert(user.clone());
    req
}

fn test_user() -> CurrentUser {
    CurrentUser {
        id: ObjectId::new(),
        username: "test".to_string(),
        email: "test@example.com".to_string(),
    }
}

async fn response_json(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn order_routes_require_authentication() {
    let (state, _) = test_state().await;
    // Full app: the require_auth layer must kick in without a token.
    let app = routes::app(state);

    let req = Request::builder()
        .method("POST")
        .uri("/api/orders/place")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(json!({}).to_string()))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(res).await;
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn place_order_returns_created_with_projection() {
    let (state, store) = test_state().await;
    let app = order_router(state);
    let user = test_user();

    let req = authed_json_request(
        "POST",
        "/api/orders/place",
        &user,
        json!({
            "symbol": "tcs",
            "quantity": 5,
            "orderType": "buy",
            "priceType": "limit",
            "price": 3650.0
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = response_json(res).await;
    assert_eq!(body["message"], "Order placed successfully");
    assert_eq!(body["order"]["symbol"], "TCS");
    assert_eq!(body["order"]["status"], "PENDING");
    assert_eq!(body["order"]["priceType"], "LIMIT");
    assert_eq!(body["order"]["price"], 3650.0);

    let order_id = ObjectId::parse_str(body["orderId"].as_str().unwrap()).unwrap();
    assert!(store.find_any(order_id).await.unwrap().is_some());
}

#[tokio::test]
async fn place_order_validation_failures_are_bad_requests() {
    let (state, store) = test_state().await;
    let app = order_router(state);
    let user = test_user();

    let cases = vec![
        (
            json!({ "symbol": "TCS", "quantity": 5 }),
            "Missing required order fields",
        ),
        (
            json!({ "symbol": "TCS", "quantity": 0, "orderType": "BUY", "priceType": "MARKET" }),
            "Quantity must be greater than 0",
        ),
        (
            json!({ "symbol": "TCS", "quantity": 5, "orderType": "BUY", "priceType": "LIMIT" }),
            "Valid limit price is required",
        ),
    ];

    for (payload, expected) in cases {
        let req = authed_json_request("POST", "/api/orders/place", &user, payload);
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = response_json(res).await;
        assert_eq!(body["message"], expected);
    }

    assert_eq!(store.count_for_user(user.id, None).await.unwrap(), 0);
}

#[tokio::test]
async fn cancel_flow_via_http() {
    let (state, _) = test_state().await;
    let app = order_router(state.clone());
    let user = test_user();

    let placed = order_service::place(
        &state,
        user.id,
        &PlaceOrderRequest {
            symbol: Some("RELIANCE".to_string()),
            quantity: Some(10),
            order_type: Some("BUY".to_string()),
            price_type: Some("MARKET".to_string()),
            price: None,
        },
    )
    .await
    .unwrap();

    let uri = format!("/api/orders/{}/cancel", placed.order_id);

    let res = app
        .clone()
        .oneshot(authed_json_request("PATCH", &uri, &user, json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    assert_eq!(body["message"], "Order cancelled successfully");
    assert_eq!(body["order"]["status"], "CANCELLED");
    assert!(body["order"]["cancelledAt"].is_i64());

    // Second cancel: the order is already terminal.
    let res = app
        .oneshot(authed_json_request("PATCH", &uri, &user, json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_json(res).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("CANCELLED"));
}

#[tokio::test]
async fn cancel_unknown_or_malformed_ids_are_not_found() {
    let (state, _) = test_state().await;
    let app = order_router(state);
    let user = test_user();

    let unknown = format!("/api/orders/{}/cancel", ObjectId::new().to_hex());
    let res = app
        .clone()
        .oneshot(authed_json_request("PATCH", &unknown, &user, json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .oneshot(authed_json_request(
            "PATCH",
            "/api/orders/not-an-id/cancel",
            &user,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_order_by_id_is_scoped_to_the_caller() {
    let (state, _) = test_state().await;
    let app = order_router(state.clone());
    let owner = test_user();
    let stranger = test_user();

    let placed = order_service::place(
        &state,
        owner.id,
        &PlaceOrderRequest {
            symbol: Some("TCS".to_string()),
            quantity: Some(1),
            order_type: Some("SELL".to_string()),
            price_type: Some("MARKET".to_string()),
            price: None,
        },
    )
    .await
    .unwrap();

    let uri = format!("/api/orders/{}", placed.order_id);

    let res = app.clone().oneshot(authed_get(&uri, &owner)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = response_json(res).await;
    assert_eq!(body["order"]["symbol"], "TCS");
    assert_eq!(body["order"]["orderType"], "SELL");

    let res = app.oneshot(authed_get(&uri, &stranger)).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = response_json(res).await;
    assert_eq!(body["message"], "Order not found");
}

#[tokio::test]
async fn history_returns_pagination_envelope() {
    let (state, _) = test_state().await;
    let app = order_router(state.clone());
    let user = test_user();

    for i in 0..3 {
        order_service::place(
            &state,
            user.id,
            &PlaceOrderRequest {
                symbol: Some(format!("SYM{i}")),
                quantity: Some(1),
                order_type: Some("BUY".to_string()),
                price_type: Some("MARKET".to_string()),
                price: None,
            },
        )
        .await
        .unwrap();
    }

    let res = app
        .clone()
        .oneshot(authed_get("/api/orders/history?limit=2&page=1", &user))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["hasMore"], true);

    // A status no order can have yields an empty page, not an error.
    let res = app
        .oneshot(authed_get("/api/orders/history?status=bogus", &user))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = response_json(res).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["orders"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn summary_for_fresh_user_is_zeroed() {
    let (state, _) = test_state().await;
    let app = order_router(state);
    let user = test_user();

    let res = app
        .oneshot(authed_get("/api/orders/summary", &user))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    assert_eq!(body["summary"]["total"], 0);
    assert_eq!(body["summary"]["executed"], 0);
    assert_eq!(body["summary"]["pending"], 0);
    assert_eq!(body["summary"]["cancelled"], 0);
    assert_eq!(body["summary"]["rejected"], 0);
    assert_eq!(body["recentOrders"].as_array().unwrap().len(), 0);
}
