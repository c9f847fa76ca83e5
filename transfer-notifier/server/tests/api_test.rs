use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use notification::{
    provider::MockProvider, retry::RetryOptions, Channel, NotificationResult, NotificationService,
};
use serde_json::{json, Value};
use transfer_notifier_core::ServerInfo;
use transfer_notifier_server::{new_router, ServiceState};

fn create_test_server() -> TestServer {
    let mock = Arc::new(MockProvider::default());
    let service = NotificationService::builder()
        .email_provider(mock.clone())
        .sms_provider(mock.clone())
        .whatsapp_provider(mock)
        .retry(RetryOptions::no_retry())
        .build();
    let server_info = ServerInfo {
        version: "0.0.0".to_string(),
        branch: "main".to_string(),
        commit_hash: "0000000".to_string(),
        default_language: "tr".to_string(),
        start_time: Utc::now(),
    };

    let router = new_router(&ServiceState::new(Arc::new(service)), server_info);
    TestServer::new(router).expect("Failed to create test server")
}

fn booking_body(customer_id: &str) -> Value {
    json!({
        "customerId": customer_id,
        "reservationId": "RES-1",
        "recipient": { "email": "ahmet@example.com", "phone": "+905551234567" },
        "variables": {
            "customerName": "Ahmet",
            "pickupLocation": "Istanbul Airport",
            "dropoffLocation": "Kadıköy",
            "pickupTime": "2026-10-20 09:15"
        }
    })
}

fn notification_result(body: &Value) -> NotificationResult {
    serde_json::from_value(body["data"].clone()).expect("Response should carry a NotificationResult")
}

#[tokio::test]
async fn test_booking_confirmation_endpoint() {
    let server = create_test_server();

    let response =
        server.post("/api/v1/notifications/booking-confirmation").json(&booking_body("CUST-1")).await;

    response.assert_status_ok();
    let result = notification_result(&response.json::<Value>());
    assert!(result.success, "{:?}", result.errors);
    assert!(result.succeeded(Channel::WhatsApp));
    assert!(result.succeeded(Channel::Email));
    assert!(result.get(Channel::Sms).is_none());
}

#[tokio::test]
async fn test_generic_notification_endpoint() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/notifications")
        .json(&json!({
            "customerId": "CUST-1",
            "template": "otp",
            "channels": { "email": false, "sms": true, "whatsapp": false },
            "recipient": { "phone": "+905551234567" },
            "variables": { "otp": "123456" }
        }))
        .await;

    response.assert_status_ok();
    let result = notification_result(&response.json::<Value>());
    assert!(result.succeeded(Channel::Sms));
    assert_eq!(result.channels.len(), 1);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/notifications/otp")
        .json(&json!({ "phone": "+905551234567", "otp": "123456" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["type"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_blank_customer_is_bad_request() {
    let server = create_test_server();

    let response =
        server.post("/api/v1/notifications/booking-confirmation").json(&booking_body("  ")).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"]["message"].as_str().unwrap().contains("customerId"));
}

#[tokio::test]
async fn test_opted_out_customer_gets_failed_result() {
    let server = create_test_server();

    server.post("/api/v1/customers/CUST-9/opt-out").await.assert_status_ok();
    let response =
        server.post("/api/v1/notifications/booking-confirmation").json(&booking_body("CUST-9")).await;

    // Delivery failures are results, not HTTP errors.
    response.assert_status_ok();
    let result = notification_result(&response.json::<Value>());
    assert!(!result.success);
    assert!(result.channels.is_empty());
    assert!(result.errors[0].contains("opted out"));

    server.post("/api/v1/customers/CUST-9/opt-in").await.assert_status_ok();
    let response =
        server.post("/api/v1/notifications/booking-confirmation").json(&booking_body("CUST-9")).await;
    assert!(notification_result(&response.json::<Value>()).success);
}

#[tokio::test]
async fn test_preferences_round_trip() {
    let server = create_test_server();

    let response = server.get("/api/v1/customers/CUST-2/preferences").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["version"], 0);

    let response = server
        .put("/api/v1/customers/CUST-2/preferences")
        .json(&json!({ "language": "en", "channels": { "email": true, "sms": false, "whatsapp": false } }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["language"], "en");
    assert_eq!(body["data"]["version"], 1);

    server.delete("/api/v1/customers/CUST-2/preferences").await.assert_status_ok();
    let response = server.delete("/api/v1/customers/CUST-2/preferences").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dispatch_history() {
    let server = create_test_server();

    let response = server.get("/api/v1/dispatches").add_query_param("limit", 0).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    server
        .post("/api/v1/notifications/otp")
        .json(&json!({ "customerId": "CUST-1", "phone": "+905551234567", "otp": "123456" }))
        .await
        .assert_status_ok();

    let response = server.get("/api/v1/dispatches").add_query_param("limit", 10).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["channel"], "sms");
    assert_eq!(records[0]["destination"], "+9*********67");
}

#[tokio::test]
async fn test_status_and_verification() {
    let server = create_test_server();

    let response = server.get("/api/v1/status").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["healthy"], true);
    assert_eq!(body["data"]["channels"].as_array().unwrap().len(), 3);

    let response = server.post("/api/v1/status/verify").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["allChannelsVerified"], true);
}

#[tokio::test]
async fn test_server_info_and_openapi() {
    let server = create_test_server();

    let response = server.get("/api/v1/info").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["defaultLanguage"], "tr");

    let response = server.get("/openapi.json").await;
    response.assert_status_ok();
    let paths = &response.json::<Value>()["paths"];
    assert!(paths.get("/api/v1/notifications/booking-confirmation").is_some());
    assert!(paths.get("/api/v1/customers/{customer_id}/preferences").is_some());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = create_test_server();

    let response = server.get("/api/v1/unknown").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["type"], "NOT_FOUND");
}
