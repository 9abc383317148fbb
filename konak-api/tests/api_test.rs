use std::str::FromStr;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use konak_api::{
    app,
    middleware::{issue_token, SessionClaims},
    state::{AppState, AuthConfig, ListingConfig},
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

fn test_app() -> Router {
    let auth = AuthConfig { secret: SECRET.into(), expiration: 600 };
    app(AppState::in_memory(auth, ListingConfig::default()))
}

fn token_for(role: &str, permissions: &[&str]) -> String {
    let auth = AuthConfig { secret: SECRET.into(), expiration: 600 };
    let claims = SessionClaims {
        sub: Uuid::new_v4().to_string(),
        email: format!("{}@konak.example", role.to_lowercase()),
        role: role.into(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
    };
    issue_token(&auth, &claims).unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn stay(guest: &str, org: Option<&str>, check_in: &str, check_out: &str, rate: &str) -> Value {
    json!({
        "guest_name": guest,
        "country": "TR",
        "city": "Antalya",
        "check_in": check_in,
        "check_out": check_out,
        "room_type": "DBL",
        "board_type": "HB",
        "nightly_rate": rate,
        "organization_name": org,
        "hotel_name": "Lara Palace",
        "individual": org.is_none(),
    })
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

async fn create_stay(app: &Router, token: &str, body: Value) -> Value {
    let (status, record) = call(app, "POST", "/v1/accommodations", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", record);
    record
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = test_app();
    let (status, body) = call(&app, "GET", "/v1/hotels", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("bearer"));

    let (status, _) = call(&app, "GET", "/v1/hotels", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_lists_allowed_actions() {
    let app = test_app();
    let token = token_for("OPERATOR", &["finance"]);
    let (status, body) = call(&app, "GET", "/v1/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "OPERATOR");

    let actions: Vec<&str> = body["allowed_actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a.as_str().unwrap())
        .collect();
    assert!(actions.contains(&"EDIT_ACCOMMODATION"));
    assert!(actions.contains(&"VIEW_FINANCE"));
    assert!(!actions.contains(&"DELETE_ACCOMMODATION"));
}

#[tokio::test]
async fn test_stay_totals_are_derived() {
    let app = test_app();
    let token = token_for("OPERATOR", &[]);
    let record = create_stay(&app, &token, stay("Ayse Kaya", Some("Sun Tours"), "2024-06-15", "2024-06-18", "1000")).await;

    assert_eq!(record["nights"], 3);
    assert_eq!(decimal(&record["total_charge"]), Decimal::from(3000));
    assert_eq!(record["transferred"], false);

    let (status, _) = call(
        &app,
        "POST",
        "/v1/accommodations",
        Some(&token),
        Some(stay("Late Guest", None, "2024-06-18", "2024-06-15", "1000")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_operator_cannot_delete_stay() {
    let app = test_app();
    let operator = token_for("OPERATOR", &[]);
    let record = create_stay(&app, &operator, stay("Ayse Kaya", None, "2024-06-15", "2024-06-18", "1000")).await;
    let uri = format!("/v1/accommodations/{}", record["id"].as_str().unwrap());

    let (status, _) = call(&app, "DELETE", &uri, Some(&operator), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let manager = token_for("MANAGER", &[]);
    let (status, _) = call(&app, "DELETE", &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, "GET", &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_basic_role_cannot_view_stays() {
    let app = test_app();
    let basic = token_for("BASIC", &[]);
    let (status, _) = call(&app, "GET", "/v1/accommodations", Some(&basic), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let granted = token_for("BASIC", &["accommodation"]);
    let (status, _) = call(&app, "GET", "/v1/accommodations", Some(&granted), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_pagination_and_page_size_choices() {
    let app = test_app();
    let token = token_for("OPERATOR", &[]);
    for i in 0..12 {
        create_stay(&app, &token, stay(&format!("Guest {:02}", i), None, "2024-06-01", "2024-06-03", "500")).await;
    }

    let (status, page) = call(
        &app,
        "GET",
        "/v1/accommodations?page=2&page_size=10&sort=guest_name",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 12);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["items"][0]["guest_name"], "Guest 10");

    let (status, _) = call(&app, "GET", "/v1/accommodations?page_size=7", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "GET", "/v1/accommodations?colour=red", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_delete_needs_confirmation() {
    let app = test_app();
    let manager = token_for("MANAGER", &[]);
    let a = create_stay(&app, &manager, stay("A", None, "2024-06-01", "2024-06-03", "500")).await;
    let b = create_stay(&app, &manager, stay("B", None, "2024-06-01", "2024-06-03", "500")).await;
    let ids = json!([a["id"], b["id"]]);

    let (status, _) = call(
        &app,
        "POST",
        "/v1/accommodations/bulk",
        Some(&manager),
        Some(json!({ "ids": ids, "operation": { "kind": "DELETE" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, outcome) = call(
        &app,
        "POST",
        "/v1/accommodations/bulk",
        Some(&manager),
        Some(json!({ "ids": ids, "operation": { "kind": "DELETE" }, "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["succeeded"], 2);
    assert_eq!(outcome["failed"], 0);
}

#[tokio::test]
async fn test_mixed_organizations_are_not_transferred() {
    let app = test_app();
    let manager = token_for("MANAGER", &[]);
    let a = create_stay(&app, &manager, stay("A", Some("Sun Tours"), "2024-06-01", "2024-06-03", "500")).await;
    let b = create_stay(&app, &manager, stay("B", Some("Blue Travel"), "2024-06-01", "2024-06-03", "500")).await;

    let mut prices = serde_json::Map::new();
    prices.insert(a["id"].as_str().unwrap().to_string(), json!("700"));
    prices.insert(b["id"].as_str().unwrap().to_string(), json!("700"));

    let (status, _) = call(
        &app,
        "POST",
        "/v1/accommodations/transfer-to-sales",
        Some(&manager),
        Some(json!({
            "accommodation_ids": [a["id"], b["id"]],
            "organization_name": "Sun Tours",
            "unit_prices": prices,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, sales) = call(&app, "GET", "/v1/sales", Some(&manager), None).await;
    assert_eq!(sales["total_count"], 0);
}

#[tokio::test]
async fn test_transfer_locks_stay_until_sale_returns_it() {
    let app = test_app();
    let manager = token_for("MANAGER", &[]);
    let record = create_stay(&app, &manager, stay("Ayse Kaya", Some("Sun Tours"), "2024-06-15", "2024-06-18", "1000")).await;
    let id = record["id"].as_str().unwrap().to_string();
    let mut prices = serde_json::Map::new();
    prices.insert(id.clone(), json!("1200"));

    let (status, receipt) = call(
        &app,
        "POST",
        "/v1/accommodations/transfer-to-sales",
        Some(&manager),
        Some(json!({
            "accommodation_ids": [id],
            "organization_name": "Sun Tours",
            "unit_prices": prices,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", receipt);
    assert_eq!(receipt["success"], true);
    let sale_id = receipt["sale_ids"][0].as_str().unwrap().to_string();

    let (_, sales) = call(&app, "GET", "/v1/sales", Some(&manager), None).await;
    assert_eq!(decimal(&sales["items"][0]["total_amount"]), Decimal::from(3600));

    let uri = format!("/v1/accommodations/{}", id);
    let (status, _) = call(
        &app,
        "PUT",
        &uri,
        Some(&manager),
        Some(stay("Ayse Kaya", Some("Sun Tours"), "2024-06-15", "2024-06-19", "1000")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, summary) = call(&app, "GET", "/v1/finance/summary", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&summary["total_buy"]), Decimal::from(3000));
    assert_eq!(decimal(&summary["total_sell"]), Decimal::from(3600));

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/v1/sales/{}?return_to_pool=true", sale_id),
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, record) = call(&app, "GET", &uri, Some(&manager), None).await;
    assert_eq!(record["transferred"], false);
    let (status, _) = call(
        &app,
        "PUT",
        &uri,
        Some(&manager),
        Some(stay("Ayse Kaya", Some("Sun Tours"), "2024-06-15", "2024-06-19", "1000")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn transfer_one(app: &Router, token: &str, guest: &str) -> (String, String) {
    let record = create_stay(app, token, stay(guest, Some("Sun Tours"), "2024-06-15", "2024-06-18", "1000")).await;
    let id = record["id"].as_str().unwrap().to_string();
    let mut prices = serde_json::Map::new();
    prices.insert(id.clone(), json!("1200"));

    let (status, receipt) = call(
        app,
        "POST",
        "/v1/accommodations/transfer-to-sales",
        Some(token),
        Some(json!({
            "accommodation_ids": [id],
            "organization_name": "Sun Tours",
            "unit_prices": prices,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", receipt);
    (id, receipt["sale_ids"][0].as_str().unwrap().to_string())
}

#[tokio::test]
async fn test_bulk_sale_delete_releases_stays() {
    let app = test_app();
    let manager = token_for("MANAGER", &[]);
    let (stay_id, sale_id) = transfer_one(&app, &manager, "Ayse Kaya").await;

    let (status, _) = call(
        &app,
        "POST",
        "/v1/sales/bulk",
        Some(&manager),
        Some(json!({ "ids": [sale_id], "operation": { "kind": "DELETE" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, outcome) = call(
        &app,
        "POST",
        "/v1/sales/bulk",
        Some(&manager),
        Some(json!({ "ids": [sale_id], "operation": { "kind": "DELETE" }, "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", outcome);
    assert_eq!(outcome["succeeded"], 1);
    assert_eq!(outcome["failed"], 0);

    let uri = format!("/v1/accommodations/{}", stay_id);
    let (_, record) = call(&app, "GET", &uri, Some(&manager), None).await;
    assert_eq!(record["transferred"], false);
    assert_eq!(record["sale_id"], Value::Null);
    let (status, _) = call(
        &app,
        "PUT",
        &uri,
        Some(&manager),
        Some(stay("Ayse Kaya", Some("Sun Tours"), "2024-06-15", "2024-06-19", "1000")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, summary) = call(&app, "GET", "/v1/finance/summary", Some(&manager), None).await;
    assert_eq!(decimal(&summary["total_buy"]), Decimal::ZERO);
    assert_eq!(decimal(&summary["total_sell"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_bulk_sale_delete_can_keep_stays_archived() {
    let app = test_app();
    let manager = token_for("MANAGER", &[]);
    let (stay_id, sale_id) = transfer_one(&app, &manager, "Burak Demir").await;

    let (status, outcome) = call(
        &app,
        "POST",
        "/v1/sales/bulk",
        Some(&manager),
        Some(json!({
            "ids": [sale_id],
            "operation": { "kind": "DELETE" },
            "confirm": true,
            "return_to_pool": false,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", outcome);
    assert_eq!(outcome["succeeded"], 1);

    let (_, record) = call(&app, "GET", &format!("/v1/accommodations/{}", stay_id), Some(&manager), None).await;
    assert_eq!(record["transferred"], true);

    let (_, summary) = call(&app, "GET", "/v1/finance/summary", Some(&manager), None).await;
    assert_eq!(decimal(&summary["total_buy"]), Decimal::ZERO);
    assert_eq!(decimal(&summary["margin"]["margin_pct"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_stale_version_is_a_conflict() {
    let app = test_app();
    let token = token_for("OPERATOR", &[]);
    let record = create_stay(&app, &token, stay("Ayse Kaya", None, "2024-06-15", "2024-06-18", "1000")).await;
    let version = record["version"].as_i64().unwrap();
    let uri = format!("/v1/accommodations/{}", record["id"].as_str().unwrap());
    let body = stay("Ayse Kaya", None, "2024-06-15", "2024-06-17", "1000");

    let (status, _) = call(
        &app,
        "PUT",
        &format!("{}?expected_version={}", uri, version + 5),
        Some(&token),
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = call(
        &app,
        "PUT",
        &format!("{}?expected_version={}", uri, version),
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["nights"], 2);
}

#[tokio::test]
async fn test_admin_self_delete_needs_confirmation() {
    let app = test_app();
    let admin = token_for("ADMIN", &[]);
    let (status, user) = call(
        &app,
        "POST",
        "/v1/users",
        Some(&admin),
        Some(json!({ "email": "Ops@Konak.example", "name": "Ops", "role": "SUPERVISOR" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "ops@konak.example");
    assert_eq!(user["role"], "MANAGER");

    let (status, _) = call(
        &app,
        "POST",
        "/v1/users",
        Some(&admin),
        Some(json!({ "email": "ops@konak.example", "role": "BASIC" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let auth = AuthConfig { secret: SECRET.into(), expiration: 600 };
    let self_token = issue_token(
        &auth,
        &SessionClaims {
            sub: user["id"].as_str().unwrap().to_string(),
            email: "ops@konak.example".into(),
            role: "ADMIN".into(),
            permissions: vec![],
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        },
    )
    .unwrap();
    let uri = format!("/v1/users/{}", user["id"].as_str().unwrap());

    let (status, _) = call(&app, "DELETE", &uri, Some(&self_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "DELETE", &format!("{}?confirm=true", uri), Some(&self_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
