//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::Engine;
use finesight_core::{Database, MemoryStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn setup_test_app() -> Router {
    create_router(
        Arc::new(MemoryStore::new()),
        Some(AIClient::mock()),
        &ServerConfig::default(),
    )
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, get_body_json(response).await)
}

fn expense_body(id: &str, user: &str) -> Value {
    json!({
        "id": id,
        "user_id": user,
        "title": "Lunch",
        "amount": 12.5,
        "category": "Food",
        "date": "2024-03-02T12:30:00.000Z",
        "paymentMethod": "Cash"
    })
}

// ========== Root / middleware ==========

#[tokio::test]
async fn test_root_status_names_backend() {
    let app = setup_test_app();
    let (status, json) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Finesight API is running (in-memory)");
}

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_responses_are_gzip_compressed() {
    let app = setup_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("accept-encoding", "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-encoding"], "gzip");
}

fn limited_app(max_requests: u32) -> Router {
    create_router(
        Arc::new(MemoryStore::new()),
        None,
        &ServerConfig {
            rate_limit: Some(RateLimitConfig {
                max_requests,
                window: std::time::Duration::from_secs(60),
            }),
            ..ServerConfig::default()
        },
    )
}

fn request_from(ip: [u8; 4]) -> Request<Body> {
    let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(axum::extract::ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

#[tokio::test]
async fn test_rate_limit_rejects_after_max_requests() {
    let app = limited_app(2);

    for remaining in ["1", "0"] {
        let response = app.clone().oneshot(request_from([10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-limit"], "2");
        assert_eq!(response.headers()["ratelimit-remaining"], remaining);
    }

    let response = app.clone().oneshot(request_from([10, 0, 0, 1])).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    // Security headers still apply to rejected requests
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    let json = get_body_json(response).await;
    assert_eq!(json["error"], RATE_LIMIT_MESSAGE);

    // Other clients keep their own budget
    let response = app.oneshot(request_from([10, 0, 0, 2])).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_disabled() {
    let app = create_router(
        Arc::new(MemoryStore::new()),
        None,
        &ServerConfig {
            rate_limit: None,
            ..ServerConfig::default()
        },
    );

    for _ in 0..3 {
        let response = app.clone().oneshot(request_from([10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("ratelimit-limit"));
    }
}

#[test]
fn test_storage_errors_are_internal() {
    let err = AppError::from(finesight_core::Error::Storage("lock poisoned".into()));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let err = AppError::from(finesight_core::Error::InvalidData("amount".into()));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_internal_error_hides_cause() {
    let err = AppError::internal_with(
        "Failed to scan receipt",
        finesight_core::Error::Ai("upstream returned 502".into()),
    );
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = get_body_json(err.into_response()).await;
    assert_eq!(json, json!({"error": "Failed to scan receipt"}));
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let app = setup_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/expenses")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].is_string());
}

// ========== CRUD ==========

#[tokio::test]
async fn test_create_then_list_expense() {
    let app = setup_test_app();

    let (status, json) = send(&app, "POST", "/api/expenses", Some(expense_body("e1", "u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "success");
    assert_eq!(json["data"]["date"], "2024-03-02");
    assert_eq!(json["data"]["payment_method"], "Cash");

    send(&app, "POST", "/api/expenses", Some(expense_body("e2", "u2"))).await;

    let (status, json) = send(&app, "GET", "/api/expenses?user_id=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], "e1");
    assert_eq!(data[0]["title"], "Lunch");
}

#[tokio::test]
async fn test_create_generates_id() {
    let app = setup_test_app();
    let body = json!({"user_id": "u1", "source": "Salary", "amount": 2500});

    let (status, json) = send(&app, "POST", "/api/incomes", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    let id = json["data"]["id"].as_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_missing_owner_is_rejected() {
    let app = setup_test_app();

    let (status, json) = send(&app, "GET", "/api/expenses", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "user_id required");

    let mut body = expense_body("e1", "");
    body.as_object_mut().unwrap().remove("user_id");
    let (status, json) = send(&app, "POST", "/api/expenses", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "user_id required");
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let app = setup_test_app();
    let body = json!({"user_id": "u1", "title": "", "amount": 3, "category": "Food"});
    let (status, json) = send(&app, "POST", "/api/expenses", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "title required");
}

#[tokio::test]
async fn test_duplicate_id_conflicts() {
    let app = setup_test_app();
    send(&app, "POST", "/api/expenses", Some(expense_body("e1", "u1"))).await;
    let (status, _) = send(&app, "POST", "/api/expenses", Some(expense_body("e1", "u1"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_is_owner_scoped() {
    let app = setup_test_app();
    send(&app, "POST", "/api/expenses", Some(expense_body("e1", "u1"))).await;

    let mut changed = expense_body("ignored", "u2");
    changed["amount"] = json!(99.0);

    let (status, json) = send(&app, "PUT", "/api/expenses/e1?user_id=u2", Some(changed.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Expense not found");

    let (status, json) = send(&app, "PUT", "/api/expenses/e1?user_id=u1", Some(changed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], "e1");
    assert_eq!(json["data"]["user_id"], "u1");
    assert_eq!(json["data"]["amount"], 99.0);
}

#[tokio::test]
async fn test_delete_by_other_owner_keeps_record() {
    let app = setup_test_app();
    send(&app, "POST", "/api/expenses", Some(expense_body("e1", "u1"))).await;

    let (status, _) = send(&app, "DELETE", "/api/expenses/e1?user_id=u2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&app, "GET", "/api/expenses?user_id=u1", None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (status, json) = send(&app, "DELETE", "/api/expenses/e1?user_id=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "deleted");

    let (_, json) = send(&app, "GET", "/api/expenses?user_id=u1", None).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_budget_upsert_and_month_filter() {
    let app = setup_test_app();
    let budget = |id: &str, limit: f64, month: u32| {
        json!({"id": id, "user_id": "u1", "category": "Food", "limit": limit, "month": month, "year": 2024})
    };

    send(&app, "POST", "/api/budgets", Some(budget("b1", 300.0, 3))).await;
    let (status, json) = send(&app, "POST", "/api/budgets", Some(budget("b2", 450.0, 3))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], "b1");
    send(&app, "POST", "/api/budgets", Some(budget("b3", 100.0, 4))).await;

    let (_, json) = send(&app, "GET", "/api/budgets?user_id=u1", None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let (_, json) = send(&app, "GET", "/api/budgets?user_id=u1&month=3&year=2024", None).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["limit"], 450.0);

    let (status, json) = send(&app, "POST", "/api/budgets", Some(budget("b4", 1.0, 13))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("month"));
}

#[tokio::test]
async fn test_goal_partial_update() {
    let app = setup_test_app();
    let goal = json!({
        "id": "g1",
        "user_id": "u1",
        "title": "New Car",
        "targetAmount": 10000,
        "deadline": "2025-06-30",
        "color": 4283215696i64
    });
    send(&app, "POST", "/api/goals", Some(goal)).await;

    let (status, json) = send(
        &app,
        "PUT",
        "/api/goals/g1?user_id=u1",
        Some(json!({"currentAmount": 1500})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["current_amount"], 1500.0);
    assert_eq!(json["data"]["title"], "New Car");
    assert_eq!(json["data"]["deadline"], "2025-06-30");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/goals/g1?user_id=u2",
        Some(json!({"currentAmount": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_split_round_trip_with_aliases() {
    let app = setup_test_app();
    let split = json!({
        "id": "s1",
        "userId": "u1",
        "description": "Dinner",
        "totalAmount": 90,
        "payer": "me",
        "splits": [{"name": "me", "amount": 30}, {"participant": "Ana", "share": 60}],
        "date": "2024-03-02"
    });
    let (status, _) = send(&app, "POST", "/api/splits", Some(split)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, "GET", "/api/splits?user_id=u1", None).await;
    let splits = &json["data"][0]["splits"];
    assert_eq!(splits[0]["participant"], "me");
    assert_eq!(splits[1]["share"], 60.0);
    assert_eq!(json["data"][0]["total_amount"], 90.0);
}

#[tokio::test]
async fn test_debt_type_field_and_ordering() {
    let app = setup_test_app();
    for (id, due) in [("d1", Value::Null), ("d2", json!("2024-05-01"))] {
        let body = json!({"id": id, "user_id": "u1", "type": "owed", "person": "Sam", "amount": 40, "dueDate": due});
        let (status, _) = send(&app, "POST", "/api/debts", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, json) = send(&app, "GET", "/api/debts?user_id=u1", None).await;
    assert_eq!(json["data"][0]["id"], "d2");
    assert_eq!(json["data"][0]["type"], "Owed");
    assert_eq!(json["data"][1]["due_date"], Value::Null);
}

#[tokio::test]
async fn test_recurring_can_be_paused() {
    let app = setup_test_app();
    let body = json!({
        "id": "r1",
        "user_id": "u1",
        "title": "Netflix",
        "amount": 15.49,
        "category": "Entertainment",
        "frequency": "monthly",
        "nextDate": "2024-02-01"
    });
    let (_, json) = send(&app, "POST", "/api/recurring", Some(body.clone())).await;
    assert_eq!(json["data"]["frequency"], "Monthly");
    assert_eq!(json["data"]["is_active"], true);

    let mut paused = body;
    paused["isActive"] = json!(false);
    let (status, json) = send(&app, "PUT", "/api/recurring/r1?user_id=u1", Some(paused)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["is_active"], false);
}

#[tokio::test]
async fn test_analytics() {
    let app = setup_test_app();
    send(&app, "POST", "/api/expenses", Some(expense_body("e1", "u1"))).await;
    let mut second = expense_body("e2", "u1");
    second["category"] = json!("Rent");
    second["amount"] = json!(1000);
    second["date"] = json!("2024-11-01");
    send(&app, "POST", "/api/expenses", Some(second)).await;

    let (status, json) = send(&app, "GET", "/api/analytics?user_id=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["category_totals"]["Food"], 12.5);
    assert_eq!(json["data"]["monthly_trends"]["2024-3"], 12.5);
    assert_eq!(json["data"]["monthly_trends"]["2024-11"], 1000.0);
    // Keys are snake_case only
    assert!(json["data"].get("categoryTotals").is_none());
    assert!(json["data"].get("monthlyTrends").is_none());
}

// ========== AI-assisted entry ==========

#[tokio::test]
async fn test_chat_adds_expense() {
    let app = setup_test_app();
    let body = json!({
        "message": "spent 7.25 on coffee",
        "user_id": "u1",
        "context": [{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}]
    });

    let (status, json) = send(&app, "POST", "/api/chat", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["action_performed"], true);
    assert_eq!(json["reply"], "✅ Added expense: Expense - $7.25 (Other)");

    let (_, json) = send(&app, "GET", "/api/expenses?user_id=u1", None).await;
    assert_eq!(json["data"][0]["payment_method"], "Card");
}

#[tokio::test]
async fn test_chat_plain_reply() {
    let app = setup_test_app();
    let body = json!({"message": "hello", "user_id": "u1"});
    let (status, json) = send(&app, "POST", "/api/chat", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["action_performed"], false);
}

#[tokio::test]
async fn test_ai_routes_without_backend() {
    let app = create_router(Arc::new(MemoryStore::new()), None, &ServerConfig::default());

    let (status, json) = send(
        &app,
        "POST",
        "/api/chat",
        Some(json!({"message": "spent 5", "user_id": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "AI backend not configured");

    let (status, _) = send(
        &app,
        "POST",
        "/api/scan-receipt",
        Some(json!({"image_base64": "aGk="})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_scan_receipt() {
    let app = setup_test_app();
    let image = base64::engine::general_purpose::STANDARD.encode(b"\xff\xd8\xff\xe0fake-jpeg");

    let (status, json) = send(
        &app,
        "POST",
        "/api/scan-receipt",
        Some(json!({"imageBase64": image})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["title"], "Mock Store");
    assert_eq!(json["data"]["amount"], 23.45);
    assert_eq!(json["data"]["date"], "2024-01-15");
}

#[tokio::test]
async fn test_scan_receipt_bad_input() {
    let app = setup_test_app();

    let (status, json) = send(&app, "POST", "/api/scan-receipt", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Image data required");

    let (status, _) = send(
        &app,
        "POST",
        "/api/scan-receipt",
        Some(json!({"image_base64": "%%%"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ========== SQLite-backed ==========

#[tokio::test]
async fn test_sqlite_backed_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.db");
    let db = Database::new_unencrypted(&path.to_string_lossy()).unwrap();
    let app = create_router(Arc::new(db), None, &ServerConfig::default());

    let (_, json) = send(&app, "GET", "/", None).await;
    assert_eq!(json["status"], "Finesight API is running (SQLite)");

    let (status, _) = send(&app, "POST", "/api/expenses", Some(expense_body("e1", "u1"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/api/expenses", Some(expense_body("e1", "u1"))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = send(&app, "GET", "/api/expenses?user_id=u1", None).await;
    assert_eq!(json["data"][0]["date"], "2024-03-02");
}

#[test]
fn test_parse_origins() {
    assert_eq!(
        ServerConfig::parse_origins("http://a.test, ,http://b.test"),
        vec!["http://a.test".to_string(), "http://b.test".to_string()]
    );
    assert!(ServerConfig::parse_origins("").is_empty());
}
