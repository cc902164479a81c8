use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    Router,
};
use axum_test::TestServer;
use chrono::NaiveDate;
use daybook_rest_api::api::{self, AppState};
use daybook_rest_api::tracker::OperationStats;
use daybook_rest_api::USER_HEADER;
use serde_json::{json, Value};
use tower::ServiceExt;

// Nothing listens here; only requests rejected before touching the pool
// can succeed against this router.
const UNREACHABLE_DB: &str = "postgres://daybook@127.0.0.1:1/daybook";

fn offline_router() -> Router {
    api::router(AppState::new(api::build_pool(UNREACHABLE_DB, 1)))
}

fn offline_server() -> TestServer {
    TestServer::new(offline_router()).unwrap()
}

fn user_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(USER_HEADER),
        HeaderValue::from_static("integration-user"),
    )
}

#[tokio::test]
async fn test_health() {
    let server = offline_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let app = offline_router();
    for uri in ["/tasks", "/sections", "/goals", "/days/2024-07-01", "/planner"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_blank_user_header_is_unauthorized() {
    let server = offline_server();
    let response = server
        .get("/tasks")
        .add_header(
            HeaderName::from_static(USER_HEADER),
            HeaderValue::from_static("   "),
        )
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_validation_runs_before_storage() {
    let server = offline_server();
    let (name, value) = user_header();

    let blank_title = server
        .post("/tasks")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "   " }))
        .await;
    blank_title.assert_status(StatusCode::BAD_REQUEST);

    let bad_time = server
        .post("/tasks")
        .add_header(name, value)
        .json(&json!({ "title": "Stretch", "scheduledTime": "noon" }))
        .await;
    bad_time.assert_status(StatusCode::BAD_REQUEST);
    assert!(bad_time.text().contains("noon"));
}

#[tokio::test]
async fn test_reorder_rejects_duplicates() {
    let server = offline_server();
    let (name, value) = user_header();

    let response = server
        .put("/days/2024-07-01/order")
        .add_header(name, value)
        .json(&json!({
            "items": [
                { "kind": "task", "id": 1 },
                { "kind": "section", "id": 1 },
                { "kind": "task", "id": 1 }
            ]
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_dates_are_rejected() {
    let server = offline_server();
    let (name, value) = user_header();

    server
        .get("/days/not-a-date")
        .add_header(name.clone(), value.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/stats/week?days=0")
        .add_header(name.clone(), value.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/titles?from=2024-07-02&to=2024-07-01")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_far_future_ranges_are_rejected() {
    let server = offline_server();
    let (name, value) = user_header();
    let last_day = NaiveDate::MAX.to_string();

    server
        .get("/stats/week")
        .add_header(name.clone(), value.clone())
        .add_query_param("start", &last_day)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/planner")
        .add_header(name.clone(), value.clone())
        .add_query_param("start", &last_day)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/tasks/rollover")
        .add_header(name, value)
        .json(&json!({ "date": NaiveDate::MAX }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_validate() {
    let server = offline_server();

    let weak: Value = server
        .post("/auth/validate")
        .json(&json!({ "email": "no-at-sign", "password": "abc", "mode": "signup" }))
        .await
        .json();
    assert_eq!(weak["valid"], false);
    assert_eq!(weak["errors"].as_array().unwrap().len(), 5);

    let login: Value = server
        .post("/auth/validate")
        .json(&json!({ "email": "a@b.co", "password": "abc", "mode": "login" }))
        .await
        .json();
    assert_eq!(login["valid"], true);

    let message: Value = server.get("/auth/errors/wrong-password").await.json();
    assert_eq!(message["message"], "Incorrect email or password.");
}

#[tokio::test]
async fn test_operation_stats_reports_limits() {
    let server = offline_server();
    let stats: OperationStats = server.get("/stats/operations").await.json();
    assert_eq!(stats.daily_read_limit, 50_000);
    assert_eq!(stats.daily_write_limit, 20_000);
}

// * With a database ..........................................................

fn database_server() -> TestServer {
    dotenv::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    TestServer::new(api::create_router(api::build_pool(&url, 2))).unwrap()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_day_flow() {
    let server = database_server();
    let name = HeaderName::from_static(USER_HEADER);
    let value = HeaderValue::from_str(&format!("flow-{}", uuid::Uuid::new_v4())).unwrap();
    let day = "2031-01-06";

    for title in ["first", "second"] {
        server
            .post("/tasks")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "title": title, "date": day }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    server
        .post("/sections")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "text": "Evening", "time": "18", "date": day }))
        .await
        .assert_status(StatusCode::CREATED);

    // Newest first: section, second, first
    let view: Value = server
        .get(&format!("/days/{day}"))
        .add_header(name.clone(), value.clone())
        .await
        .json();
    let items = view["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["kind"], "section");
    assert_eq!(items[1]["title"], "second");

    let moved: Value = server
        .post(&format!("/days/{day}/move"))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "dragIndex": 0, "hoverIndex": 2 }))
        .await
        .json();
    let items = moved["items"].as_array().unwrap();
    assert_eq!(items[2]["kind"], "section");
    assert_eq!(items[2]["order"], 2);

    let summary: Value = server
        .post("/tasks/rollover")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "date": day }))
        .await
        .json();
    assert_eq!(summary["movedTasks"], 2);
    assert_eq!(summary["deletedSections"], 1);
    assert_eq!(summary["targetDate"], "2031-01-07");
}
