//! End-to-end tests of the HTTP surface against the in-memory store and cache.
//!
//! Run with: `cargo test --test api_test`

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use coursedesk::cache::DashboardCache;
use coursedesk::config::AppConfig;
use coursedesk::store::{collections, Store};
use coursedesk::{routes, AppState};

/// Spin up the full Axum app on a random port, returning the base URL.
async fn start_server() -> (String, tokio::task::JoinHandle<()>) {
    start_server_with(Store::memory()).await
}

/// Same as [`start_server`], over a store the test has already populated.
async fn start_server_with(store: Store) -> (String, tokio::task::JoinHandle<()>) {
    let config = AppConfig::in_memory();
    let state = AppState {
        store,
        cache: DashboardCache::memory(config.cache_namespace.clone(), config.cache_ttl_secs),
        config,
    };
    let app = routes::router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (base_url, handle)
}

/// Helper: extract `data` from the API envelope, panic with message on error.
fn extract_data(body: &Value) -> &Value {
    if body["success"] != json!(true) {
        panic!(
            "API error: {}: {}",
            body["code"].as_str().unwrap_or("?"),
            body["message"].as_str().unwrap_or("?"),
        );
    }
    body.get("data").expect("missing 'data' field")
}

async fn post(client: &Client, url: String, body: Value) -> (StatusCode, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn get(client: &Client, url: String) -> (StatusCode, Value) {
    let resp = client.get(url).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn health_endpoints_report_backends() {
    let (base, _handle) = start_server().await;
    let client = Client::new();

    let resp = client.get(format!("{base}/health/live")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "OK");

    let (status, body) = get(&client, format!("{base}/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
    let data = extract_data(&body);
    assert_eq!(data["status"], "ok");
    assert_eq!(data["store"]["backend"], "memory");
    assert_eq!(data["cache"]["backend"], "memory");
}

#[tokio::test]
async fn user_course_enrollment_flow() {
    let (base, _handle) = start_server().await;
    let client = Client::new();

    // Users
    let (status, body) = post(
        &client,
        format!("{base}/api/users"),
        json!({ "username": "ada", "email": "ada@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let user_id = extract_data(&body)["id"].as_str().unwrap().to_string();

    let (status, body) = post(
        &client,
        format!("{base}/api/users"),
        json!({ "username": "ada2", "email": "ada@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    // Courses
    let (status, body) = post(
        &client,
        format!("{base}/api/courses"),
        json!({ "title": "Rust", "language": "Rust", "status": "published" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let course = extract_data(&body);
    let course_id = course["id"].as_str().unwrap().to_string();
    assert!(course_id.starts_with("rust_"));
    assert_eq!(course["enrollmentCount"], 0);

    // Enrollment, then a duplicate active one
    let enrollment = json!({ "userId": user_id, "courseId": course_id });
    let (status, body) = post(&client, format!("{base}/api/enrollments"), enrollment.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let enrollment_id = extract_data(&body)["id"].as_str().unwrap().to_string();

    let (status, body) = post(&client, format!("{base}/api/enrollments"), enrollment).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User is already enrolled in this course");

    let (_, body) = get(&client, format!("{base}/api/courses/{course_id}")).await;
    assert_eq!(extract_data(&body)["enrollmentCount"], 1);

    // Progress to completion
    let resp = client
        .put(format!("{base}/api/enrollments/{enrollment_id}/progress"))
        .json(&json!({ "progress": 100 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(extract_data(&body)["status"], "completed");

    let (_, body) = get(&client, format!("{base}/api/enrollments?status=completed")).await;
    assert_eq!(extract_data(&body).as_array().unwrap().len(), 1);

    // Delete decrements the course counter
    let resp = client
        .delete(format!("{base}/api/enrollments/{enrollment_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let (_, body) = get(&client, format!("{base}/api/courses/{course_id}")).await;
    assert_eq!(extract_data(&body)["enrollmentCount"], 0);
}

#[tokio::test]
async fn enroll_by_course_name_updates_both_sides() {
    let (base, _handle) = start_server().await;
    let client = Client::new();

    post(
        &client,
        format!("{base}/api/users"),
        json!({ "username": "grace", "email": "grace@example.com" }),
    )
    .await;
    let (_, body) = post(
        &client,
        format!("{base}/api/courses"),
        json!({ "courseName": "Compilers" }),
    )
    .await;
    let course_id = extract_data(&body)["id"].as_str().unwrap().to_string();

    let request = json!({ "email": "grace@example.com", "courseName": "Compilers" });
    let (status, body) = post(&client, format!("{base}/api/users/enroll"), request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(extract_data(&body)["message"], "User successfully enrolled in course");

    let (_, body) = get(&client, format!("{base}/api/courses/{course_id}/enrolled-users")).await;
    assert_eq!(extract_data(&body), &json!(["grace@example.com"]));

    let (status, _) = post(&client, format!("{base}/api/users/enroll"), request).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn content_hierarchy_and_quizzes() {
    let (base, _handle) = start_server().await;
    let client = Client::new();

    let (_, body) = post(&client, format!("{base}/api/courses"), json!({ "title": "Rust" })).await;
    let course_id = extract_data(&body)["id"].as_str().unwrap().to_string();

    let (status, body) = post(
        &client,
        format!("{base}/api/modules"),
        json!({ "courseId": course_id, "title": "Ownership", "order": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let module_id = extract_data(&body)["id"].as_str().unwrap().to_string();

    let (status, body) = post(
        &client,
        format!("{base}/api/lessons"),
        json!({ "moduleId": module_id, "title": "Moves", "order": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(extract_data(&body)["courseId"], course_id.as_str());

    let (_, body) = get(&client, format!("{base}/api/modules/{module_id}/lessons")).await;
    assert_eq!(extract_data(&body).as_array().unwrap().len(), 1);

    for difficulty in ["easy", "hard"] {
        let (status, _) = post(
            &client,
            format!("{base}/api/courses/{course_id}/quizzes"),
            json!({
                "moduleId": module_id,
                "question": "Which keyword moves?",
                "options": ["move", "copy", "ref", "mut"],
                "correctOptionIndex": 0,
                "difficulty": difficulty
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = get(
        &client,
        format!("{base}/api/courses/{course_id}/quizzes?moduleId={module_id}"),
    )
    .await;
    assert_eq!(extract_data(&body).as_array().unwrap().len(), 2);

    let (_, body) = get(&client, format!("{base}/api/courses/{course_id}/quizzes/stats")).await;
    let stats = extract_data(&body);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["easy"], 1);
    assert_eq!(stats["hard"], 1);

    let (status, body) = post(
        &client,
        format!("{base}/api/modules"),
        json!({ "courseId": "missing", "title": "Orphan" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn dashboard_reports_cache_provenance() {
    let (base, _handle) = start_server().await;
    let client = Client::new();

    post(
        &client,
        format!("{base}/api/users"),
        json!({ "username": "ada", "email": "ada@example.com" }),
    )
    .await;

    let (status, body) = get(&client, format!("{base}/api/dashboard/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(extract_data(&body)["users"]["total"], 1);
    assert_eq!(body["cache"]["source"], "fresh");
    assert_eq!(body["cache"]["usingCache"], false);

    // A second user is not visible until the cached entry is refreshed.
    post(
        &client,
        format!("{base}/api/users"),
        json!({ "username": "bob", "email": "bob@example.com" }),
    )
    .await;
    let (_, body) = get(&client, format!("{base}/api/dashboard/stats")).await;
    assert_eq!(extract_data(&body)["users"]["total"], 1);
    assert_eq!(body["cache"]["source"], "cache");
    assert_eq!(body["cache"]["usingCache"], true);

    let (_, body) = get(&client, format!("{base}/api/dashboard/stats?refresh=true")).await;
    assert_eq!(extract_data(&body)["users"]["total"], 2);
    assert_eq!(body["cache"]["source"], "fresh");

    let resp = client
        .post(format!("{base}/api/dashboard/cache/clear"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(extract_data(&body)["removed"], 1);
}

#[tokio::test]
async fn dashboard_charts() {
    let (base, _handle) = start_server().await;
    let client = Client::new();

    let (status, body) = get(&client, format!("{base}/api/dashboard/charts/users-created")).await;
    assert_eq!(status, StatusCode::OK);
    let chart = extract_data(&body);
    assert_eq!(chart["labels"].as_array().unwrap().len(), 12);

    let (status, body) = get(&client, format!("{base}/api/dashboard/charts/all")).await;
    assert_eq!(status, StatusCode::OK);
    let charts = extract_data(&body);
    for key in ["usersCreated", "leaderboard", "quizAnalytics", "courseProgress", "achievements"] {
        assert!(charts.get(key).is_some(), "missing chart {key}");
        assert!(charts[key].get("error").is_none(), "chart {key} failed");
    }

    let (status, _) = get(&client, format!("{base}/api/dashboard/charts/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn imported_documents_do_not_break_dashboard() {
    let store = Store::memory();
    for (collection, id, data) in [
        (collections::USERS, "u1", json!({"username": "ada", "status": "active"})),
        (collections::USERS, "u2", json!({"username": "bob", "status": "pending"})),
        (collections::COURSES, "c1", json!({"title": "Rust", "status": "archived"})),
        (
            collections::ENROLLMENTS,
            "e1",
            json!({"userId": "u1", "courseId": "c1", "status": "active", "progress": 42.5}),
        ),
        (collections::QUIZZES, "q1", json!({"courseId": "c1", "question": "?", "difficulty": "easy"})),
    ] {
        store.insert(collection, id.to_string(), data).await.unwrap();
    }
    let (base, _handle) = start_server_with(store.clone()).await;
    let client = Client::new();

    let (status, body) = get(&client, format!("{base}/api/dashboard/stats")).await;
    assert_eq!(status, StatusCode::OK);
    let users = &extract_data(&body)["users"];
    assert_eq!(users["active"], 1);
    assert_eq!(users["inactive"], 0);

    let (status, body) = get(&client, format!("{base}/api/users")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(extract_data(&body)["total"], 2);

    let (status, _) = get(&client, format!("{base}/api/dashboard/analytics")).await;
    assert_eq!(status, StatusCode::OK);

    // A course that cannot be read at all fails the pass-rate chart, the
    // only chart built from course entities.
    store
        .insert(collections::COURSES, "c2".to_string(), json!({"title": ["not", "text"]}))
        .await
        .unwrap();
    let (status, body) = get(&client, format!("{base}/api/dashboard/charts/all")).await;
    assert_eq!(status, StatusCode::OK);
    let charts = extract_data(&body);
    assert!(charts["quizAnalytics"]["error"].is_string(), "{charts}");
    for key in ["usersCreated", "leaderboard", "courseProgress", "achievements"] {
        assert!(charts[key]["labels"].is_array(), "chart {key} failed: {}", charts[key]);
    }
}

#[tokio::test]
async fn assessments_filter_by_type() {
    let (base, _handle) = start_server().await;
    let client = Client::new();

    let (status, _) = post(
        &client,
        format!("{base}/api/assessments"),
        json!({
            "title": "Fix it",
            "type": "code_fix",
            "brokenCode": "fn main() { let x = 1; x = 2; }",
            "correctOutput": "2"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &client,
        format!("{base}/api/assessments"),
        json!({
            "title": "Query it",
            "type": "sql_query",
            "expectedQuery": "SELECT 1",
            "isActive": false
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&client, format!("{base}/api/assessments?type=sql_query")).await;
    let items = extract_data(&body).as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["expectedQuery"], "SELECT 1");

    let (_, body) = get(&client, format!("{base}/api/assessments?active=true")).await;
    assert_eq!(extract_data(&body).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn users_paging_and_validation() {
    let (base, _handle) = start_server().await;
    let client = Client::new();

    for name in ["cy", "ada", "bob"] {
        post(
            &client,
            format!("{base}/api/users"),
            json!({ "username": name, "email": format!("{name}@example.com") }),
        )
        .await;
    }

    let (status, body) = get(
        &client,
        format!("{base}/api/users?page=1&limit=2&sortBy=username&order=asc"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page = extract_data(&body);
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"][0]["username"], "ada");

    let (status, body) = get(&client, format!("{base}/api/users?sortBy=password")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = post(
        &client,
        format!("{base}/api/users"),
        json!({ "username": "x", "email": "not-an-email" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_request_body_is_rejected() {
    let (base, _handle) = start_server().await;
    let client = Client::new();

    let body = json!({ "username": "x".repeat(2 * 1024 * 1024), "email": "big@example.com" });
    let resp = client
        .post(format!("{base}/api/users"))
        .header("origin", "http://localhost:5173")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = post(
        &client,
        format!("{base}/api/users"),
        json!({ "username": "small", "email": "small@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
