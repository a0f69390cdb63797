//! Drives the router end to end over the in-memory store.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use forum_api::adapters::MemoryStore;
use forum_api::config::{Config, MEMORY_DATABASE_URL};
use forum_api::web::{build_router, state::AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let vars: HashMap<String, String> = [
        ("DATABASE_URL", MEMORY_DATABASE_URL),
        ("JWT_SECRET", "http-test-secret-value"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let config = Arc::new(Config::from_map(&vars).unwrap());
    let state = Arc::new(AppState::new(Arc::new(MemoryStore::new()), config));
    build_router(state).unwrap()
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
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
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@x.test", username),
            "password": "secret123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = call(&app, Method::GET, "/api/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (token, id) = register(&app, "alice").await;
    let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["role"], "student");
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn students_cannot_create_categories() {
    let app = app();
    let (token, _) = register(&app, "alice").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/categories",
        Some(&token),
        Some(json!({ "name": "General" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("teacher"));

    let (status, body) = call(&app, Method::GET, "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn unknown_topics_are_404_with_a_message() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/topics/no-such-topic", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("no-such-topic"));

    let (status, _) = call(&app, Method::GET, "/api/topics/latest?limit=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notification_routes_round_trip_over_http() {
    let app = app();
    let (token, _) = register(&app, "alice").await;

    let (status, body) = call(&app, Method::GET, "/api/notifications", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalNotifications"], 0);
    assert_eq!(body["currentPage"], 1);

    let (status, body) = call(&app, Method::POST, "/api/notifications/mark-read", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modifiedCount"], 0);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/notifications/mark-read",
        Some(&token),
        Some(json!({ "notificationIds": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modifiedCount"], 0);

    let (status, body) = call(&app, Method::DELETE, "/api/notifications", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], 0);
}

#[tokio::test]
async fn public_profiles_hide_emails() {
    let app = app();
    let (_, id) = register(&app, "alice").await;

    let (status, body) = call(&app, Method::GET, "/api/users/profile/alice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id);
    assert!(body["user"].get("email").is_none());
    assert_eq!(body["topicCount"], 0);

    let (status, body) = call(&app, Method::GET, "/api/users/public?limit=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["totalItems"], 1);
    assert_eq!(body["pagination"]["hasMore"], false);
}
