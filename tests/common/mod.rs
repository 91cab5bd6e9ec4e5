//! Stub records API shared by the integration tests.
//! Listens on an ephemeral localhost port and answers a handful of fixed routes.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const GOOD_PASSWORD: &str = "secret1";

/// Login and registration for this address fail inside the API.
pub const CRASH_EMAIL: &str = "crash@uni.example";

fn header(headers: &HeaderMap, name: &str) -> Value {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|s| Value::String(s.to_string())).unwrap_or(Value::Null)
}

fn has_role(headers: &HeaderMap, role: &str) -> bool {
    headers.get("roles").and_then(|v| v.to_str().ok()).map(|s| s.split_whitespace().any(|r| r == role)).unwrap_or(false)
}

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    let email = body.get("email").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let password = body.get("password").and_then(|v| v.as_str()).unwrap_or_default();
    if email == CRASH_EMAIL {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "database down"})));
    }
    if password != GOOD_PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Wrong email or password"})));
    }
    let role = if email.starts_with("admin@") { "MANAGER ADMIN" } else { "USER" };
    let id = if email.starts_with("admin@") { 1 } else { 2 };
    (StatusCode::OK, Json(json!({
        "accessToken": format!("tok-{}", id),
        "user": {"id": id, "fullName": "Test Person", "email": email, "role": role}
    })))
}

async fn register(Json(body): Json<Value>) -> impl IntoResponse {
    match body.get("email").and_then(|v| v.as_str()) {
        Some("taken@uni.example") => {
            return (StatusCode::CONFLICT, Json(json!({"message": "Email already registered"})));
        }
        Some(CRASH_EMAIL) => {
            return (StatusCode::BAD_GATEWAY, Json(json!({"message": "mail relay down"})));
        }
        _ => {}
    }
    (StatusCode::CREATED, Json(json!({"id": 99, "message": "created"})))
}

async fn echo(headers: HeaderMap, Query(q): Query<Vec<(String, String)>>) -> impl IntoResponse {
    Json(json!({
        "authorization": header(&headers, "authorization"),
        "roles": header(&headers, "roles"),
        "query": q.into_iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>(),
    }))
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::IM_A_TEAPOT);
    (status, Json(json!({"message": format!("status {}", code)})))
}

async fn upload(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    (StatusCode::CREATED, Json(json!({
        "contentType": header(&headers, "content-type"),
        "length": body.len(),
        "authorization": header(&headers, "authorization"),
    })))
}

async fn students(headers: HeaderMap) -> impl IntoResponse {
    if headers.get("authorization").is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthorized"})));
    }
    (StatusCode::OK, Json(json!([{"id": 1, "fullName": "Ann"}, {"id": 2, "fullName": "Ben"}])))
}

async fn users(headers: HeaderMap) -> impl IntoResponse {
    if !has_role(&headers, "ADMIN") {
        return (StatusCode::FORBIDDEN, Json(json!({"message": "Forbidden resource"})));
    }
    (StatusCode::OK, Json(json!({"items": [{"id": 1}, {"id": 2}], "total": 2})))
}

async fn delete_user(Path(id): Path<String>) -> impl IntoResponse {
    Json(json!({"deleted": id}))
}

// Simulates a token the API no longer accepts.
async fn courses() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "jwt expired"})))
}

async fn classes() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "database down"})))
}

pub fn stub_api() -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/echo", get(echo).post(echo).put(echo).delete(echo))
        .route("/status/{code}", get(status))
        .route("/upload", post(upload))
        .route("/students", get(students))
        .route("/students/{id}/avatar", post(upload))
        .route("/users", get(users))
        .route("/users/{id}", delete(delete_user))
        .route("/courses", get(courses))
        .route("/classes", get(classes))
}

/// Serve `router` on 127.0.0.1 with an OS-assigned port and return that port.
pub async fn serve(router: Router) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    port
}

pub async fn spawn_stub_api() -> u16 {
    serve(stub_api()).await
}

/// A port nothing is listening on.
pub async fn dead_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}
