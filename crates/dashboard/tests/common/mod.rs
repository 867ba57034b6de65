//! Common test utilities for integration tests.
//!
//! Apps are built over the in-memory store, so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use persistence::schema::tables;
use persistence::{DataStore, MemoryObjectStorage, MemoryStore, ObjectStorage};
use playtime_dashboard::{app::create_app, config::Config};
use serde_json::{json, Value};
use shared::jwt::AccessTokenVerifier;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

pub struct TestApp {
    pub router: Router,
    pub memory: Arc<MemoryStore>,
    pub storage: Arc<MemoryObjectStorage>,
    pub admin_id: Uuid,
    pub admin_token: String,
}

pub fn test_config() -> Config {
    Config::load_for_test(&[("auth.jwt_secret", TEST_JWT_SECRET)])
        .expect("test config should load")
}

/// Issue an access token for `user_id`.
pub fn token_for(user_id: Uuid) -> String {
    AccessTokenVerifier::new(TEST_JWT_SECRET)
        .issue(user_id, Some("admin@example.com"), 3600)
        .expect("token should encode")
}

/// Seed a profile with a role and return its id.
pub fn seed_user_with_role(memory: &MemoryStore, email: &str, role: &str) -> Uuid {
    let rows = memory
        .seed(
            tables::PROFILES,
            vec![json!({"email": email, "full_name": "Test Admin"})],
        )
        .expect("profile seed");
    let id: Uuid = rows[0]["id"].as_str().unwrap().parse().unwrap();
    memory
        .seed(tables::USER_ROLES, vec![json!({"user_id": id, "role": role})])
        .expect("role seed");
    id
}

/// App with one signed-in administrator.
pub fn create_test_app() -> TestApp {
    let memory = Arc::new(MemoryStore::new());
    let storage = Arc::new(MemoryObjectStorage::new());
    let admin_id = seed_user_with_role(&memory, "admin@example.com", "admin");

    let store: Arc<dyn DataStore> = memory.clone();
    let object_storage: Arc<dyn ObjectStorage> = storage.clone();
    let router = create_app(test_config(), store, object_storage);

    TestApp {
        router,
        memory,
        storage,
        admin_id,
        admin_token: token_for(admin_id),
    }
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn parse_response_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// Id column of a seeded row.
pub fn row_id(row: &serde_json::Map<String, Value>) -> Uuid {
    row["id"].as_str().unwrap().parse().unwrap()
}
