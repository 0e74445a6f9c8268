//! Common test utilities for integration tests
//!
//! Builds the full router over in-memory storage and a manual clock, so
//! tests run without a database and can move across day boundaries.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use dailytodo_api::app::{build_router, AppState};
use dailytodo_api::config::Config;
use dailytodo_shared::clock::{Clock, ManualClock};
use dailytodo_shared::models::user::{CreateUser, User};
use dailytodo_shared::store::Storage;
use std::sync::Arc;
use tower::Service as _;

/// Test context containing all necessary resources
pub struct TestContext {
    pub storage: Storage,
    pub clock: Arc<ManualClock>,
    pub app: axum::Router,
}

impl TestContext {
    /// Creates a context with default configuration and empty storage
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(Config::from_lookup(|_| None)?).await
    }

    /// Creates a context from an explicit configuration
    pub async fn with_config(config: Config) -> anyhow::Result<Self> {
        let storage = Storage::connect(&config.storage).await?;
        Ok(Self::with_storage(storage, config))
    }

    /// Creates a context over already-built storage handles
    pub fn with_storage(storage: Storage, config: Config) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));

        let state = AppState::new(storage.clone(), clock.clone(), config);
        let app = build_router(state);

        TestContext {
            storage,
            clock,
            app,
        }
    }

    /// Inserts a user directly into storage
    pub async fn create_user(&self, id: i64, max_tasks_per_day: i32) -> anyhow::Result<User> {
        let user = self
            .storage
            .users
            .create(
                CreateUser {
                    id,
                    name: format!("user-{}", id),
                    max_tasks_per_day,
                },
                self.clock.now(),
            )
            .await?;
        Ok(user)
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
            })
        };

        (status, json)
    }

    /// GET helper
    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// DELETE helper
    pub async fn delete(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Form-encoded request helper
    pub async fn form(
        &self,
        method: &str,
        uri: &str,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        self.send(form_request(method, uri, body)).await
    }

    /// Creates a task through the API
    pub async fn create_task(&self, user_id: i64, text: &str) -> (StatusCode, serde_json::Value) {
        self.form(
            "POST",
            &format!("/users/{}/tasks", user_id),
            &format!("task={}", encode(text)),
        )
        .await
    }
}

/// Fixed instant tests start from
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

/// Builds a form-encoded request
pub fn form_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Minimal form encoding for test payloads
pub fn encode(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' ' => "+".to_string(),
            c if c.is_ascii_alphanumeric() || "-_.*".contains(c) => c.to_string(),
            c => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{:02X}", b))
                    .collect()
            }
        })
        .collect()
}
