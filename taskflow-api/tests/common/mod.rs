//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - A private in-memory database per test
//! - A mock mail transport behind a running dispatcher
//! - Request helpers that drive the full router in process
//! - Account helpers (register, read the mailed code, verify)

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskflow_api::app::{build_router, AppState};
use taskflow_api::config::{Config, ServerConfig};
use taskflow_shared::db::{migrations::run_migrations, pool::create_pool};
use taskflow_worker::dispatcher::DispatcherConfig;
use taskflow_worker::queue::mail_channel;
use taskflow_shared::auth::code::CODE_LENGTH;
use taskflow_worker::templates::{VERIFICATION_SUBJECT, WELCOME_SUBJECT};
use taskflow_worker::transports::MockTransport;
use tokio_util::sync::CancellationToken;
use tower::Service as _;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const PASSWORD: &str = "secret1";

/// Test context containing all necessary resources
///
/// `shutdown` is the server's token and `background` stops the mail
/// dispatcher, mirroring how the binary wires them.
pub struct TestContext {
    pub db: SqlitePool,
    pub app: axum::Router,
    pub mail: MockTransport,
    pub server: ServerConfig,
    pub shutdown: CancellationToken,
    pub background: CancellationToken,
}

/// A response with its body already read
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    /// Body parsed as JSON, `Null` if it is not JSON
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestContext {
    /// Creates a new test context in development mode
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_env(&[]).await
    }

    /// Creates a test context, `overrides` taking precedence over test defaults
    pub async fn with_env(overrides: &[(&str, &str)]) -> anyhow::Result<Self> {
        let mut vars: HashMap<String, String> = [
            ("DB_PATH", ":memory:"),
            ("DEBUG", "true"),
            ("JWT_SECRET", TEST_SECRET),
            ("ARGON2_MEMORY_KIB", "1024"),
            ("ARGON2_ITERATIONS", "1"),
            ("ARGON2_PARALLELISM", "1"),
            ("RATE_LIMIT_PER_SECOND", "1000"),
            ("RATE_LIMIT_BURST", "1000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_lookup(|key| vars.get(key).cloned())?;

        let db = create_pool(config.database.clone()).await?;
        run_migrations(&db).await?;

        let mail = MockTransport::new();
        let background = CancellationToken::new();
        let (queue, dispatcher) = mail_channel(
            Arc::new(mail.clone()),
            DispatcherConfig {
                base_url: config.server.base_url.clone(),
                ..Default::default()
            },
            background.clone(),
        );
        tokio::spawn(dispatcher.run());

        let server = config.server.clone();
        let app = build_router(AppState::new(db.clone(), config, queue));

        Ok(Self {
            db,
            app,
            mail,
            server,
            shutdown: CancellationToken::new(),
            background,
        })
    }

    /// Sends a request through the full router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(header::HeaderName, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(name.clone(), *value);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, &[]).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body), &[]).await
    }

    /// Sends a request carrying `Authorization: Bearer <token>`
    pub async fn authed(&self, method: Method, uri: &str, body: Option<Value>, token: &str) -> TestResponse {
        let bearer = format!("Bearer {}", token);
        self.send(method, uri, body, &[(header::AUTHORIZATION, bearer.as_str())])
            .await
    }

    pub async fn register(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/api/v1/register",
            serde_json::json!({
                "email": email,
                "password": password,
                "firstName": "Ada",
                "lastName": "Lovelace",
            }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/api/v1/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn verify(&self, email: &str, code: &str) -> TestResponse {
        self.post(
            "/api/v1/verify",
            serde_json::json!({ "email": email, "code": code }),
        )
        .await
    }

    pub async fn resend(&self, email: &str) -> TestResponse {
        self.post("/api/v1/resend-code", serde_json::json!({ "email": email }))
            .await
    }

    /// Codes mailed to `email`, oldest first
    pub fn codes_sent_to(&self, email: &str) -> Vec<String> {
        self.mail
            .sent_to(email)
            .iter()
            .filter(|m| m.subject == VERIFICATION_SUBJECT)
            .filter_map(|m| extract_code(&m.html).map(str::to_string))
            .collect()
    }

    pub fn welcomes_sent_to(&self, email: &str) -> usize {
        self.mail
            .sent_to(email)
            .iter()
            .filter(|m| m.subject == WELCOME_SUBJECT)
            .count()
    }

    /// Waits until `count` codes have been mailed to `email`, returns the newest
    pub async fn wait_for_code(&self, email: &str, count: usize) -> String {
        wait_for(|| self.codes_sent_to(email).len() >= count).await;
        self.codes_sent_to(email)
            .pop()
            .expect("at least one code was sent")
    }

    /// Registers and verifies an account, returns its token
    pub async fn signup(&self, email: &str) -> String {
        let before = self.codes_sent_to(email).len();
        let response = self.register(email, PASSWORD).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());

        let code = self.wait_for_code(email, before + 1).await;
        let response = self.verify(email, &code).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());

        response.json()["token"]
            .as_str()
            .expect("token in verify response")
            .to_string()
    }

    /// Creates a task through the API, returns its JSON
    pub async fn create_task(&self, token: &str, title: &str) -> Value {
        let response = self
            .authed(
                Method::POST,
                "/api/v1/tasks",
                Some(serde_json::json!({ "title": title })),
                token,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.background.cancel();
    }
}

/// Reads the code out of a rendered verification email
pub fn extract_code(html: &str) -> Option<&str> {
    let start = html.find(r#"<div class="code">"#)? + r#"<div class="code">"#.len();
    html.get(start..start + CODE_LENGTH)
}

/// Polls `condition` until it holds or two seconds pass
pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
