//! Integration tests for the HTTP surface around the API
//!
//! Pages, health, static assets and the middleware stack (security headers,
//! rate limiting, CORS) in development and production mode.

mod common;

use axum::http::{header, HeaderName, Method, StatusCode};
use common::{TestContext, TEST_SECRET};

const ORIGIN: &str = "https://app.example.com";

async fn production(extra: &[(&str, &str)]) -> TestContext {
    let mut env = vec![
        ("DEBUG", "false"),
        ("JWT_SECRET", TEST_SECRET),
        ("ALLOWED_ORIGIN", ORIGIN),
    ];
    env.extend_from_slice(extra);
    TestContext::with_env(&env).await.unwrap()
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_reports_closed_database() {
    let ctx = TestContext::new().await.unwrap();
    ctx.db.close().await;

    let response = ctx.get("/health").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json()["status"], "degraded");
    assert_eq!(response.json()["database"], "disconnected");
}

#[tokio::test]
async fn test_public_pages() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .header(header::CONTENT_TYPE)
        .unwrap()
        .starts_with("text/html"));

    let response = ctx.get("/login").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("/js/login.js"));
}

#[tokio::test]
async fn test_tasks_page_redirects_without_token() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.get("/tasks").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), Some("/login"));

    let response = ctx
        .send(Method::GET, "/tasks", None, &[(header::COOKIE, "token=garbage")])
        .await;
    assert_eq!(response.status, StatusCode::FOUND);
}

#[tokio::test]
async fn test_tasks_page_shows_user_name() {
    let ctx = TestContext::new().await.unwrap();
    let token = ctx.signup("page@x.com").await;

    let cookie = format!("token={}", token);
    let response = ctx
        .send(Method::GET, "/tasks", None, &[(header::COOKIE, cookie.as_str())])
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let html = response.text();
    assert!(html.contains("Ada Lovelace"));
    assert!(html.contains("/js/tasks.js"));
}

#[tokio::test]
async fn test_tasks_page_for_deleted_user() {
    let ctx = TestContext::new().await.unwrap();
    let token = ctx.signup("gone@x.com").await;

    sqlx::query("DELETE FROM users WHERE email = ?")
        .bind("gone@x.com")
        .execute(&ctx.db)
        .await
        .unwrap();

    let cookie = format!("token={}", token);
    let response = ctx
        .send(Method::GET, "/tasks", None, &[(header::COOKIE, cookie.as_str())])
        .await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), Some("/login"));
}

#[tokio::test]
async fn test_static_assets() {
    let web_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../web");
    let ctx = TestContext::with_env(&[("WEB_DIR", web_dir)]).await.unwrap();

    let response = ctx.get("/css/style.css").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header(header::CONTENT_TYPE).unwrap().starts_with("text/css"));

    let response = ctx.get("/js/tasks.js").await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx.get("/favicon.ico").await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx.get("/css/missing.css").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_only_in_production() {
    let dev = TestContext::new().await.unwrap();
    let response = dev.get("/health").await;
    assert!(response.header(header::X_FRAME_OPTIONS).is_none());
    assert!(response.header(header::CONTENT_SECURITY_POLICY).is_none());

    let prod = production(&[]).await;
    let response = prod.get("/health").await;
    assert_eq!(response.header(header::X_FRAME_OPTIONS), Some("DENY"));
    assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), Some("nosniff"));
    assert_eq!(
        response.header(header::STRICT_TRANSPORT_SECURITY),
        Some("max-age=31536000; includeSubDomains")
    );
    assert!(response.header(header::CONTENT_SECURITY_POLICY).is_some());
    assert!(response
        .header(HeaderName::from_static("permissions-policy"))
        .is_some());

    // Error responses carry them too
    let response = prod.get("/api/v1/tasks").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.header(header::X_FRAME_OPTIONS), Some("DENY"));
}

#[tokio::test]
async fn test_rate_limit() {
    let ctx = TestContext::with_env(&[
        ("RATE_LIMIT_PER_SECOND", "0.01"),
        ("RATE_LIMIT_BURST", "2"),
    ])
    .await
    .unwrap();

    assert_eq!(ctx.get("/health").await.status, StatusCode::OK);
    assert_eq!(ctx.get("/").await.status, StatusCode::OK);

    // The bucket is global, so a different route is refused as well
    let response = ctx.get("/login").await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.json()["error"], "Too many requests. Please slow down.");

    let retry_after: u64 = response
        .header(header::RETRY_AFTER)
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
}

#[tokio::test]
async fn test_cors_development_is_permissive() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .send(
            Method::GET,
            "/health",
            None,
            &[(header::ORIGIN, "http://localhost:3000")],
        )
        .await;
    assert_eq!(
        response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("*")
    );
}

#[tokio::test]
async fn test_cors_production_allows_configured_origin() {
    let ctx = production(&[]).await;

    let response = ctx
        .send(
            Method::OPTIONS,
            "/api/v1/tasks",
            None,
            &[
                (header::ORIGIN, ORIGIN),
                (header::ACCESS_CONTROL_REQUEST_METHOD, "POST"),
                (header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), Some(ORIGIN));
    assert_eq!(
        response.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
        Some("true")
    );
    assert_eq!(response.header(header::ACCESS_CONTROL_MAX_AGE), Some("3600"));

    let response = ctx
        .send(
            Method::GET,
            "/health",
            None,
            &[(header::ORIGIN, "https://evil.example.com")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_production_cookie_is_secure() {
    let ctx = production(&[]).await;
    ctx.signup("secure@x.com").await;

    let response = ctx.login("secure@x.com", common::PASSWORD).await;
    assert_eq!(response.status, StatusCode::OK);
    let cookie = response.header(header::SET_COOKIE).unwrap();
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Lax"));
}
