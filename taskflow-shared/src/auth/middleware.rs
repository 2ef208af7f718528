/// Request gate for Axum
///
/// Extracts the session token from the request, validates it, and attaches
/// the authenticated principal ([`AuthContext`]) to the request extensions.
///
/// # Token Sources
///
/// 1. `Authorization` header, either `Bearer <token>` or the bare token
/// 2. The `token` cookie
///
/// # Unauthenticated Requests
///
/// A missing, malformed, or expired token is handled the same way. API paths
/// (`/api/...`) get `401 {"error": "Unauthorized"}`; page paths are
/// redirected to `/login`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use taskflow_shared::auth::middleware::{jwt_auth_middleware, AuthContext};
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let app: Router = Router::new()
///     .route("/api/v1/me", get(handler))
///     .layer(middleware::from_fn(|req: axum::extract::Request, next: middleware::Next| {
///         jwt_auth_middleware("secret".to_string(), req, next)
///     }));
/// ```

use axum::{
    extract::{OriginalUri, Request},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::jwt::{validate_token, Claims, JwtError};

/// Name of the cookie holding the session token
pub const TOKEN_COOKIE_NAME: &str = "token";

/// Where unauthenticated page requests are sent
pub const LOGIN_PATH: &str = "/login";

/// The authenticated principal
///
/// Added to the request extensions by [`jwt_auth_middleware`]. Handlers take
/// it with `Extension<AuthContext>` and pass it explicitly into store calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: i64,

    /// Email the token was issued for
    pub email: String,
}

impl AuthContext {
    /// Builds the principal from validated claims
    pub fn from_claims(claims: &Claims) -> Result<Self, JwtError> {
        Ok(Self {
            user_id: claims.user_id()?,
            email: claims.email.clone(),
        })
    }
}

/// Why a request was not authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No header and no cookie
    MissingCredentials,

    /// Token present but rejected
    InvalidToken,
}

/// Which kind of client a request path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSurface {
    /// JSON API under `/api/`
    Api,

    /// Server-rendered page
    Page,
}

impl RequestSurface {
    pub fn from_path(path: &str) -> Self {
        if path.starts_with("/api/") {
            RequestSurface::Api
        } else {
            RequestSurface::Page
        }
    }
}

#[derive(Debug, Serialize)]
struct UnauthorizedBody {
    error: &'static str,
}

/// Builds the response for an unauthenticated request
pub fn unauthenticated_response(surface: RequestSurface) -> Response {
    match surface {
        RequestSurface::Api => (
            StatusCode::UNAUTHORIZED,
            Json(UnauthorizedBody {
                error: "Unauthorized",
            }),
        )
            .into_response(),
        RequestSurface::Page => {
            (StatusCode::FOUND, [(header::LOCATION, LOGIN_PATH)]).into_response()
        }
    }
}

/// Pulls the session token out of the request headers
///
/// The `Authorization` header wins over the cookie. An empty value in either
/// place counts as absent.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(strip_bearer_scheme)
        .filter(|v| !v.is_empty());

    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE_NAME)
        .map(|c| c.value().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn strip_bearer_scheme(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        None if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    }
}

/// Resolves the principal for a set of request headers
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = extract_token(headers).ok_or(AuthError::MissingCredentials)?;

    let claims = validate_token(&token, secret).map_err(|_| AuthError::InvalidToken)?;

    AuthContext::from_claims(&claims).map_err(|_| AuthError::InvalidToken)
}

/// JWT authentication middleware
///
/// On success the request continues with an [`AuthContext`] extension. On
/// failure the request never reaches the handler.
pub async fn jwt_auth_middleware(secret: String, mut req: Request, next: Next) -> Response {
    // Nested routers see a stripped URI, the original decides the surface
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    match authenticate(req.headers(), &secret) {
        Ok(auth_context) => {
            req.extensions_mut().insert(auth_context);
            next.run(req).await
        }
        Err(reason) => {
            tracing::debug!(?reason, path = %path, "Rejected unauthenticated request");
            unauthenticated_response(RequestSurface::from_path(&path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token;
    use axum::{body::Body, http::HeaderValue, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret-32-characters";

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token_bearer_and_raw() {
        let bearer = headers_with(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(extract_token(&bearer).as_deref(), Some("abc.def.ghi"));

        let raw = headers_with(header::AUTHORIZATION, "abc.def.ghi");
        assert_eq!(extract_token(&raw).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_token_cookie_fallback() {
        let headers = headers_with(header::COOKIE, "theme=dark; token=from.cookie.jwt");
        assert_eq!(extract_token(&headers).as_deref(), Some("from.cookie.jwt"));
    }

    #[test]
    fn test_header_preferred_over_cookie() {
        let mut headers = headers_with(header::COOKIE, "token=cookie-token");
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(extract_token(&headers).as_deref(), Some("header-token"));
    }

    #[test]
    fn test_empty_values_are_absent() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers_with(header::AUTHORIZATION, "Bearer ")), None);
        assert_eq!(extract_token(&headers_with(header::COOKIE, "token=")), None);
    }

    #[test]
    fn test_authenticate() {
        let token = issue_token(5, "ada@example.com", SECRET).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {token}"));

        let auth = authenticate(&headers, SECRET).unwrap();
        assert_eq!(auth.user_id, 5);
        assert_eq!(auth.email, "ada@example.com");

        assert_eq!(authenticate(&headers, "another-secret-of-32-characters!!"), Err(AuthError::InvalidToken));
        assert_eq!(authenticate(&HeaderMap::new(), SECRET), Err(AuthError::MissingCredentials));
    }

    #[test]
    fn test_request_surface() {
        assert_eq!(RequestSurface::from_path("/api/v1/tasks"), RequestSurface::Api);
        assert_eq!(RequestSurface::from_path("/tasks"), RequestSurface::Page);
        assert_eq!(RequestSurface::from_path("/api"), RequestSurface::Page);
    }

    fn gated_app() -> Router {
        async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
            auth.user_id.to_string()
        }

        Router::new()
            .route("/api/v1/me", get(whoami))
            .route("/tasks", get(whoami))
            .layer(middleware::from_fn(|req: Request, next: Next| {
                jwt_auth_middleware(SECRET.to_string(), req, next)
            }))
    }

    #[tokio::test]
    async fn test_api_path_without_token_gets_401_json() {
        let response = gated_app()
            .oneshot(Request::builder().uri("/api/v1/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"Unauthorized"}"#);
    }

    #[tokio::test]
    async fn test_page_path_without_token_redirects() {
        let response = gated_app()
            .oneshot(Request::builder().uri("/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_valid_cookie_reaches_handler() {
        let token = issue_token(11, "ada@example.com", SECRET).unwrap();
        let response = gated_app()
            .oneshot(
                Request::builder()
                    .uri("/tasks")
                    .header(header::COOKIE, format!("token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"11");
    }

    #[tokio::test]
    async fn test_invalid_token_treated_as_missing() {
        let response = gated_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/me")
                    .header(header::AUTHORIZATION, "Bearer garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
