/// Authentication endpoints
///
/// This module drives the account lifecycle:
/// - Registration (creates an unverified account and mails a code)
/// - Email verification (turns the account on and signs the user in)
/// - Code resend
/// - Login / logout
///
/// # Endpoints
///
/// - `POST /api/v1/register` - Register new user
/// - `POST /api/v1/verify` - Confirm the emailed code, get a token
/// - `POST /api/v1/resend-code` - Issue a fresh code
/// - `POST /api/v1/login` - Login and get a token
/// - `GET /api/v1/logout` - Drop the session cookie
///
/// # Account Enumeration
///
/// Login answers "no such account" and "wrong password" with byte-identical
/// bodies after one Argon2 verification each, and resend answers "no such account" exactly like a successful
/// resend. The one deliberate exception is login on an unverified account,
/// which returns 403 with the email so the client can route to verification.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::ValidatedJson,
};
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use taskflow_shared::{
    auth::{
        code::{generate_code, is_valid_code_format, CODE_TTL_MINUTES},
        jwt,
        middleware::TOKEN_COOKIE_NAME,
        password::{self, HashCost},
    },
    models::{CreateUser, SupersedePolicy, User, UserStoreError},
};
use taskflow_worker::queue::OutboundEmail;
use validator::{Validate, ValidationError};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_CODE: &str = "Invalid or expired code";
const DUMMY_PASSWORD: &str = "taskflow-unknown-account";
pub const RESEND_MESSAGE: &str = "If email exists, code will be sent";

/// Register request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        email(message = "Invalid email format"),
        length(max = 50, message = "Email must be at most 50 characters")
    )]
    pub email: String,

    #[validate(length(min = 6, max = 30, message = "Password must be 6 to 30 characters"))]
    pub password: String,

    #[validate(length(max = 25, message = "First name must be at most 25 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 25, message = "Last name must be at most 25 characters"))]
    pub last_name: Option<String>,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,

    /// Echo of the registered address
    pub email: String,
}

/// Login request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Verify request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct VerifyRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_code"))]
    pub code: String,
}

/// Resend request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResendCodeRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Token plus the minimal profile, returned by login and verify
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

/// Public view of a user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Plain message body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn validate_code(code: &str) -> Result<(), ValidationError> {
    if is_valid_code_format(code) {
        Ok(())
    } else {
        Err(ValidationError::new("code").with_message("Code must be exactly 6 digits".into()))
    }
}

/// Blank names are stored as absent
fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Argon2 is CPU-bound, keep it off the async workers
async fn hash_off_thread(plaintext: String, cost: HashCost) -> ApiResult<String> {
    let hash = tokio::task::spawn_blocking(move || password::hash_password_with_cost(&plaintext, &cost)).await??;
    Ok(hash)
}

async fn check_off_thread(plaintext: String, hash: String) -> ApiResult<bool> {
    let matches = tokio::task::spawn_blocking(move || password::check_password(&plaintext, &hash)).await?;
    Ok(matches)
}

/// Verifies `plaintext` against a throwaway hash at the configured cost
async fn check_dummy_hash(state: &AppState, plaintext: String) -> ApiResult<()> {
    let cost = state.config.security.hash_cost;
    let hash = state
        .dummy_hash
        .get_or_try_init(|| hash_off_thread(DUMMY_PASSWORD.to_string(), cost))
        .await?;

    check_off_thread(plaintext, hash.clone()).await?;
    Ok(())
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn code_expiry() -> chrono::DateTime<Utc> {
    Utc::now() + Duration::minutes(CODE_TTL_MINUTES)
}

/// Register a new user
///
/// Creates an unverified account and queues the verification email. A
/// pending signup for the same email is replaced (its code stops working);
/// a verified account is a conflict. The configured test address replaces
/// whatever is there.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/register
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "secret1",
///   "firstName": "Ada",
///   "lastName": "Lovelace"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "message": "Registration successful. Please check your email for verification code.",
///   "email": "ada@example.com"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already registered and verified
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let policy = if state.is_test_email(&req.email) {
        SupersedePolicy::Any
    } else {
        SupersedePolicy::UnverifiedOnly
    };

    let password_hash = hash_off_thread(req.password, state.config.security.hash_cost).await?;
    let code = generate_code();

    let user = User::create_pending(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            first_name: normalize_name(req.first_name),
            last_name: normalize_name(req.last_name),
            verify_code: code.clone(),
            code_expires: code_expiry(),
        },
        policy,
    )
    .await
    .map_err(|e| {
        if matches!(e, UserStoreError::AlreadyExists) {
            tracing::info!("Registration refused, email already verified");
        }
        ApiError::from(e)
    })?;

    tracing::info!(user_id = user.id, email = %user.email, ?policy, "User registered");

    state.mail.enqueue(OutboundEmail::VerificationCode {
        to: user.email.clone(),
        code,
    });

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful. Please check your email for verification code.".to_string(),
            email: user.email,
        }),
    ))
}

/// Login with email and password
///
/// Sets the `token` cookie in addition to returning the token.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email or wrong password (same body)
/// - `403 Forbidden`: Account not verified yet, body carries `email`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let Some(user) = User::find_by_email(&state.db, &req.email).await? else {
        check_dummy_hash(&state, req.password).await?;
        tracing::info!("Login failed, unknown email");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !user.is_verified {
        tracing::info!(user_id = user.id, "Login refused, email not verified");
        return Err(ApiError::EmailNotVerified { email: user.email });
    }

    if !check_off_thread(req.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = user.id, "Login failed, wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = jwt::issue_token(user.id, &user.email, state.jwt_secret())?;
    tracing::info!(user_id = user.id, "User logged in");

    let jar = jar.add(session_cookie(token.clone(), state.config.is_production()));

    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful".to_string(),
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

/// Confirm the emailed code
///
/// On success the account is verified, a token is issued (and set as the
/// `token` cookie) and a welcome email is queued. A second attempt with the
/// same code fails: the code is cleared by the first.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or unknown email / wrong code /
///   expired code / already verified (all the same message)
pub async fn verify(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<VerifyRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let Some(user) = User::verify_email(&state.db, &req.email, &req.code, Utc::now()).await? else {
        tracing::info!("Verification failed");
        return Err(ApiError::BadRequest(INVALID_CODE.to_string()));
    };

    let token = jwt::issue_token(user.id, &user.email, state.jwt_secret())?;
    tracing::info!(user_id = user.id, email = %user.email, "Email verified");

    state.mail.enqueue(OutboundEmail::Welcome {
        to: user.email.clone(),
        name: user.display_name(),
    });

    let jar = jar.add(session_cookie(token.clone(), state.config.is_production()));

    Ok((
        jar,
        Json(AuthResponse {
            message: "Email verified successfully".to_string(),
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

/// Issue a fresh verification code
///
/// The newest code replaces any earlier one. Unknown emails get the same
/// answer as pending ones.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or the email is already verified
pub async fn resend_code(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResendCodeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Some(user) = User::find_by_email(&state.db, &req.email).await? else {
        tracing::debug!("Resend requested for unknown email");
        return Ok(Json(MessageResponse::new(RESEND_MESSAGE)));
    };

    if user.is_verified {
        return Err(ApiError::BadRequest("Email already verified".to_string()));
    }

    let code = generate_code();
    match User::refresh_verification_code(&state.db, &user.email, &code, code_expiry()).await? {
        Some(updated) => {
            tracing::info!(user_id = updated.id, "Verification code reissued");
            state.mail.enqueue(OutboundEmail::VerificationCode {
                to: updated.email,
                code,
            });
        }
        None => {
            // Verified or removed since the lookup
            tracing::debug!(user_id = user.id, "Resend raced with another transition");
        }
    }

    Ok(Json(MessageResponse::new(RESEND_MESSAGE)))
}

/// Drop the session cookie
///
/// Tokens are not revoked server side; this only clears the cookie.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(Cookie::build(TOKEN_COOKIE_NAME).path("/"));

    (jar, Json(MessageResponse::new("Logged out successfully")))
}
