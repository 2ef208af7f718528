/// Session token generation and validation
///
/// Tokens are HS256-signed JWTs carrying the user ID (as `sub`) and email.
/// They expire 24 hours after issuance and are never revoked server-side.
///
/// # Token Structure
///
/// ```json
/// {
///   "sub": "42",
///   "email": "user@example.com",
///   "iss": "taskflow",
///   "iat": 1234567890,
///   "exp": 1234654290,
///   "nbf": 1234567890
/// }
/// ```
///
/// Validation reports every failure (bad signature, expiry, wrong issuer,
/// garbage input) as the single [`JwtError::InvalidToken`] kind.
///
/// # Example
///
/// ```
/// use taskflow_shared::auth::jwt::{issue_token, validate_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "your-secret-key-min-32-chars-long!!!";
/// let token = issue_token(7, "ada@example.com", secret)?;
///
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.user_id()?, 7);
/// assert_eq!(claims.email, "ada@example.com");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer claim written into and required from every token
pub const ISSUER: &str = "taskflow";

/// Lifetime of an issued token
pub const TOKEN_TTL_HOURS: i64 = 24;

/// JWT error types
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token failed signature, expiry, or claim validation
    #[error("Invalid or expired token")]
    InvalidToken,
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID, decimal)
    pub sub: String,

    /// Email the user authenticated with
    pub email: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims valid for [`TOKEN_TTL_HOURS`]
    pub fn new(user_id: i64, email: impl Into<String>) -> Self {
        Self::with_expiration(user_id, email, Duration::hours(TOKEN_TTL_HOURS))
    }

    /// Creates claims with a custom lifetime
    pub fn with_expiration(user_id: i64, email: impl Into<String>, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id.to_string(),
            email: email.into(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Numeric user ID carried in `sub`
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub.parse().map_err(|_| JwtError::InvalidToken)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims into a token
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a fresh 24-hour token for a user
pub fn issue_token(user_id: i64, email: &str, secret: &str) -> Result<String, JwtError> {
    create_token(&Claims::new(user_id, email), secret)
}

/// Validates a token and returns its claims
///
/// Checks the signature, issuer, expiration, and not-before time. The
/// underlying reason is logged at debug level only.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(reason = ?e.kind(), "Token rejected");
        JwtError::InvalidToken
    })?;

    // A token whose subject is not a user ID is as good as forged
    token_data.claims.user_id()?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(42, "ada@example.com");

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_issue_and_validate_token() {
        let token = issue_token(7, "ada@example.com", SECRET).unwrap();

        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn test_invalid_signature() {
        let token = issue_token(7, "ada@example.com", SECRET).unwrap();

        let result = validate_token(&token, "wrong-secret-key-at-least-32-characters");
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_uses_same_error_kind() {
        let claims = Claims::with_expiration(7, "ada@example.com", Duration::hours(-2));
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        let result = validate_token(&token, SECRET);
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let mut claims = Claims::new(7, "ada@example.com");
        claims.iss = "someone-else".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let mut claims = Claims::new(7, "ada@example.com");
        claims.sub = "not-a-number".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(validate_token("not.a.jwt", SECRET), Err(JwtError::InvalidToken)));
        assert!(matches!(validate_token("", SECRET), Err(JwtError::InvalidToken)));
    }
}
