/// Authentication utilities
///
/// This module provides the credential primitives for TaskFlow:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Signed session token issuance and validation
/// - [`code`]: Six-digit email verification codes
/// - [`middleware`]: Token extraction and the request gate
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::auth::password::{hash_password, check_password};
/// use taskflow_shared::auth::jwt::{issue_token, validate_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(check_password("user_password", &hash));
///
/// let token = issue_token(42, "user@example.com", "secret-key")?;
/// let claims = validate_token(&token, "secret-key")?;
/// assert_eq!(claims.user_id()?, 42);
/// # Ok(())
/// # }
/// ```

pub mod code;
pub mod jwt;
pub mod middleware;
pub mod password;
