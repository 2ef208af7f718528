/// Password hashing module using Argon2id
///
/// Passwords are stored as PHC strings produced by Argon2id. The hash cost is
/// tunable through [`HashCost`]; the parameters used for a given hash are
/// embedded in the PHC string, so changing the cost never invalidates
/// existing accounts.
///
/// # Default Parameters
///
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use taskflow_shared::auth::password::{hash_password_with_cost, check_password, HashCost};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cost = HashCost::new(8 * 1024, 1, 1);
/// let hash = hash_password_with_cost("super_secret_password_123", &cost)?;
///
/// assert!(check_password("super_secret_password_123", &hash));
/// assert!(!check_password("wrong_password", &hash));
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl HashCost {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }
}

impl Default for HashCost {
    fn default() -> Self {
        Self::new(65536, 3, 4)
    }
}

/// Hashes a password using Argon2id with the default cost
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with_cost(password, &HashCost::default())
}

/// Hashes a password using Argon2id with an explicit cost
///
/// Returns a PHC string, for example:
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the parameters are out of range or
/// the salt cannot be generated.
pub fn hash_password_with_cost(password: &str, cost: &HashCost) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(cost.memory_kib)
        .t_cost(cost.iterations)
        .p_cost(cost.parallelism)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a hash
///
/// Comparison is constant-time. Returns `Ok(false)` on a mismatch and an
/// error only when the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters come from the PHC string
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Checks a password against a stored hash, treating any failure as a mismatch
///
/// A malformed stored hash is logged and reported as `false` so callers can
/// answer with the same "invalid credentials" response in every case.
pub fn check_password(password: &str, hash: &str) -> bool {
    match verify_password(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash could not be checked");
            false
        }
    }
}
