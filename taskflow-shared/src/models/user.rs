/// User model and database operations
///
/// A user row carries both the credential and the email verification state.
/// Every transition of that state is a single statement or a single
/// transaction, so concurrent requests for the same email cannot interleave
/// a read and a write.
///
/// # Verification States
///
/// ```text
/// absent ──register──> unverified(code, expiry) ──verify──> verified
///                         │  ▲
///                         └──┘ resend / re-register
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id            INTEGER PRIMARY KEY AUTOINCREMENT,
///     email         TEXT    NOT NULL UNIQUE,
///     password_hash TEXT    NOT NULL,
///     first_name    TEXT,
///     last_name     TEXT,
///     is_verified   BOOLEAN NOT NULL DEFAULT 0,
///     verify_code   TEXT,
///     code_expires  TEXT,
///     created_at    TEXT    NOT NULL,
///     updated_at    TEXT    NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use chrono::{Duration, Utc};
/// use taskflow_shared::models::user::{CreateUser, SupersedePolicy, User};
/// # use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let pending = User::create_pending(
///     &pool,
///     CreateUser {
///         email: "ada@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         first_name: Some("Ada".to_string()),
///         last_name: None,
///         verify_code: "123456".to_string(),
///         code_expires: Utc::now() + Duration::minutes(15),
///     },
///     SupersedePolicy::UnverifiedOnly,
/// )
/// .await?;
///
/// let verified = User::verify_email(&pool, &pending.email, "123456", Utc::now()).await?;
/// assert!(verified.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// User store errors
#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    /// A verified account already owns this email
    #[error("Email already registered")]
    AlreadyExists,

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Which existing row a new registration may replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupersedePolicy {
    /// Replace a pending signup, refuse a verified account
    UnverifiedOnly,

    /// Replace whatever is there (the designated test address)
    Any,
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: i64,

    /// Email address, unique, compared as stored
    pub email: String,

    /// Argon2id hash of the password
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    /// Whether the email address has been confirmed
    pub is_verified: bool,

    /// Pending verification code, cleared on verification
    #[serde(skip_serializing)]
    pub verify_code: Option<String>,

    /// When the pending code stops being accepted
    #[serde(skip_serializing)]
    pub code_expires: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for a new pending registration
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub verify_code: String,
    pub code_expires: DateTime<Utc>,
}

impl User {
    /// "First Last", falling back to the email when no name was given
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, is_verified,
                   verify_code, code_expires, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, is_verified,
                   verify_code, code_expires, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Creates a new unverified user, superseding an existing row if allowed
    ///
    /// Runs in one transaction: the replaceable row (per `policy`) is deleted
    /// and the new row inserted. If a row survives the delete, the insert hits
    /// the unique email constraint, the transaction rolls back untouched, and
    /// [`UserStoreError::AlreadyExists`] is returned.
    pub async fn create_pending(
        pool: &SqlitePool,
        data: CreateUser,
        policy: SupersedePolicy,
    ) -> Result<Self, UserStoreError> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let superseded = sqlx::query(
            r#"
            DELETE FROM users
            WHERE email = ? AND (is_verified = 0 OR ?)
            "#,
        )
        .bind(&data.email)
        .bind(policy == SupersedePolicy::Any)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, is_verified,
                               verify_code, code_expires, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?)
            RETURNING id, email, password_hash, first_name, last_name, is_verified,
                      verify_code, code_expires, created_at, updated_at
            "#,
        )
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.verify_code)
        .bind(data.code_expires)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let user = match inserted {
            Ok(user) => user,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tx.rollback().await?;
                return Err(UserStoreError::AlreadyExists);
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        tracing::debug!(user_id = user.id, superseded, "Created pending user");
        Ok(user)
    }

    /// Marks the email verified if `code` matches and has not expired
    ///
    /// A single conditional update: returns `None` for an unknown email, a
    /// wrong or expired code, or an account that is already verified. Of two
    /// concurrent calls with the same code exactly one gets `Some`.
    pub async fn verify_email(
        pool: &SqlitePool,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_verified = 1, verify_code = NULL, code_expires = NULL, updated_at = ?
            WHERE email = ?
              AND is_verified = 0
              AND verify_code = ?
              AND code_expires > ?
            RETURNING id, email, password_hash, first_name, last_name, is_verified,
                      verify_code, code_expires, created_at, updated_at
            "#,
        )
        .bind(now)
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Replaces the pending code of an unverified user
    ///
    /// Returns `None` when the email is unknown or already verified. The last
    /// writer wins, so the most recently issued code is the one that verifies.
    pub async fn refresh_verification_code(
        pool: &SqlitePool,
        email: &str,
        code: &str,
        expires: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET verify_code = ?, code_expires = ?, is_verified = 0, updated_at = ?
            WHERE email = ? AND is_verified = 0
            RETURNING id, email, password_hash, first_name, last_name, is_verified,
                      verify_code, code_expires, created_at, updated_at
            "#,
        )
        .bind(code)
        .bind(expires)
        .bind(Utc::now())
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Deletes a user and, through the foreign key, their tasks
    ///
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears codes that expired before `now` on unverified accounts
    ///
    /// Returns the number of accounts touched.
    pub async fn clear_expired_codes(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET verify_code = NULL, code_expires = NULL, updated_at = ?
            WHERE is_verified = 0
              AND code_expires IS NOT NULL
              AND code_expires <= ?
            "#,
        )
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
