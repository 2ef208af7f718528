/// Configuration management for the API server
///
/// This module loads configuration from environment variables (after
/// reading an optional `.env` file) into a type-safe configuration struct.
/// Every variable is optional.
///
/// # Environment Variables
///
/// - `HOST`: Host to bind to (default: 0.0.0.0)
/// - `PORT`: Port to bind to, `8080` or `:8080` (default: 8080)
/// - `READ_TIMEOUT` / `WRITE_TIMEOUT` / `IDLE_TIMEOUT`: Transport timeouts (default: 10s / 10s / 30s)
/// - `SHUTDOWN_GRACE`: Grace period for in-flight requests (default: 5s)
/// - `DB_PATH`: SQLite file, or `:memory:` (default: taskflow.db)
/// - `DB_MAX_CONNECTIONS`: Pool size (default: 5)
/// - `RESEND_API_KEY`: Resend credential; mail is only logged when empty
/// - `EMAIL_FROM`: Sender address (default: noreply@resend.dev)
/// - `TEST_EMAIL`: Address that may always re-register
/// - `APP_BASE_URL`: Base URL for links in emails (default: http://localhost:8080)
/// - `WEB_DIR`: Static assets directory (default: web)
/// - `JWT_SECRET`: Token signing secret, at least 32 characters (default: random per process)
/// - `DEBUG`: Development mode (default: false)
/// - `LOG_LEVEL`: Default log level when `RUST_LOG` is unset (default: info)
/// - `ALLOWED_ORIGIN`: CORS origin allowed in production (default: http://localhost:8080)
/// - `RATE_LIMIT_PER_SECOND` / `RATE_LIMIT_BURST`: Global token bucket (default: 10 / 20)
/// - `MAIL_QUEUE_CAPACITY`: Outbound mail queue size (default: 256)
/// - `ARGON2_MEMORY_KIB` / `ARGON2_ITERATIONS` / `ARGON2_PARALLELISM`: Password hash cost
///
/// Durations accept `500ms`, `10s`, `5m`, `1h`, or a bare number of seconds.
///
/// # Example
///
/// ```no_run
/// use taskflow_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use rand::RngCore;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use taskflow_shared::auth::password::HashCost;
use taskflow_shared::db::pool::DatabaseConfig;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Outbound email configuration
    pub email: EmailConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Rate limiting and password hashing
    pub security: SecurityConfig,

    /// Development mode
    pub debug: bool,

    /// Default log level
    pub log_level: String,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Budget for receiving a request body, 408 once exceeded
    pub read_timeout: Duration,

    /// Budget for producing a response, 408 once exceeded
    pub write_timeout: Duration,

    /// How long a connection may wait for the next request head, covering
    /// idle keep-alive connections
    pub idle_timeout: Duration,

    /// Grace period for in-flight requests on shutdown
    pub shutdown_grace: Duration,

    /// CORS origin allowed in production
    pub allowed_origin: String,

    /// Absolute base URL used in emails
    pub base_url: String,

    /// Static assets directory
    pub web_dir: PathBuf,
}

/// Outbound email configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Resend API key; `None` selects the log transport
    pub resend_api_key: Option<String>,

    /// Sender address
    pub from: String,

    /// Address that may always re-register
    pub test_email: Option<String>,

    /// Outbound queue size
    pub queue_capacity: usize,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// True when no secret was configured and one was generated
    pub generated: bool,
}

/// Rate limiting and hashing configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Sustained requests per second, process-wide
    pub rate_limit_per_second: f64,

    /// Burst size
    pub rate_limit_burst: u32,

    /// Argon2id cost for new password hashes
    pub hash_cost: HashCost,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(5),
            allowed_origin: "http://localhost:8080".to_string(),
            base_url: "http://localhost:8080".to_string(),
            web_dir: PathBuf::from("web"),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from: "noreply@resend.dev".to_string(),
            test_email: None,
            queue_capacity: 256,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_second: 10.0,
            rate_limit_burst: 20,
            hash_cost: HashCost::default(),
        }
    }
}

impl JwtConfig {
    /// A fresh random secret, valid for this process only
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);

        Self {
            secret: hex::encode(bytes),
            generated: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            email: EmailConfig::default(),
            jwt: JwtConfig::generate(),
            security: SecurityConfig::default(),
            debug: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if any value is malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let server = ServerConfig {
            host: get("HOST").unwrap_or(defaults.server.host),
            port: match get("PORT") {
                Some(value) => parse_port(&value).context("Invalid PORT")?,
                None => defaults.server.port,
            },
            read_timeout: duration_var(&get, "READ_TIMEOUT", defaults.server.read_timeout)?,
            write_timeout: duration_var(&get, "WRITE_TIMEOUT", defaults.server.write_timeout)?,
            idle_timeout: duration_var(&get, "IDLE_TIMEOUT", defaults.server.idle_timeout)?,
            shutdown_grace: duration_var(&get, "SHUTDOWN_GRACE", defaults.server.shutdown_grace)?,
            allowed_origin: get("ALLOWED_ORIGIN").unwrap_or(defaults.server.allowed_origin),
            base_url: get("APP_BASE_URL").unwrap_or(defaults.server.base_url),
            web_dir: get("WEB_DIR").map(PathBuf::from).unwrap_or(defaults.server.web_dir),
        };

        let database = DatabaseConfig {
            path: get("DB_PATH").unwrap_or(defaults.database.path),
            max_connections: parsed_var(&get, "DB_MAX_CONNECTIONS", defaults.database.max_connections)?,
            ..defaults.database
        };

        let email = EmailConfig {
            resend_api_key: get("RESEND_API_KEY"),
            from: get("EMAIL_FROM").unwrap_or(defaults.email.from),
            test_email: get("TEST_EMAIL"),
            queue_capacity: parsed_var(&get, "MAIL_QUEUE_CAPACITY", defaults.email.queue_capacity)?,
        };

        let jwt = match get("JWT_SECRET") {
            Some(secret) => {
                if secret.len() < 32 {
                    anyhow::bail!("JWT_SECRET must be at least 32 characters long");
                }
                JwtConfig {
                    secret,
                    generated: false,
                }
            }
            None => defaults.jwt,
        };

        let default_cost = defaults.security.hash_cost;
        let security = SecurityConfig {
            rate_limit_per_second: parsed_var(
                &get,
                "RATE_LIMIT_PER_SECOND",
                defaults.security.rate_limit_per_second,
            )?,
            rate_limit_burst: parsed_var(&get, "RATE_LIMIT_BURST", defaults.security.rate_limit_burst)?,
            hash_cost: HashCost::new(
                parsed_var(&get, "ARGON2_MEMORY_KIB", default_cost.memory_kib)?,
                parsed_var(&get, "ARGON2_ITERATIONS", default_cost.iterations)?,
                parsed_var(&get, "ARGON2_PARALLELISM", default_cost.parallelism)?,
            ),
        };

        let timeouts = [server.read_timeout, server.write_timeout, server.idle_timeout];
        if timeouts.iter().any(Duration::is_zero) {
            anyhow::bail!("READ_TIMEOUT, WRITE_TIMEOUT and IDLE_TIMEOUT must be positive");
        }

        let rate = security.rate_limit_per_second;
        if !(rate > 0.0 && rate.is_finite()) || security.rate_limit_burst == 0 {
            anyhow::bail!("RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be positive");
        }

        let debug = match get("DEBUG") {
            Some(value) => parse_bool(&value).context("Invalid DEBUG")?,
            None => defaults.debug,
        };

        Ok(Self {
            server,
            database,
            email,
            jwt,
            security,
            debug,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level).to_lowercase(),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Production mode is anything that is not debug
    pub fn is_production(&self) -> bool {
        !self.debug
    }
}

fn parsed_var<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", key, value)),
        None => Ok(default),
    }
}

fn duration_var<G>(get: &G, key: &str, default: Duration) -> anyhow::Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => parse_duration(&value).with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}

/// Accepts `8080` and `:8080`
pub fn parse_port(value: &str) -> anyhow::Result<u16> {
    let digits = value.trim().trim_start_matches(':');
    let port: u16 = digits
        .parse()
        .with_context(|| format!("{:?} is not a port number", value))?;

    if port == 0 {
        anyhow::bail!("port must not be 0");
    }
    Ok(port)
}

/// Parses `500ms`, `10s`, `5m`, `1h`, or bare seconds
pub fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let amount: u64 = number
        .parse()
        .with_context(|| format!("{:?} is not a duration", value))?;

    let seconds = match unit.trim() {
        "ms" => return Ok(Duration::from_millis(amount)),
        "" | "s" => Some(amount),
        "m" => amount.checked_mul(60),
        "h" => amount.checked_mul(3600),
        other => anyhow::bail!("unknown duration unit {:?}", other),
    };

    match seconds {
        Some(seconds) => Ok(Duration::from_secs(seconds)),
        None => anyhow::bail!("{:?} is too large", value),
    }
}

/// Accepts true/false, 1/0, yes/no, on/off
pub fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{:?} is not a boolean", other),
    }
}
