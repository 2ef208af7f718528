/// Application state, router builder and server lifecycle
///
/// This module defines the shared application state, builds the Axum router
/// with all routes and middleware, and runs the server until a shutdown
/// signal arrives.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskflow_api::{app::AppState, config::Config};
/// use taskflow_shared::db::pool::create_pool;
/// use taskflow_worker::{dispatcher::DispatcherConfig, queue::mail_channel, transports::LogTransport};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.database.clone()).await?;
/// let transport = Arc::new(LogTransport::new(config.email.from.clone()));
/// let (mail, dispatcher) = mail_channel(transport, DispatcherConfig::default(), CancellationToken::new());
/// tokio::spawn(dispatcher.run());
///
/// let state = AppState::new(pool, config, mail);
/// let app = taskflow_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::{Config, ServerConfig},
    middleware::{
        rate_limit::{rate_limit_layer, RateLimiter},
        security::SecurityHeadersLayer,
    },
    routes,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post, put},
    Router,
};
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    service::TowerToHyperService,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use taskflow_shared::auth::middleware::jwt_auth_middleware;
use taskflow_worker::queue::MailQueue;
use tokio::net::TcpListener;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outbound mail; handlers enqueue and never wait for delivery
    pub mail: MailQueue,

    /// Hash checked on logins for unknown emails, computed on first use
    pub dummy_hash: Arc<OnceCell<String>>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: SqlitePool, config: Config, mail: MailQueue) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mail,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Whether `email` is the configured test address
    pub fn is_test_email(&self, email: &str) -> bool {
        self.config.email.test_email.as_deref() == Some(email)
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /                      # Landing page
/// ├── GET /login                 # Login / register / verify page
/// ├── GET /tasks                 # Task board (authenticated, redirects to /login)
/// ├── GET /health                # Health check
/// ├── /css, /js, /favicon.ico    # Static assets from WEB_DIR
/// └── /api/v1/
///     ├── POST /register
///     ├── POST /login
///     ├── POST /verify
///     ├── POST /resend-code
///     ├── GET  /logout
///     └── (authenticated, 401 JSON)
///         ├── GET    /tasks
///         ├── POST   /tasks
///         ├── PATCH  /tasks/:id
///         ├── PUT    /tasks/:id/toggle
///         └── DELETE /tasks/:id
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Logging (tower-http TraceLayer, one span per request with a request ID)
/// 2. CORS (permissive in development, single origin in production)
/// 3. Security headers (production only)
/// 4. Global rate limit
/// 5. Request body timeout (`READ_TIMEOUT`)
/// 6. Per-request timeout (`WRITE_TIMEOUT`)
/// 7. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/verify", post(routes::auth::verify))
        .route("/resend-code", post(routes::auth::resend_code))
        .route("/logout", get(routes::auth::logout));

    let task_routes = Router::new()
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            patch(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/toggle", put(routes::tasks::toggle_task))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let page_routes = Router::new()
        .route("/tasks", get(routes::pages::tasks))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer))
        .route("/", get(routes::pages::index))
        .route("/login", get(routes::pages::login))
        .route("/health", get(routes::health::health_check));

    let web_dir = &config.server.web_dir;
    let static_routes = Router::new()
        .nest_service("/css", ServeDir::new(web_dir.join("css")))
        .nest_service("/js", ServeDir::new(web_dir.join("js")))
        .route_service("/favicon.ico", ServeFile::new(web_dir.join("favicon.ico")));

    let limiter = Arc::new(RateLimiter::new(
        config.security.rate_limit_per_second,
        config.security.rate_limit_burst,
    ));

    Router::new()
        .merge(page_routes)
        .nest("/api/v1", auth_routes.merge(task_routes))
        .with_state(state)
        .merge(static_routes)
        .layer(TimeoutLayer::new(config.server.write_timeout))
        .layer(RequestBodyTimeoutLayer::new(config.server.read_timeout))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_layer))
        .layer(SecurityHeadersLayer::new(config.is_production()))
        .layer(cors_layer(&config))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %Uuid::new_v4(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// JWT authentication middleware layer
///
/// Delegates to the shared gate, which answers 401 JSON for API paths and a
/// redirect to `/login` for pages.
async fn jwt_auth_layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    jwt_auth_middleware(state.jwt_secret().to_string(), req, next).await
}

/// Configure CORS based on environment
fn cors_layer(config: &Config) -> CorsLayer {
    if !config.is_production() {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origin = match HeaderValue::from_str(&config.server.allowed_origin) {
        Ok(origin) => origin,
        Err(_) => {
            tracing::warn!(
                origin = %config.server.allowed_origin,
                "ALLOWED_ORIGIN is not a valid header value, cross-origin requests will be refused"
            );
            return CorsLayer::new();
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Serves `router` until `shutdown` is cancelled
///
/// Each connection is driven by hyper's HTTP/1 server so the idle bound can be
/// enforced: `IDLE_TIMEOUT` limits how long a connection may take to deliver
/// a request head, which covers both slow clients and idle keep-alive
/// connections.
///
/// New connections stop as soon as the token fires. Idle connections close,
/// in-flight requests get `SHUTDOWN_GRACE` to finish, after which the
/// remaining connections are dropped.
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken, server: ServerConfig) {
    let mut connections = JoinSet::new();

    loop {
        let (stream, remote) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Usually out of file descriptors; back off instead of spinning
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
        };

        while connections.try_join_next().is_some() {}

        let service = TowerToHyperService::new(router.clone());
        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(server.idle_timeout)
            .keep_alive(true);
        let signal = shutdown.clone();

        connections.spawn(async move {
            let connection = builder.serve_connection(TokioIo::new(stream), service);
            tokio::pin!(connection);

            let result = tokio::select! {
                result = connection.as_mut() => result,
                _ = signal.cancelled() => {
                    connection.as_mut().graceful_shutdown();
                    connection.await
                }
            };

            if let Err(e) = result {
                tracing::debug!(remote = %remote, error = %e, "Connection closed with error");
            }
        });
    }

    drop(listener);

    if connections.is_empty() {
        return;
    }

    tracing::info!(
        grace_seconds = server.shutdown_grace.as_secs_f64(),
        connections = connections.len(),
        "Draining in-flight requests"
    );

    let drained = tokio::time::timeout(server.shutdown_grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            connections = connections.len(),
            "Grace period elapsed, closing remaining connections"
        );
        connections.abort_all();
    }
}

/// Cancels `shutdown` on Ctrl-C or SIGTERM
pub async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = shutdown.cancelled() => return,
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    shutdown.cancel();
}
