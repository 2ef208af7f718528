//! # TaskFlow API Server
//!
//! Serves the TaskFlow JSON API and pages, and runs the background mail
//! dispatcher and expired-code sweeper in the same process.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskflow-api
//! ```
//!
//! Configuration comes from the environment (and an optional `.env`); see
//! [`taskflow_api::config`].

use anyhow::Context;
use std::sync::Arc;
use taskflow_api::{
    app::{build_router, serve, shutdown_signal, AppState},
    config::Config,
};
use taskflow_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool},
};
use taskflow_worker::{
    dispatcher::DispatcherConfig,
    queue::mail_channel,
    sweeper::{spawn_code_sweeper, DEFAULT_SWEEP_INTERVAL},
    transports::{EmailTransport, LogTransport, ResendTransport},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        debug = config.debug,
        "TaskFlow API server starting"
    );

    if config.jwt.generated {
        tracing::warn!("JWT_SECRET is not set, using a random secret; sessions end when the process restarts");
    }

    let pool = create_pool(config.database.clone())
        .await
        .with_context(|| format!("Failed to open database at {:?}", config.database.path))?;

    run_migrations(&pool).await.context("Failed to run migrations")?;

    // The server stops on `shutdown`. Background work stops on `background`,
    // only after the server has drained, so mail from requests finished during
    // the grace period is still delivered.
    let shutdown = CancellationToken::new();
    let background = CancellationToken::new();

    let transport: Arc<dyn EmailTransport> = match &config.email.resend_api_key {
        Some(api_key) => Arc::new(
            ResendTransport::new(api_key.clone(), config.email.from.clone())
                .context("Failed to build Resend client")?,
        ),
        None => {
            tracing::warn!("RESEND_API_KEY is not set, emails will be written to the log");
            Arc::new(LogTransport::new(config.email.from.clone()))
        }
    };

    let dispatcher_config = DispatcherConfig {
        base_url: config.server.base_url.clone(),
        queue_capacity: config.email.queue_capacity,
        ..Default::default()
    };
    let (mail, dispatcher) = mail_channel(transport, dispatcher_config, background.clone());
    let dispatcher_handle = tokio::spawn(dispatcher.run());
    let sweeper_handle = spawn_code_sweeper(pool.clone(), DEFAULT_SWEEP_INTERVAL, background.clone());

    let bind_address = config.bind_address();
    let server = config.server.clone();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!(address = %bind_address, "Server listening");

    let router = build_router(AppState::new(pool.clone(), config, mail));

    tokio::spawn(shutdown_signal(shutdown.clone()));
    serve(listener, router, shutdown, server).await;

    background.cancel();

    if let Err(e) = dispatcher_handle.await {
        tracing::error!(error = %e, "Mail dispatcher task failed");
    }
    if let Err(e) = sweeper_handle.await {
        tracing::error!(error = %e, "Code sweeper task failed");
    }

    close_pool(pool).await;
    tracing::info!("Server exited");

    Ok(())
}

/// `RUST_LOG` wins; otherwise every TaskFlow crate logs at `LOG_LEVEL`
fn init_tracing(config: &Config) {
    let level = &config.log_level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "taskflow_api={level},taskflow_shared={level},taskflow_worker={level},tower_http={level}"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.debug {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    }
}
