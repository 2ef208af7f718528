/// Expired verification code sweeper
///
/// Expired codes are already rejected by verification; this task only
/// clears them from unverified rows so stale secrets do not linger in the
/// database.

use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;
use taskflow_shared::models::user::User;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default interval between sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Runs one sweep and returns the number of cleared codes
pub async fn sweep_expired_codes(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let cleared = User::clear_expired_codes(pool, Utc::now()).await?;

    if cleared > 0 {
        tracing::info!(cleared, "Cleared expired verification codes");
    }

    Ok(cleared)
}

/// Spawns the periodic sweeper
///
/// The first sweep runs immediately; the task stops when `shutdown_token` is
/// cancelled.
pub fn spawn_code_sweeper(
    pool: SqlitePool,
    interval: Duration,
    shutdown_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = sweep_expired_codes(&pool).await {
                        tracing::error!(error = %e, "Failed to clear expired verification codes");
                    }
                }
            }
        }

        tracing::debug!("Code sweeper stopped");
    })
}
