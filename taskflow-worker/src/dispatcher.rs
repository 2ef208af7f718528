/// Mail dispatcher
///
/// Drains the [`MailQueue`](crate::queue::MailQueue) in the background,
/// renders each message, and hands it to the configured transport. Every
/// failure (render, transport, timeout) ends at a log line: by the time a
/// message is queued the request that produced it has already answered.
///
/// # Architecture
///
/// ```text
/// MailDispatcher::run
///   ├─> receive OutboundEmail
///   ├─> spawn delivery (bounded by max_in_flight)
///   │     ├─> render template
///   │     └─> transport.send (bounded by send_timeout)
///   └─> on shutdown: stop receiving, deliver what is queued, wait for in-flight sends
/// ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::queue::OutboundEmail;
use crate::transports::{EmailTransport, TransportError};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Absolute base URL used for links inside emails
    pub base_url: String,

    /// Maximum queued messages
    pub queue_capacity: usize,

    /// Budget for one transport call
    pub send_timeout: Duration,

    /// Maximum concurrent transport calls
    pub max_in_flight: usize,

    /// How long shutdown waits for queued and in-flight mail
    pub drain_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            base_url: "http://localhost:8080".to_string(),
            queue_capacity: 256,
            send_timeout: Duration::from_secs(15),
            max_in_flight: 4,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Background mail dispatcher
pub struct MailDispatcher {
    receiver: mpsc::Receiver<OutboundEmail>,

    transport: Arc<dyn EmailTransport>,

    config: DispatcherConfig,

    /// Shutdown token
    shutdown_token: CancellationToken,
}

impl MailDispatcher {
    pub(crate) fn new(
        receiver: mpsc::Receiver<OutboundEmail>,
        transport: Arc<dyn EmailTransport>,
        config: DispatcherConfig,
        shutdown_token: CancellationToken,
    ) -> Self {
        MailDispatcher {
            receiver,
            transport,
            config,
            shutdown_token,
        }
    }

    /// Gets shutdown token
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the dispatch loop until shutdown or until every queue handle is dropped
    pub async fn run(mut self) {
        tracing::info!(
            transport = %self.transport.name(),
            max_in_flight = self.config.max_in_flight,
            "Mail dispatcher starting"
        );

        let permits = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let mut in_flight = JoinSet::new();

        loop {
            let email = tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                email = self.receiver.recv() => email,
            };

            let Some(email) = email else {
                tracing::debug!("All mail queue handles dropped");
                break;
            };

            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };

            let transport = self.transport.clone();
            let config = self.config.clone();
            in_flight.spawn(async move {
                deliver(transport.as_ref(), &config, email).await;
                drop(permit);
            });

            // Reap finished deliveries so the set does not grow
            while in_flight.try_join_next().is_some() {}
        }

        self.drain(in_flight).await;
        tracing::info!("Mail dispatcher shut down");
    }

    /// Delivers whatever is already queued, then waits for in-flight sends
    async fn drain(&mut self, mut in_flight: JoinSet<()>) {
        self.receiver.close();

        let transport = self.transport.clone();
        let config = self.config.clone();
        let mut queued = Vec::new();
        while let Ok(email) = self.receiver.try_recv() {
            queued.push(email);
        }

        if !queued.is_empty() {
            tracing::info!(count = queued.len(), "Delivering queued mail before shutdown");
        }

        let finish = async {
            for email in queued {
                deliver(transport.as_ref(), &config, email).await;
            }
            while in_flight.join_next().await.is_some() {}
        };

        if tokio::time::timeout(self.config.drain_timeout, finish).await.is_err() {
            tracing::warn!("Mail drain timed out, abandoning remaining messages");
        }
    }
}

/// Renders and sends one message, logging the outcome
async fn deliver(transport: &dyn EmailTransport, config: &DispatcherConfig, email: OutboundEmail) {
    let kind = email.kind();
    let to = email.recipient().to_string();

    let message = match email.render(&config.base_url) {
        Ok(message) => message,
        Err(e) => {
            tracing::error!(kind, to = %to, error = %e, "Failed to render email");
            return;
        }
    };

    let result = match tokio::time::timeout(config.send_timeout, transport.send(&message)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout),
    };

    match result {
        Ok(()) => tracing::info!(kind, to = %to, transport = %transport.name(), "Email sent"),
        Err(e) => tracing::error!(kind, to = %to, transport = %transport.name(), error = %e, "Failed to send email"),
    }
}
