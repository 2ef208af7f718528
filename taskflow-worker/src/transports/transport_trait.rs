/// Core transport trait and types
///
/// # Transport Contract
///
/// All transports must:
/// 1. Implement the `EmailTransport` trait (async)
/// 2. Deliver a fully rendered [`EmailMessage`] or return an error
/// 3. Be shareable across tasks (`Send + Sync`)
///
/// # Example
///
/// ```no_run
/// use async_trait::async_trait;
/// use taskflow_worker::transports::{EmailMessage, EmailTransport, TransportResult};
///
/// struct StdoutTransport;
///
/// #[async_trait]
/// impl EmailTransport for StdoutTransport {
///     fn name(&self) -> &str {
///         "stdout"
///     }
///
///     async fn send(&self, message: &EmailMessage) -> TransportResult<()> {
///         println!("to={} subject={}", message.to, message.subject);
///         Ok(())
///     }
/// }
/// ```

use async_trait::async_trait;
use serde::Serialize;

/// Transport error types
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request could not be sent or the connection failed
    #[error("Request failed: {0}")]
    Request(String),

    /// Provider answered with a non-success status
    #[error("Provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Delivery did not finish in time
    #[error("Delivery timed out")]
    Timeout,
}

/// Transport result type alias
pub type TransportResult<T> = Result<T, TransportError>;

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,

    pub subject: String,

    /// HTML body
    pub html: String,
}

/// Email transport trait
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Returns the transport name (for logging)
    fn name(&self) -> &str;

    /// Delivers one message
    async fn send(&self, message: &EmailMessage) -> TransportResult<()>;
}
