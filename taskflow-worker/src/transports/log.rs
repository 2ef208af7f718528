/// Log-only transport
///
/// Used when no provider credential is configured. The envelope (sender,
/// recipient, subject) is logged at info level. The body carries the
/// verification code, so it is only logged at debug level: run with
/// `LOG_LEVEL=debug` to read codes locally.

use async_trait::async_trait;

use super::{EmailMessage, EmailTransport, TransportResult};

pub struct LogTransport {
    from: String,
}

impl LogTransport {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl EmailTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> TransportResult<()> {
        tracing::info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            "Email not sent (no provider configured)"
        );
        tracing::debug!(to = %message.to, html = %message.html, "Unsent email body");
        Ok(())
    }
}
