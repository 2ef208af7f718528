/// Mock transport for testing
///
/// Records every message it is asked to send. It can be switched into a
/// failing mode to exercise the error path; failed sends are not recorded.
///
/// # Example
///
/// ```
/// use taskflow_worker::transports::{EmailMessage, EmailTransport, MockTransport};
///
/// # async fn example() {
/// let transport = MockTransport::new();
/// transport.send(&EmailMessage {
///     to: "ada@example.com".to_string(),
///     subject: "Hi".to_string(),
///     html: "<p>Hi</p>".to_string(),
/// }).await.unwrap();
///
/// assert_eq!(transport.sent_to("ada@example.com").len(), 1);
/// # }
/// ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{EmailMessage, EmailTransport, TransportError, TransportResult};

/// In-memory transport; clones share the same mailbox
#[derive(Clone, Default)]
pub struct MockTransport {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following send fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All successfully sent messages, oldest first
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Messages sent to one recipient, oldest first
    pub fn sent_to(&self, to: &str) -> Vec<EmailMessage> {
        self.sent().into_iter().filter(|m| m.to == to).collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent().len()
    }

    /// Number of send calls, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmailTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, message: &EmailMessage) -> TransportResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Request("mock transport set to fail".to_string()));
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Subject".to_string(),
            html: "<p>Body</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_messages() {
        let transport = MockTransport::new();
        let shared = transport.clone();

        transport.send(&message("a@example.com")).await.unwrap();
        transport.send(&message("b@example.com")).await.unwrap();

        assert_eq!(shared.sent_count(), 2);
        assert_eq!(shared.sent_to("b@example.com").len(), 1);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let transport = MockTransport::new();
        transport.set_failing(true);

        assert!(transport.send(&message("a@example.com")).await.is_err());
        assert_eq!(transport.sent_count(), 0);
        assert_eq!(transport.attempts(), 1);

        transport.set_failing(false);
        assert!(transport.send(&message("a@example.com")).await.is_ok());
        assert_eq!(transport.sent_count(), 1);
    }
}
