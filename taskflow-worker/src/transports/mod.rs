/// Email transports
///
/// A transport delivers one already-rendered message. It knows nothing about
/// templates or retries; the dispatcher owns both concerns.
///
/// # Transport Types
///
/// - **Resend**: HTTPS delivery through the Resend API
/// - **Log**: Writes the message to the log (development, no API key)
/// - **Mock**: Records messages in memory for tests

pub mod log;
pub mod mock;
pub mod resend;
pub mod transport_trait;

pub use log::LogTransport;
pub use mock::MockTransport;
pub use resend::ResendTransport;
pub use transport_trait::{EmailMessage, EmailTransport, TransportError, TransportResult};
