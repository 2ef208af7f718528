/// Outbound mail queue
///
/// Request handlers hand mail to a [`MailQueue`] and move on. The queue is a
/// bounded channel drained by the [`MailDispatcher`](crate::dispatcher::MailDispatcher);
/// `enqueue` never waits, so a slow or failing provider can never hold up a
/// response. When the queue is full or the dispatcher is gone, the message is
/// dropped and a warning is logged.
///
/// # Flow
///
/// ```text
/// handler ──enqueue──> [bounded mpsc] ──> MailDispatcher ──render──> EmailTransport
/// ```

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{DispatcherConfig, MailDispatcher};
use crate::templates;
use crate::transports::{EmailMessage, EmailTransport};

/// A transactional email waiting to be rendered and sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEmail {
    /// Code issued at registration or resend
    VerificationCode { to: String, code: String },

    /// Sent once the email address is verified
    Welcome { to: String, name: String },
}

impl OutboundEmail {
    pub fn recipient(&self) -> &str {
        match self {
            OutboundEmail::VerificationCode { to, .. } | OutboundEmail::Welcome { to, .. } => to,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEmail::VerificationCode { .. } => "verification_code",
            OutboundEmail::Welcome { .. } => "welcome",
        }
    }

    /// Renders the message body
    pub fn render(&self, base_url: &str) -> Result<EmailMessage, askama::Error> {
        match self {
            OutboundEmail::VerificationCode { to, code } => templates::verification_code_email(to, code),
            OutboundEmail::Welcome { to, name } => templates::welcome_email(to, name, base_url),
        }
    }
}

/// Cloneable handle for submitting mail
#[derive(Clone)]
pub struct MailQueue {
    sender: mpsc::Sender<OutboundEmail>,
}

impl MailQueue {
    /// Submits a message without waiting
    ///
    /// Returns false if the message was dropped.
    pub fn enqueue(&self, email: OutboundEmail) -> bool {
        let kind = email.kind();

        match self.sender.try_send(email) {
            Ok(()) => {
                tracing::debug!(kind, "Queued email");
                true
            }
            Err(TrySendError::Full(email)) => {
                tracing::warn!(kind, to = %email.recipient(), "Mail queue full, dropping email");
                false
            }
            Err(TrySendError::Closed(email)) => {
                tracing::warn!(kind, to = %email.recipient(), "Mail dispatcher stopped, dropping email");
                false
            }
        }
    }

    /// Number of messages that can still be queued
    pub fn remaining_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

/// Creates a queue and the dispatcher that drains it
///
/// The dispatcher does nothing until [`MailDispatcher::run`] is spawned.
pub fn mail_channel(
    transport: Arc<dyn EmailTransport>,
    config: DispatcherConfig,
    shutdown_token: CancellationToken,
) -> (MailQueue, MailDispatcher) {
    let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));

    let dispatcher = MailDispatcher::new(receiver, transport, config, shutdown_token);

    (MailQueue { sender }, dispatcher)
}
