//! # TaskFlow Worker Library
//!
//! Background delivery of transactional email and periodic housekeeping for
//! the TaskFlow API server.
//!
//! ## Modules
//!
//! - `transports`: Email delivery backends (Resend, log, mock)
//! - `templates`: Askama email templates
//! - `queue`: Bounded outbound mail queue
//! - `dispatcher`: Background task draining the queue
//! - `sweeper`: Periodic cleanup of expired verification codes
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskflow_worker::dispatcher::DispatcherConfig;
//! use taskflow_worker::queue::{mail_channel, OutboundEmail};
//! use taskflow_worker::transports::LogTransport;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let shutdown = CancellationToken::new();
//! let (queue, dispatcher) = mail_channel(
//!     Arc::new(LogTransport::new("noreply@example.com")),
//!     DispatcherConfig::default(),
//!     shutdown.clone(),
//! );
//! tokio::spawn(dispatcher.run());
//!
//! queue.enqueue(OutboundEmail::VerificationCode {
//!     to: "ada@example.com".to_string(),
//!     code: "123456".to_string(),
//! });
//! # }
//! ```

pub mod dispatcher;
pub mod queue;
pub mod sweeper;
pub mod templates;
pub mod transports;
