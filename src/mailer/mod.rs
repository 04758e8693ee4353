//! Outbound mail for gatewarden-server
//!
//! Delivery is fire-and-forget: `send` reports success or failure and
//! callers decide whether a failure matters.

pub mod smtp;

pub use smtp::SmtpMailer;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Returns true when the message was handed to the transport.
    async fn send(&self, message: &MailMessage) -> bool;
}
