use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, warn};

use crate::config::SmtpConfig;
use crate::error::AppError;
use crate::mailer::{MailMessage, Mailer};

/// SMTP-backed mailer. Built without a transport when host or sender are
/// missing from the config; sends are then skipped and reported as failed
/// so callers can fall back.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, AppError> {
        if config.host.is_empty() || config.from.is_empty() {
            return Ok(Self {
                transport: None,
                from: config.from.clone(),
            });
        }

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::ConfigError(format!("SMTP relay setup failed: {}", e)))?
            .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: Some(builder.build()),
            from: config.from.clone(),
        })
    }

    fn build_message(&self, message: &MailMessage) -> Result<Message, AppError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|_| AppError::ConfigError(format!("Invalid sender address: {}", self.from)))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|_| AppError::InternalError(format!("Invalid recipient address: {}", message.to)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                message.html.clone(),
            ))
            .map_err(|e| AppError::InternalError(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> bool {
        let transport = match &self.transport {
            Some(transport) => transport,
            None => {
                warn!("Mailer is not configured. Email was not sent.");
                return false;
            }
        };

        let email = match self.build_message(message) {
            Ok(email) => email,
            Err(e) => {
                error!("Failed to build email for {}: {}", message.to, e);
                return false;
            }
        };

        match transport.send(email).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to send email to {}: {}", message.to, e);
                false
            }
        }
    }
}
