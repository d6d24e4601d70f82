// quote-desk: notification mail for new quotations

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid address {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),
    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBody {
    Html(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: MailBody,
    pub attachment: Option<MailAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

// ============================================================================
// SMTP
// ============================================================================

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Display name on the From header
    pub sender_name: String,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Implicit-TLS relay with login credentials.
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        let from = Mailbox::new(
            Some(settings.sender_name.clone()),
            settings
                .username
                .parse()
                .map_err(|_| MailError::Address(settings.username.clone()))?,
        );
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|_| MailError::Address(mail.to.clone()))?;

        let body = match mail.body {
            MailBody::Html(html) => SinglePart::html(html),
            MailBody::Text(text) => SinglePart::plain(text),
        };
        let mut parts = MultiPart::mixed().singlepart(body);
        if let Some(attachment) = mail.attachment {
            let pdf = ContentType::parse("application/pdf")
                .map_err(|e| MailError::Build(e.to_string()))?;
            parts = parts.singlepart(Attachment::new(attachment.filename).body(attachment.content, pdf));
        }

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .multipart(parts)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        debug!(to = %mail.to, "mail delivered to relay");
        Ok(())
    }
}

// ============================================================================
// Recording
// ============================================================================

/// Keeps mail in memory instead of sending it. Optionally fails every send
/// once a number of mails has gone through.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
    fail_after: Option<(usize, String)>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::failing_after(0, reason)
    }

    /// Accepts `delivered` mails, then fails every send.
    pub fn failing_after(delivered: usize, reason: impl Into<String>) -> Self {
        Self {
            sent: Arc::default(),
            fail_after: Some((delivered, reason.into())),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        if let Some((delivered, reason)) = &self.fail_after {
            if sent.len() >= *delivered {
                return Err(MailError::Transport(reason.clone()));
            }
        }
        sent.push(mail);
        Ok(())
    }
}
