//! Completion notifications. Sent once per job, after all phases finish,
//! so a notification failure can never discard produced artifacts.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),

    #[error("Mail endpoint rejected the message: {status}")]
    Rejected { status: u16 },
}

#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Posts the message as JSON to a mail-delivery webhook.
pub struct WebhookMailer {
    endpoint: String,
    client: reqwest::Client,
}

impl WebhookMailer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        WebhookMailer {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&email)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Fallback when no mail endpoint is configured: the notification is
/// visible in the logs only.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "Notification email (no mail endpoint configured)");
        Ok(())
    }
}

/// Captures sent mail for assertions.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        MemoryMailer::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}
