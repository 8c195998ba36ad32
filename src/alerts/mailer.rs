//! Outbound email transport

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::notifier::NotifierError;
use crate::config::MailConfig;

/// A single outbound email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Transport that delivers one email per call
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a message, returning the transport's response text
    async fn send(&self, message: &EmailMessage) -> Result<String, NotifierError>;
}

/// Mailer for a Mailgun-style HTTP mail API
///
/// Each message is POSTed as a form (`from`, `to`, `subject`, `text`) to a
/// domain-qualified endpoint such as `https://api.mailgun.net/v3/<domain>/messages`,
/// authenticated with HTTP basic auth (`api` and the API key for Mailgun).
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    user: String,
    password: String,
}

impl HttpMailer {
    /// Create a mailer from mail settings
    pub fn new(config: &MailConfig, timeout: Duration) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            user: config.api_user.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<String, NotifierError> {
        let response = self
            .client
            .post(&self.api_url)
            .basic_auth(&self.user, Some(&self.password))
            .form(message)
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(|e| {
            NotifierError::Transport(format!(
                "Failed to read delivery receipt: {}",
                e.without_url()
            ))
        })
    }
}
