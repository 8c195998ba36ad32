//! Alert notifications

use std::error::Error;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use super::mailer::{EmailMessage, Mailer};

pub const STALENESS_SUBJECT: &str = "Alert: Data not updated";

/// Sends alert emails to the configured recipient
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    sender: String,
    recipient: String,
    system_name: String,
}

impl Notifier {
    /// Create a new notifier
    pub fn new(
        mailer: Arc<dyn Mailer>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        system_name: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            sender: sender.into(),
            recipient: recipient.into(),
            system_name: system_name.into(),
        }
    }

    /// Send one email with the given subject and body
    pub async fn send_alert(&self, subject: &str, body: &str) -> Result<String, NotifierError> {
        let message = EmailMessage {
            from: self.sender.clone(),
            to: self.recipient.clone(),
            subject: subject.to_string(),
            text: body.to_string(),
        };

        let receipt = self.mailer.send(&message).await?;
        tracing::debug!(
            recipient = %self.recipient,
            subject = %subject,
            response = %receipt.trim(),
            "Email delivered"
        );
        Ok(receipt)
    }

    /// Send the data-not-updated alert
    pub async fn send_staleness_alert(
        &self,
        threshold_hours: f64,
        last_created_at: DateTime<Utc>,
    ) -> Result<String, NotifierError> {
        let body = staleness_body(threshold_hours, last_created_at);
        self.send_alert(STALENESS_SUBJECT, &body).await
    }

    /// Send the critical escalation alert.
    ///
    /// This is the last resort: a delivery failure is logged and reported
    /// as `false`, never propagated.
    pub async fn send_critical_alert(&self, error: &(dyn Error + 'static)) -> bool {
        let subject = critical_subject(&self.system_name);
        let body = critical_body(&self.system_name, error);

        match self.send_alert(&subject, &body).await {
            Ok(receipt) => {
                tracing::info!(response = %receipt.trim(), "Critical error alert sent");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send critical error email");
                false
            }
        }
    }
}

/// Body of the staleness alert
pub fn staleness_body(threshold_hours: f64, last_created_at: DateTime<Utc>) -> String {
    format!(
        "The last document in the collection was created more than {} hours ago. last data created: {}",
        threshold_hours,
        last_created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Subject of the critical escalation alert
pub fn critical_subject(system_name: &str) -> String {
    format!("CRITICAL: {} Error", system_name)
}

/// Body of the critical escalation alert
pub fn critical_body(system_name: &str, error: &(dyn Error + 'static)) -> String {
    format!(
        "The {} has encountered a critical error and will be restarted.\n\nError details:\n{}\n\nStack trace:\n{}",
        system_name,
        error,
        diagnostic_trace(error)
    )
}

/// Render an error's source chain followed by its debug representation
pub fn diagnostic_trace(error: &(dyn Error + 'static)) -> String {
    let mut lines = Vec::new();
    let mut current: Option<&(dyn Error + 'static)> = Some(error);
    let mut depth = 0;

    while let Some(err) = current {
        lines.push(format!("{:>4}: {}", depth, err));
        current = err.source();
        depth += 1;
    }

    lines.push(String::new());
    lines.push(format!("{:#?}", error));
    lines.join("\n")
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Email transport error: {0}")]
    Transport(String),

    #[error("Email rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMailer;
    use chrono::TimeZone;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner cause")]
    struct Inner;

    fn notifier(mailer: Arc<RecordingMailer>) -> Notifier {
        Notifier::new(
            mailer,
            "monitor@example.com",
            "ops@example.com",
            "MongoDB Alert System",
        )
    }

    #[test]
    fn test_staleness_body() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let body = staleness_body(24.0, ts);
        assert!(body.contains("more than 24 hours ago"));
        assert!(body.contains("2024-03-01T12:30:00.000Z"));

        let body = staleness_body(1.5, ts);
        assert!(body.contains("more than 1.5 hours ago"));
    }

    #[test]
    fn test_diagnostic_trace_walks_sources() {
        let trace = diagnostic_trace(&Outer(Inner));
        assert!(trace.contains("0: outer failure"));
        assert!(trace.contains("1: inner cause"));
        assert!(trace.contains("Outer("));
    }

    #[tokio::test]
    async fn test_send_alert_addresses_recipient() {
        let mailer = Arc::new(RecordingMailer::new());
        let receipt = notifier(mailer.clone())
            .send_alert("subject", "body")
            .await
            .unwrap();

        assert_eq!(receipt, "250 OK");
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "monitor@example.com");
        assert_eq!(sent[0].to, "ops@example.com");
    }

    #[tokio::test]
    async fn test_critical_alert() {
        let mailer = Arc::new(RecordingMailer::new());
        assert!(notifier(mailer.clone()).send_critical_alert(&Outer(Inner)).await);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "CRITICAL: MongoDB Alert System Error");
        assert!(sent[0].text.contains("Error details:\nouter failure"));
        assert!(sent[0].text.contains("inner cause"));
    }

    #[tokio::test]
    async fn test_critical_alert_failure_is_swallowed() {
        let mailer = Arc::new(RecordingMailer::failing());
        assert!(!notifier(mailer.clone()).send_critical_alert(&Outer(Inner)).await);
        assert_eq!(mailer.attempts(), 1);
    }
}
