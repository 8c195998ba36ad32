//! Freshness checker
//!
//! One check cycle: open a store connection, read the newest record, and
//! send the staleness alert when it is older than the threshold. Failures
//! are returned as a `CheckOutcome`, never propagated.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::notifier::{Notifier, NotifierError};
use crate::clock::{elapsed_hours, TimeSource};
use crate::store::{RecordStore, StoreConnection, StoreError};

/// Result of one check cycle
#[derive(Debug)]
pub enum CheckOutcome {
    /// The collection is empty; nothing to evaluate
    NoRecords,
    /// Newest record is within the threshold
    NoAlertNeeded,
    /// Staleness alert delivered for a record created at the given time
    AlertSent(DateTime<Utc>),
    /// The cycle failed
    CheckFailed(CheckError),
}

impl CheckOutcome {
    /// Whether the cycle completed without error
    pub fn is_success(&self) -> bool {
        !matches!(self, CheckOutcome::CheckFailed(_))
    }
}

/// Checks the age of the newest record
pub struct FreshnessChecker {
    store: Arc<dyn RecordStore>,
    notifier: Arc<Notifier>,
    clock: Arc<dyn TimeSource>,
    threshold_hours: f64,
}

impl FreshnessChecker {
    /// Create a new checker
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<Notifier>,
        clock: Arc<dyn TimeSource>,
        threshold_hours: f64,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            threshold_hours,
        }
    }

    /// Run one check cycle
    pub async fn check(&self) -> CheckOutcome {
        match self.try_check().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(kind = ?e.kind(), error = %e, "Error checking the collection");
                CheckOutcome::CheckFailed(e)
            }
        }
    }

    async fn try_check(&self) -> Result<CheckOutcome, CheckError> {
        let mut conn = self.store.connect().await?;
        let result = self.inspect(&mut *conn).await;
        conn.close().await;
        result
    }

    async fn inspect(&self, conn: &mut dyn StoreConnection) -> Result<CheckOutcome, CheckError> {
        let Some(latest) = conn.latest_record().await? else {
            tracing::info!("Check completed. Collection is empty, nothing to evaluate.");
            return Ok(CheckOutcome::NoRecords);
        };

        let elapsed = elapsed_hours(self.clock.now(), latest.created_at);

        if elapsed > self.threshold_hours {
            self.notifier
                .send_staleness_alert(self.threshold_hours, latest.created_at)
                .await?;
            tracing::warn!(
                last_created_at = %latest.created_at,
                elapsed_hours = elapsed,
                threshold_hours = self.threshold_hours,
                "Alert sent"
            );
            Ok(CheckOutcome::AlertSent(latest.created_at))
        } else {
            tracing::info!(
                last_created_at = %latest.created_at,
                elapsed_hours = elapsed,
                "Check completed. No alert needed."
            );
            Ok(CheckOutcome::NoAlertNeeded)
        }
    }
}

/// Kind of check failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Query,
    MalformedData,
    NotificationDelivery,
}

/// Check cycle errors
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Notification delivery failed: {0}")]
    NotificationDelivery(#[from] NotifierError),
}

impl CheckError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckError::Store(StoreError::Connection(_)) => ErrorKind::Connection,
            CheckError::Store(StoreError::Query(_)) => ErrorKind::Query,
            CheckError::Store(StoreError::MalformedData(_)) => ErrorKind::MalformedData,
            CheckError::NotificationDelivery(_) => ErrorKind::NotificationDelivery,
        }
    }
}
