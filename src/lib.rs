//! Freshwatch: Data Freshness Monitor
//!
//! Periodically reads the most recently inserted record of a single
//! collection and emails an alert when it is older than a configured
//! threshold. Internal failures are retried a bounded number of times; once
//! the retry budget is exhausted a critical alert is sent and the run ends
//! so an external supervisor can restart the process.
//!
//! # Components
//!
//! - **Clock**: wall-clock access and elapsed-hours computation
//! - **Store**: per-cycle connections to the record store
//! - **Alerts**: freshness checker, alert templates and mail transport
//! - **Escalation**: consecutive-failure counting, retry vs. fatal decisions
//! - **Scheduler**: periodic timer driving sequential check cycles
//!
//! # Example
//!
//! ```no_run
//! use freshwatch::{build_scheduler, MonitorConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MonitorConfig::from_env()?;
//! let mut scheduler = build_scheduler(&config)?;
//! let termination = scheduler.run().await;
//! std::process::exit(termination.exit_code());
//! # }
//! ```

use std::sync::Arc;

pub mod alerts;
pub mod clock;
pub mod config;
pub mod escalation;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use alerts::{CheckError, CheckOutcome, FreshnessChecker, Notifier, NotifierError};
pub use config::{ConfigError, MonitorConfig};
pub use escalation::{EscalationState, RetryEscalator, RetryPolicy};
pub use scheduler::{Scheduler, Termination};
pub use store::{LatestRecordSnapshot, RecordStore, StoreError};

/// Wire the HTTP store, HTTP mailer and system clock into a scheduler
pub fn build_scheduler(config: &MonitorConfig) -> Result<Scheduler, NotifierError> {
    let mailer = alerts::HttpMailer::new(&config.mail, config.request_timeout)?;
    let notifier = Arc::new(Notifier::new(
        Arc::new(mailer),
        config.mail.sender.clone(),
        config.mail.recipient.clone(),
        config.system_name.clone(),
    ));

    let store = store::HttpRecordStore::new(config.store.clone(), config.request_timeout);
    let checker = FreshnessChecker::new(
        Arc::new(store),
        Arc::clone(&notifier),
        Arc::new(clock::SystemClock),
        config.alert_threshold_hours,
    );

    let escalator = RetryEscalator::new(
        RetryPolicy {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        },
        notifier,
    );

    Ok(Scheduler::new(checker, escalator, config.check_interval))
}
