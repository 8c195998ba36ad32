//! Failure escalation
//!
//! Counts consecutive failed check cycles. Up to `max_retries` failures are
//! retried after a delay; the next one sends a critical alert and ends the
//! run so an external supervisor can restart the process.

use std::sync::Arc;
use std::time::Duration;

use crate::alerts::{CheckError, CheckOutcome, Notifier};

/// Retry limits
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

/// Consecutive-failure counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscalationState {
    consecutive_failures: u32,
}

/// What the scheduler should do after a cycle
#[derive(Debug)]
pub enum Escalation {
    /// Keep the current timer running
    Continue,
    /// Cancel the timer, wait `delay`, then restart
    Retry {
        attempt: u32,
        max_retries: u32,
        delay: Duration,
    },
    /// Retries exhausted; the critical alert has been attempted
    Fatal { error: CheckError, attempts: u32 },
}

impl EscalationState {
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Reset after a successful cycle
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Count a failure; returns true while still within the retry budget
    pub fn record_failure(&mut self, policy: &RetryPolicy) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures <= policy.max_retries
    }
}

/// Routes check outcomes to retry or fatal escalation
pub struct RetryEscalator {
    policy: RetryPolicy,
    state: EscalationState,
    notifier: Arc<Notifier>,
}

impl RetryEscalator {
    /// Create a new escalator with a zeroed counter
    pub fn new(policy: RetryPolicy, notifier: Arc<Notifier>) -> Self {
        Self {
            policy,
            state: EscalationState::default(),
            notifier,
        }
    }

    /// Current escalation state
    pub fn state(&self) -> EscalationState {
        self.state
    }

    /// Record a cycle outcome and decide what happens next
    pub async fn record(&mut self, outcome: CheckOutcome) -> Escalation {
        let error = match outcome {
            CheckOutcome::CheckFailed(error) => error,
            _ => {
                self.state.record_success();
                return Escalation::Continue;
            }
        };

        if self.state.record_failure(&self.policy) {
            let attempt = self.state.consecutive_failures();
            tracing::warn!(
                attempt,
                max_retries = self.policy.max_retries,
                "Attempt {} of {}. Retrying in {:.2} minutes...",
                attempt,
                self.policy.max_retries,
                self.policy.retry_delay.as_secs_f64() / 60.0
            );
            return Escalation::Retry {
                attempt,
                max_retries: self.policy.max_retries,
                delay: self.policy.retry_delay,
            };
        }

        tracing::error!(
            max_retries = self.policy.max_retries,
            error = %error,
            "Maximum retry attempts ({}) reached. Sending critical error alert.",
            self.policy.max_retries
        );
        self.notifier.send_critical_alert(&error).await;

        Escalation::Fatal {
            error,
            attempts: self.state.consecutive_failures(),
        }
    }
}
