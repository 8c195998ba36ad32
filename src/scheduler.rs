//! Periodic check scheduling
//!
//! A spawned interval task emits ticks; check cycles run one at a time on
//! the scheduler loop, so checks never overlap. Retries cancel the timer,
//! wait out the retry delay, and arm a fresh one.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use crate::alerts::{CheckError, FreshnessChecker};
use crate::escalation::{Escalation, RetryEscalator};

/// Exit status for fatal escalation
pub const EXIT_FATAL: i32 = 1;
/// Exit status after an external shutdown request
pub const EXIT_INTERRUPTED: i32 = 130;
/// Shortest period the check timer is armed with
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the active repeating timer
pub struct TimerHandle {
    ticks: mpsc::Receiver<()>,
    task: tokio::task::JoinHandle<()>,
}

impl TimerHandle {
    /// Arm a timer whose first tick fires immediately
    fn arm(period: Duration) -> Self {
        let (tick_tx, ticks) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if tick_tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        Self { ticks, task }
    }

    /// Wait for the next tick; `false` if the timer task is gone
    async fn tick(&mut self) -> bool {
        self.ticks.recv().await.is_some()
    }

    fn cancel(self) {
        self.task.abort();
    }
}

enum TimerEvent {
    Tick,
    Lost,
    Shutdown,
}

/// Counters describing scheduler activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Check cycles run
    pub cycles: u64,
    /// Timers armed, including the initial one
    pub timers_armed: u64,
    /// Timers cancelled
    pub timers_cancelled: u64,
    /// Retry waits performed
    pub retries: u64,
}

/// How a scheduler run ended
#[derive(Debug)]
pub enum Termination {
    /// Retries exhausted
    Fatal { error: CheckError, attempts: u32 },
    /// Stopped through the shutdown handle
    Shutdown,
}

impl Termination {
    /// Process exit status for this termination
    pub fn exit_code(&self) -> i32 {
        match self {
            Termination::Fatal { .. } => EXIT_FATAL,
            Termination::Shutdown => EXIT_INTERRUPTED,
        }
    }
}

/// Drives periodic freshness checks
pub struct Scheduler {
    checker: FreshnessChecker,
    escalator: RetryEscalator,
    check_interval: Duration,
    timer: Option<TimerHandle>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Create a new scheduler; no timer is armed until `start`
    ///
    /// Intervals below `MIN_CHECK_INTERVAL` are raised to it.
    pub fn new(
        checker: FreshnessChecker,
        escalator: RetryEscalator,
        check_interval: Duration,
    ) -> Self {
        let check_interval = if check_interval < MIN_CHECK_INTERVAL {
            tracing::warn!(
                requested_secs = check_interval.as_secs_f64(),
                "Check interval too short, using {} seconds",
                MIN_CHECK_INTERVAL.as_secs()
            );
            MIN_CHECK_INTERVAL
        } else {
            check_interval
        };

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            checker,
            escalator,
            check_interval,
            timer: None,
            shutdown_tx,
            shutdown_rx,
            stats: SchedulerStats::default(),
        }
    }

    /// Sender that stops the run loop between cycles
    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Whether a timer is currently armed
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Arm the periodic timer; the first check runs immediately
    pub fn start(&mut self) {
        self.restart();
    }

    /// Cancel any active timer and arm a new one
    pub fn restart(&mut self) {
        self.cancel_timer();
        self.timer = Some(TimerHandle::arm(self.check_interval));
        self.stats.timers_armed += 1;
        tracing::info!(
            "Alert system started. Checking every {:.2} minutes.",
            self.check_interval.as_secs_f64() / 60.0
        );
    }

    /// Cancel the active timer, if any
    pub fn cancel_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.cancel();
                self.stats.timers_cancelled += 1;
                tracing::debug!("Check timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Run check cycles until a terminal state is reached
    pub async fn run(&mut self) -> Termination {
        if self.timer.is_none() {
            self.start();
        }

        loop {
            let event = match self.timer.as_mut() {
                Some(timer) => {
                    tokio::select! {
                        biased;
                        _ = self.shutdown_rx.recv() => TimerEvent::Shutdown,
                        ticked = timer.tick() => {
                            if ticked { TimerEvent::Tick } else { TimerEvent::Lost }
                        }
                    }
                }
                None => TimerEvent::Lost,
            };

            match event {
                TimerEvent::Tick => {
                    if let Some(termination) = self.run_cycle().await {
                        return termination;
                    }
                }
                TimerEvent::Lost => {
                    tracing::warn!("Check timer stopped unexpectedly, re-arming");
                    self.restart();
                }
                TimerEvent::Shutdown => {
                    tracing::info!("Scheduler shutting down");
                    self.cancel_timer();
                    return Termination::Shutdown;
                }
            }
        }
    }

    /// Run one check and apply the escalation decision
    async fn run_cycle(&mut self) -> Option<Termination> {
        self.stats.cycles += 1;
        let outcome = self.checker.check().await;

        match self.escalator.record(outcome).await {
            Escalation::Continue => None,
            Escalation::Retry { delay, .. } => {
                self.cancel_timer();
                self.stats.retries += 1;
                tokio::time::sleep(delay).await;
                self.restart();
                None
            }
            Escalation::Fatal { error, attempts } => {
                self.cancel_timer();
                Some(Termination::Fatal { error, attempts })
            }
        }
    }
}
