//! Test doubles for the store, mail transport and clock

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::alerts::{EmailMessage, Mailer, NotifierError};
use crate::clock::TimeSource;
use crate::store::{LatestRecordSnapshot, RecordStore, StoreConnection, StoreError};

/// Clock pinned to a single instant
pub struct FixedClock(pub DateTime<Utc>);

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Mailer that records every message
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// A mailer whose every delivery is rejected
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<String, NotifierError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifierError::Rejected {
                status: 535,
                body: "authentication failed".to_string(),
            });
        }
        self.sent.lock().push(message.clone());
        Ok("250 OK".to_string())
    }
}

/// Scripted result of one store query
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Record(DateTime<Utc>),
    Empty,
    ConnectFails,
    QueryFails,
}

/// Store that replays a script, one entry per connection.
///
/// Once the script runs out the last entry repeats.
pub struct ScriptedStore {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedStore {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            connects: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn next(&self) -> Scripted {
        let mut script = self.script.lock();
        let mut last = self.last.lock();
        if let Some(step) = script.pop_front() {
            *last = Some(step);
            return step;
        }
        (*last).unwrap_or(Scripted::Empty)
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.next() {
            Scripted::ConnectFails => Err(StoreError::Connection("connection refused".to_string())),
            step => Ok(Box::new(ScriptedConnection {
                step,
                closes: Arc::clone(&self.closes),
            })),
        }
    }
}

struct ScriptedConnection {
    step: Scripted,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl StoreConnection for ScriptedConnection {
    async fn latest_record(&mut self) -> Result<Option<LatestRecordSnapshot>, StoreError> {
        match self.step {
            Scripted::Record(created_at) => Ok(Some(LatestRecordSnapshot { created_at })),
            Scripted::Empty => Ok(None),
            Scripted::QueryFails | Scripted::ConnectFails => {
                Err(StoreError::Query("cursor killed".to_string()))
            }
        }
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
