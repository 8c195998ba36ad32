//! Staleness checks and alert delivery
//!
//! The checker reads the newest record of the watched collection and emails
//! the recipient when it is older than the configured threshold.

pub mod checker;
pub mod mailer;
pub mod notifier;

pub use checker::{CheckError, CheckOutcome, ErrorKind, FreshnessChecker};
pub use mailer::{EmailMessage, HttpMailer, Mailer};
pub use notifier::{Notifier, NotifierError};
