//! Monitor configuration
//!
//! Loaded once from the environment at startup and immutable afterwards.
//!
//! Required variables:
//! - MONGODB_URI: Base URL of the store's data API (http or https)
//! - DB_NAME / COLLECTION_NAME: Collection to watch
//! - ALERT_EMAIL: Alert recipient
//! - ALERT_TIME_HOURS: Staleness threshold in hours
//! - EMAIL_USER: Sender address
//! - EMAIL_PASSWORD: Mail API secret
//! - EMAIL_API_URL: Mail API messages endpoint, e.g.
//!   https://api.mailgun.net/v3/<domain>/messages (http or https)
//! - CHECK_INTERVAL_MINUTES: Check period
//! - MAX_RETRIES: Consecutive failures tolerated before fatal escalation
//! - RETRY_DELAY_MINUTES: Pause before restarting after a failure
//!
//! Optional variables:
//! - MONGODB_API_KEY: API key sent to the data API
//! - MONGODB_DATA_SOURCE: Data source name (default: Cluster0)
//! - EMAIL_API_USER: Basic-auth user for the mail API (default: EMAIL_USER;
//!   Mailgun expects `api`)
//! - ALERT_SYSTEM_NAME: Name used in critical alerts (default: MongoDB Alert System)
//! - REQUEST_TIMEOUT_SECS: HTTP timeout (default: 30)
//!
//! A `.env` file in the working directory is read first; variables already
//! set in the environment take precedence.

use std::path::Path;
use std::time::Duration;

use url::Url;

pub const DEFAULT_DATA_SOURCE: &str = "Cluster0";
pub const DEFAULT_SYSTEM_NAME: &str = "MongoDB Alert System";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Record store connection settings
#[derive(Clone)]
pub struct StoreConfig {
    /// Base URL of the data API
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Data source (cluster) name
    pub data_source: String,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("uri", &self.redacted_uri())
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("data_source", &self.data_source)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl StoreConfig {
    /// Store URI with any userinfo removed, safe for logs
    pub fn redacted_uri(&self) -> String {
        redact_url(&self.uri)
    }
}

/// Strip username and password from a URL
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if !url.username().is_empty() || url.password().is_some() {
                // Only fails for cannot-be-a-base URLs, which carry no userinfo
                let _ = url.set_username("");
                let _ = url.set_password(None);
            }
            url.to_string()
        }
        Err(_) => "<unparseable uri>".to_string(),
    }
}

/// Read a dotenv file into the process environment.
///
/// Existing variables are not overridden. Returns `false` when the file does
/// not exist.
pub fn load_env_file(path: &Path) -> Result<bool, ConfigError> {
    if !path.exists() {
        return Ok(false);
    }
    dotenv::from_path(path)
        .map_err(|e| ConfigError::EnvFile(format!("{}: {}", path.display(), e)))?;
    Ok(true)
}

/// Outbound mail settings
#[derive(Clone)]
pub struct MailConfig {
    /// Mail API messages endpoint
    pub api_url: String,
    /// Basic-auth user for the mail API
    pub api_user: String,
    /// Sender address
    pub sender: String,
    /// Sender secret
    pub password: String,
    /// Alert recipient
    pub recipient: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &redact_url(&self.api_url))
            .field("api_user", &self.api_user)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Full monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub store: StoreConfig,
    pub mail: MailConfig,
    /// Maximum allowed age of the newest record, in hours
    pub alert_threshold_hours: f64,
    pub check_interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Name used in the critical alert subject
    pub system_name: String,
    pub request_timeout: Duration,
}

impl MonitorConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let store = StoreConfig {
            uri: vars.http_url("MONGODB_URI")?,
            database: vars.required("DB_NAME")?,
            collection: vars.required("COLLECTION_NAME")?,
            data_source: vars
                .optional("MONGODB_DATA_SOURCE")
                .unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string()),
            api_key: vars.optional("MONGODB_API_KEY"),
        };

        let sender = vars.required("EMAIL_USER")?;
        let mail = MailConfig {
            api_url: vars.http_url("EMAIL_API_URL")?,
            api_user: vars
                .optional("EMAIL_API_USER")
                .unwrap_or_else(|| sender.clone()),
            sender,
            password: vars.required("EMAIL_PASSWORD")?,
            recipient: vars.required("ALERT_EMAIL")?,
        };

        let alert_threshold_hours = vars.non_negative("ALERT_TIME_HOURS")?;
        let check_interval = vars.minutes("CHECK_INTERVAL_MINUTES")?;
        if check_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "CHECK_INTERVAL_MINUTES",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_retries = vars.parsed::<u32>("MAX_RETRIES")?;
        let retry_delay = vars.minutes("RETRY_DELAY_MINUTES")?;

        let request_timeout = match vars.optional("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|e| ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                value: raw.clone(),
                reason: format!("{}", e),
            })?),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            store,
            mail,
            alert_threshold_hours,
            check_interval,
            max_retries,
            retry_delay,
            system_name: vars
                .optional("ALERT_SYSTEM_NAME")
                .unwrap_or_else(|| DEFAULT_SYSTEM_NAME.to_string()),
            request_timeout,
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T>(&self, key: &'static str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.required(key)?;
        raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        })
    }

    fn non_negative(&self, key: &'static str) -> Result<f64, ConfigError> {
        let value = self.parsed::<f64>(key)?;
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Invalid {
                key,
                value: value.to_string(),
                reason: "must be a finite, non-negative number".to_string(),
            });
        }
        Ok(value)
    }

    fn http_url(&self, key: &'static str) -> Result<String, ConfigError> {
        let raw = self.required(key)?;
        let invalid = |reason: String| ConfigError::Invalid {
            key,
            value: redact_url(&raw),
            reason,
        };

        let url = Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(raw.clone()),
            other => Err(invalid(format!(
                "scheme {:?} is not supported, expected an http(s) API endpoint",
                other
            ))),
        }
    }

    fn minutes(&self, key: &'static str) -> Result<Duration, ConfigError> {
        let value = self.non_negative(key)?;
        Duration::try_from_secs_f64(value * 60.0).map_err(|e| ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Failed to read env file {0}")]
    EnvFile(String),

    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
