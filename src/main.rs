//! Freshwatch Monitor
//!
//! Run with: cargo run
//!
//! Configuration is read from environment variables, after loading a `.env`
//! file from the working directory when one exists; see `freshwatch::config`
//! for the full list. RUST_LOG sets the log level (default: info).
//!
//! Exit status 1 means the retry budget was exhausted (or the configuration
//! is invalid) and the process expects its supervisor to restart it.

use freshwatch::scheduler::EXIT_INTERRUPTED;
use freshwatch::{build_scheduler, MonitorConfig, Termination};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freshwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if freshwatch::config::load_env_file(std::path::Path::new(".env"))? {
        tracing::info!("Loaded environment from .env");
    }
    let config = MonitorConfig::from_env()?;

    tracing::info!("Freshwatch configuration:");
    tracing::info!("  Store: {}", config.store.redacted_uri());
    tracing::info!(
        "  Collection: {}.{}",
        config.store.database,
        config.store.collection
    );
    tracing::info!("  Alert recipient: {}", config.mail.recipient);
    tracing::info!("  Staleness threshold: {} hours", config.alert_threshold_hours);
    tracing::info!(
        "  Check interval: {} seconds",
        config.check_interval.as_secs_f64()
    );
    tracing::info!(
        "  Retries: {} with {} seconds delay",
        config.max_retries,
        config.retry_delay.as_secs_f64()
    );

    let mut scheduler = build_scheduler(&config)?;

    let shutdown = scheduler.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown.send(()).await;
        }
    });

    let termination = scheduler.run().await;
    match &termination {
        Termination::Fatal { error, attempts } => {
            tracing::error!(
                attempts = *attempts,
                error = %error,
                "Exiting after fatal escalation"
            );
        }
        Termination::Shutdown => {
            tracing::info!("Interrupted, exiting with status {}", EXIT_INTERRUPTED);
        }
    }

    std::process::exit(termination.exit_code());
}
