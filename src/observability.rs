// Observability for the v2 gateway
// Structured logging setup and per-request tracing with request ids.

use anyhow::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::errors::BridgeError;

// Global atomic counters, reported by the health endpoint
static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);
static INPUT_ERROR_COUNTER: AtomicU64 = AtomicU64::new(0);
static DOWNSTREAM_ERROR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize the logging and tracing infrastructure
/// This should be called once at application startup
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with configurable verbosity
pub fn init_logging_with_level(verbose: bool, quiet: bool) -> Result<()> {
    init_logging_with_config(&LoggingConfig {
        verbose,
        quiet,
        filter: None,
    })
}

/// Initialize logging from the `[logging]` section of the gateway config
///
/// `RUST_LOG` replaces the configured directives unless `quiet` is set.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let configured = EnvFilter::try_new(config.directives())?;
    let env_filter = if !config.quiet && std::env::var("RUST_LOG").is_ok() {
        EnvFilter::try_from_default_env().unwrap_or(configured)
    } else {
        configured
    };

    let detailed = !config.quiet;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(detailed)
        .with_thread_ids(detailed)
        .with_line_number(detailed)
        .with_file(detailed)
        .with_ansi(true);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        Ok(()) => {
            info!(directives = %config.directives(), "v2 gateway logging initialized");
            Ok(())
        }
        // A subscriber is already installed, as happens across tests
        Err(_) => Ok(()),
    }
}

/// Snapshot of the request counters
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RequestCounts {
    pub requests: u64,
    pub input_errors: u64,
    pub downstream_errors: u64,
}

pub fn request_counts() -> RequestCounts {
    RequestCounts {
        requests: REQUEST_COUNTER.load(Ordering::Relaxed),
        input_errors: INPUT_ERROR_COUNTER.load(Ordering::Relaxed),
        downstream_errors: DOWNSTREAM_ERROR_COUNTER.load(Ordering::Relaxed),
    }
}

/// Run one legacy operation, logging start, completion and failure
///
/// Input errors are logged at `warn`, everything else at `error`.
pub async fn with_request_id<F, T>(
    operation: &str,
    request_id: &str,
    f: F,
) -> Result<T, BridgeError>
where
    F: std::future::Future<Output = Result<T, BridgeError>>,
{
    REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    info!(request_id = %request_id, "Starting operation: {}", operation);

    let start = Instant::now();
    let result = f.await;
    let elapsed = start.elapsed();

    match &result {
        Ok(_) => {
            info!(
                request_id = %request_id,
                elapsed_ms = elapsed.as_millis(),
                "Operation completed successfully: {}", operation
            );
        }
        Err(e) if e.is_input_error() => {
            INPUT_ERROR_COUNTER.fetch_add(1, Ordering::Relaxed);
            warn!(
                request_id = %request_id,
                elapsed_ms = elapsed.as_millis(),
                error = %e,
                "Operation rejected input: {}", operation
            );
        }
        Err(e) => {
            DOWNSTREAM_ERROR_COUNTER.fetch_add(1, Ordering::Relaxed);
            error!(
                request_id = %request_id,
                elapsed_ms = elapsed.as_millis(),
                error = %e,
                "Operation failed: {}", operation
            );
        }
    }

    result
}
