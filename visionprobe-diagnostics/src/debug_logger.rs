//! Structured debug logging setup

use tracing_subscriber::EnvFilter;
use visionprobe_core::{ProbeError, ProbeResult};

/// Default filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "visionprobe=info";

/// Installs the global `tracing` subscriber
#[derive(Debug, Default)]
pub struct DebugLogger;

impl DebugLogger {
    /// Initialize logging with `RUST_LOG`, falling back to `default_filter`
    ///
    /// Fails with [`ProbeError::Initialization`] if a global subscriber is
    /// already installed or the filter does not parse.
    pub fn init_logging(default_filter: &str) -> ProbeResult<()> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(default_filter).map_err(|e| {
                ProbeError::Initialization {
                    reason: format!("invalid log filter '{}': {}", default_filter, e),
                }
            })?,
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .map_err(|e| ProbeError::Initialization {
                reason: format!("logging already initialized: {}", e),
            })?;

        tracing::debug!(default_filter, "logging initialized");
        Ok(())
    }
}
