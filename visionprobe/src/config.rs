//! Configuration types and defaults

use crate::{FacingMode, ProbeError, ProbeResult, SchedulerConfig, DEFAULT_LOG_FILTER};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Global VisionProbe configuration
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Install the `tracing` subscriber on init
    pub debug_logging: bool,
    /// Filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Starting configuration for every session builder
    pub session_defaults: SessionConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            session_defaults: SessionConfig::default(),
        }
    }
}

/// Per-session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inclusive score threshold for confident samples, in `[0, 1]`
    pub confidence_threshold: f32,
    /// Swap requested width and height for a portrait viewport
    pub portrait: bool,
    /// Preferred camera
    pub facing: FacingMode,
    /// Frame clock period in milliseconds
    pub frame_interval_ms: u64,
    /// Memory sampling period in milliseconds
    pub memory_sample_interval_ms: u64,
    /// Consecutive prediction failures tolerated before the loop stalls
    pub prediction_retry_limit: u32,
    /// Upper bound on waiting for an in-flight prediction at stop
    pub stop_timeout_ms: u64,
    /// Recorder container and codec
    pub mime_type: String,
    /// Tracing transaction name
    pub transaction_name: String,
    /// Tracing transaction operation
    pub operation: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            portrait: true,
            facing: FacingMode::Environment,
            frame_interval_ms: 16,
            memory_sample_interval_ms: 1000,
            prediction_retry_limit: 0,
            stop_timeout_ms: 5000,
            mime_type: "video/webm;codecs=vp8".to_string(),
            transaction_name: "Video Processing".to_string(),
            operation: "video_capturing".to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> ProbeResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check value ranges
    pub fn validate(&self) -> ProbeResult<()> {
        let invalid = |message: &str| {
            Err(ProbeError::InvalidConfiguration {
                message: message.to_string(),
            })
        };

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return invalid("confidence_threshold must be within [0, 1]");
        }
        if self.frame_interval_ms == 0 {
            return invalid("frame_interval_ms must be greater than zero");
        }
        if self.memory_sample_interval_ms == 0 {
            return invalid("memory_sample_interval_ms must be greater than zero");
        }
        if self.mime_type.trim().is_empty() {
            return invalid("mime_type must not be empty");
        }
        if self.transaction_name.trim().is_empty() {
            return invalid("transaction_name must not be empty");
        }
        Ok(())
    }

    /// Scheduler settings derived from this configuration
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            confidence_threshold: self.confidence_threshold,
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            retry_limit: self.prediction_retry_limit,
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }

    /// Memory sampling period
    pub fn memory_sample_interval(&self) -> Duration {
        Duration::from_millis(self.memory_sample_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.portrait);
        assert_eq!(config.scheduler_config().frame_interval, Duration::from_millis(16));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config =
            SessionConfig::from_json_str(r#"{"confidence_threshold":0.5,"facing":"user"}"#)
                .unwrap();
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.facing, FacingMode::User);
        assert_eq!(config.stop_timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SessionConfig::from_json_str(r#"{"confidence_threshold":1.5}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");

        let config = SessionConfig {
            frame_interval_ms: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());

        let err = SessionConfig::from_json_str("{not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SessionConfig::from_json_file("/nonexistent/visionprobe.json").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
