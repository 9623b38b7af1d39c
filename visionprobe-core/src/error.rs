//! Error types for VisionProbe

use std::time::Duration;
use thiserror::Error;

/// Main error type for VisionProbe operations
#[derive(Error, Debug)]
pub enum ProbeError {
    /// No capture device could be found or opened
    #[error("Device unavailable: {reason}")]
    DeviceUnavailable {
        /// Reason the device is unavailable
        reason: String,
    },

    /// The user or the platform refused access to the camera
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// The device cannot deliver the requested stream constraints
    #[error("Constraints not satisfiable: {constraint}")]
    ConstraintsNotSatisfiable {
        /// Constraint that could not be satisfied
        constraint: String,
    },

    /// The predictor was asked to run before its model finished loading
    #[error("Model not loaded: {model}")]
    ModelNotLoaded {
        /// Model name
        model: String,
    },

    /// A prediction call failed
    #[error("Inference failed for {model}: {reason}")]
    Inference {
        /// Model name
        model: String,
        /// Failure reason
        reason: String,
    },

    /// Fewer than two distinct second buckets were available for aggregation
    #[error("Insufficient samples: {buckets} distinct second bucket(s)")]
    InsufficientSamples {
        /// Number of distinct buckets observed before trimming
        buckets: usize,
    },

    /// The media stream stopped delivering frames
    #[error("Stream ended: {reason}")]
    StreamEnded {
        /// Reason the stream ended
        reason: String,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Invalid operation error
    #[error("Invalid operation: {operation}")]
    InvalidOperation {
        /// Operation that was invalid
        operation: String,
    },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// Operation timed out error
    #[error("Operation timed out: {operation} after {duration:?}")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Duration after which timeout occurred
        duration: Duration,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Configuration could not be parsed
    #[error("Serialization error: {source}")]
    Serialization {
        /// Underlying serde error
        #[from]
        source: serde_json::Error,
    },
}

/// Result type alias for VisionProbe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

impl ProbeError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            ProbeError::DeviceUnavailable { .. } => "DEVICE_UNAVAILABLE".to_string(),
            ProbeError::PermissionDenied { .. } => "PERMISSION_DENIED".to_string(),
            ProbeError::ConstraintsNotSatisfiable { .. } => {
                "CONSTRAINTS_NOT_SATISFIABLE".to_string()
            }
            ProbeError::ModelNotLoaded { .. } => "MODEL_NOT_LOADED".to_string(),
            ProbeError::Inference { .. } => "INFERENCE_ERROR".to_string(),
            ProbeError::InsufficientSamples { .. } => "INSUFFICIENT_SAMPLES".to_string(),
            ProbeError::StreamEnded { .. } => "STREAM_ENDED".to_string(),
            ProbeError::InvalidState { .. } => "INVALID_STATE".to_string(),
            ProbeError::InvalidOperation { .. } => "INVALID_OPERATION".to_string(),
            ProbeError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION".to_string(),
            ProbeError::Initialization { .. } => "INITIALIZATION_FAILED".to_string(),
            ProbeError::Timeout { .. } => "TIMEOUT".to_string(),
            ProbeError::Io { .. } => "IO_ERROR".to_string(),
            ProbeError::Serialization { .. } => "SERIALIZATION_ERROR".to_string(),
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProbeError::DeviceUnavailable { .. } => ErrorCategory::Device,
            ProbeError::PermissionDenied { .. } => ErrorCategory::Device,
            ProbeError::ConstraintsNotSatisfiable { .. } => ErrorCategory::Device,
            ProbeError::StreamEnded { .. } => ErrorCategory::Device,
            ProbeError::ModelNotLoaded { .. } => ErrorCategory::Model,
            ProbeError::Inference { .. } => ErrorCategory::Model,
            ProbeError::InsufficientSamples { .. } => ErrorCategory::Data,
            ProbeError::InvalidState { .. } => ErrorCategory::State,
            ProbeError::InvalidOperation { .. } => ErrorCategory::State,
            ProbeError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            ProbeError::Serialization { .. } => ErrorCategory::Configuration,
            ProbeError::Initialization { .. } => ErrorCategory::System,
            ProbeError::Timeout { .. } => ErrorCategory::System,
            ProbeError::Io { .. } => ErrorCategory::System,
        }
    }

    /// Check if error is recoverable
    ///
    /// Recoverable errors leave the session restartable without user action
    /// beyond retrying; the rest need a permission grant, a different device
    /// or a code/config fix.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProbeError::Inference { .. } => true,
            ProbeError::InsufficientSamples { .. } => true,
            ProbeError::StreamEnded { .. } => true,
            ProbeError::Timeout { .. } => true,
            ProbeError::Io { .. } => true,
            ProbeError::ConstraintsNotSatisfiable { .. } => true,
            ProbeError::DeviceUnavailable { .. } => false,
            ProbeError::PermissionDenied { .. } => false,
            ProbeError::ModelNotLoaded { .. } => false,
            _ => false,
        }
    }

    /// Short message suitable for showing to the person operating the camera
    pub fn user_message(&self) -> String {
        match self {
            ProbeError::DeviceUnavailable { .. } => {
                "No camera is available. Connect a camera and try again.".to_string()
            }
            ProbeError::PermissionDenied { .. } => {
                "Camera access was denied. Press \"Allow\" to grant access.".to_string()
            }
            ProbeError::ConstraintsNotSatisfiable { .. } => {
                "The camera cannot record with the selected settings.".to_string()
            }
            ProbeError::ModelNotLoaded { model } => {
                format!("The {} model is not ready yet.", model)
            }
            ProbeError::Inference { model, .. } => {
                format!("The {} model stopped producing predictions.", model)
            }
            ProbeError::StreamEnded { .. } => "The camera stream stopped.".to_string(),
            other => format!("Cannot record now: {}", other),
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Capture device, permission and stream errors
    Device,
    /// Inference model errors
    Model,
    /// Aggregation input errors
    Data,
    /// State machine misuse
    State,
    /// Configuration and parameter errors
    Configuration,
    /// System-level errors (I/O, timeouts, initialization)
    System,
}
