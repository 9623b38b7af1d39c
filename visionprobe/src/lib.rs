//! # VisionProbe - Camera Inference Telemetry
//!
//! VisionProbe streams live camera frames into a pluggable inference model
//! and reports the model's throughput and latency through a tracing
//! backend.
//!
//! ## Key Features
//!
//! - **Capability negotiation**: picks resolution, frame rate and bit rate
//!   tiers from what the camera reports
//! - **Frame-paced inference**: at most one prediction in flight, with
//!   cooperative cancellation
//! - **Telemetry**: per-second throughput and inter-sample latency for all
//!   and for confident predictions, forwarded as tagged measurements
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use visionprobe::{Detection, MockCaptureBackend, StaticPredictor, VisionProbe};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let probe = VisionProbe::init()?;
//!
//!     let mut session = probe
//!         .session(
//!             Arc::new(MockCaptureBackend::new()),
//!             Arc::new(StaticPredictor::new("demo", vec![Detection::new("cup", 0.9)])),
//!         )
//!         .confidence_threshold(0.5)
//!         .build()?;
//!
//!     session.start().await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(3)).await;
//!
//!     if let Some(report) = session.stop().await {
//!         println!("{:.1} predictions/s", report.all_samples.avg_count_per_second);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use visionprobe_core::{
    choose_configuration, BitRateTier, ChosenConfiguration, Clock, DeviceCapability,
    ErrorCategory, FacingMode, FrameRateTier, ManualClock, ProbeError, ProbeResult,
    ResolutionTier, StreamConstraints, SystemClock, BIT_RATE_TIERS, FRAME_RATE_TIERS,
    RESOLUTION_TIERS,
};

pub use visionprobe_media::{
    CancelToken, CaptureBackend, Detection, DeviceId, FrameSource, InferenceScheduler,
    MediaStream, MockCaptureBackend, MockFailure, MockStream, Predictor, RecordOptions,
    SampleLog, SchedulerConfig, StaticPredictor, VideoFrame,
};

pub use visionprobe_diagnostics::{
    average, format_capture_time, summarize, DebugLogger, FixedMemoryProbe, LogTracer,
    MeasurementUnit, MemoryProbe, MemorySampler, MetricsSummary, ProcessMemoryProbe,
    RecordingTracer, SpanHandle, TraceRecord, Tracer, TransactionHandle, TransactionStatus,
    DEFAULT_LOG_FILTER,
};

// Public API modules
pub mod config;
pub mod event;
pub mod session;

// Re-export main API types
pub use config::{GlobalConfig, SessionConfig};
pub use event::{EventStream, SessionEvent};
pub use session::{RecordingSession, SessionBuilder, SessionReport, SessionState};

use std::sync::Arc;

/// Main entry point for VisionProbe
#[derive(Debug, Clone)]
pub struct VisionProbe {
    inner: Arc<VisionProbeInner>,
}

#[derive(Debug)]
struct VisionProbeInner {
    config: GlobalConfig,
}

impl VisionProbe {
    /// Initialize VisionProbe with default settings
    ///
    /// # Example
    /// ```rust,no_run
    /// use visionprobe::VisionProbe;
    ///
    /// let probe = VisionProbe::init()?;
    /// # Ok::<(), visionprobe::ProbeError>(())
    /// ```
    pub fn init() -> ProbeResult<Self> {
        Self::init_with(GlobalConfig::default())
    }

    /// Initialize with custom global configuration
    ///
    /// Installs the logging subscriber when `debug_logging` is set.
    pub fn init_with(config: GlobalConfig) -> ProbeResult<Self> {
        config.session_defaults.validate()?;
        if config.debug_logging {
            DebugLogger::init_logging(&config.log_filter)?;
        }

        Ok(Self {
            inner: Arc::new(VisionProbeInner { config }),
        })
    }

    /// Global configuration
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    /// Create a session builder over a capture backend and a model
    ///
    /// # Example
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use visionprobe::{MockCaptureBackend, StaticPredictor, VisionProbe};
    ///
    /// # async fn example() -> Result<(), visionprobe::ProbeError> {
    /// let probe = VisionProbe::init()?;
    /// let mut session = probe
    ///     .session(
    ///         Arc::new(MockCaptureBackend::new()),
    ///         Arc::new(StaticPredictor::new("demo", Vec::new())),
    ///     )
    ///     .build()?;
    /// session.negotiate().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn session(
        &self,
        capture: Arc<dyn CaptureBackend>,
        predictor: Arc<dyn Predictor>,
    ) -> SessionBuilder {
        SessionBuilder::new(self, capture, predictor)
    }
}
