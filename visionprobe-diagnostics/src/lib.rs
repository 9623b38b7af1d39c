//! # VisionProbe Diagnostics
//!
//! Telemetry for capture sessions: reduction of sample timestamps into
//! throughput and latency figures, the tracing backend collaborator,
//! process memory sampling and logging setup.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod debug_logger;
pub mod memory_profiler;
pub mod metrics;
pub mod tracer;

// Re-export main types
pub use debug_logger::{DebugLogger, DEFAULT_LOG_FILTER};
pub use memory_profiler::{FixedMemoryProbe, MemoryProbe, MemorySampler, ProcessMemoryProbe};
pub use metrics::{
    average, format_capture_time, group_by_second, inter_sample_intervals, summarize, trim_edges,
    MetricsSummary, SecondBucket,
};
pub use tracer::{
    LogTracer, MeasurementUnit, RecordingTracer, SpanHandle, TraceRecord, Tracer,
    TransactionHandle, TransactionStatus,
};
