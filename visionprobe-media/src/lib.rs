//! # VisionProbe Media
//!
//! Camera capture collaborators, the inference model collaborator and the
//! frame-paced scheduler that feeds frames from one to the other while
//! recording completion timestamps.

#![warn(clippy::all)]

pub mod capture;
pub mod inference;
pub mod scheduler;
pub mod tracks;

// Re-export main types
pub use capture::{
    CaptureBackend, DeviceId, FrameSource, MediaStream, MockCaptureBackend, MockFailure,
    MockStream, RecordOptions,
};
pub use inference::{first_confident, BoundingBox, Detection, Predictor, StaticPredictor};
pub use scheduler::{
    CancelToken, FrameClock, InferenceScheduler, IntervalFrameClock, LoopShutdown, SampleEvent,
    SampleLog,
    SchedulerConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_FRAME_INTERVAL,
};
pub use tracks::{TrackState, VideoFrame, VideoTrack};
