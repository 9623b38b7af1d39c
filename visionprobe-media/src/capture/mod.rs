//! Camera capture collaborators
//!
//! The session never talks to a camera API directly. It goes through
//! [`CaptureBackend`] to find a device and open a stream, and through the
//! returned [`MediaStream`] to record, read frames and release the device.

pub mod mock;

use crate::tracks::{VideoFrame, VideoTrack};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use visionprobe_core::{DeviceCapability, ProbeResult, StreamConstraints};

pub use mock::{MockCaptureBackend, MockFailure, MockStream};

/// Opaque capture device identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Create a device id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recorder settings for a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOptions {
    /// Container and codec, e.g. `video/webm;codecs=vp8`
    pub mime_type: String,
    /// Target bit rate; collaborator default when unset
    pub bits_per_second: Option<u64>,
}

/// Platform capture backend
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// List the video input devices currently visible
    async fn enumerate_video_devices(&self) -> ProbeResult<Vec<DeviceId>>;

    /// Read the capability bounds of one device
    ///
    /// Fails with `DeviceUnavailable` when the device is gone or access
    /// was not granted.
    async fn get_capability(&self, device: &DeviceId) -> ProbeResult<DeviceCapability>;

    /// Open a stream honoring `constraints` where the device can
    ///
    /// Fails with `PermissionDenied` or `ConstraintsNotSatisfiable`.
    async fn open_stream(&self, constraints: &StreamConstraints)
        -> ProbeResult<Arc<dyn MediaStream>>;
}

/// An open camera stream exclusively owned by one session
pub trait MediaStream: Send + Sync {
    /// Stream identifier
    fn id(&self) -> &str;

    /// Video tracks carried by the stream
    fn video_tracks(&self) -> Vec<VideoTrack>;

    /// Frame source for the inference loop
    fn frame_source(&self) -> Arc<dyn FrameSource>;

    /// Start recording the stream
    fn record(&self, options: &RecordOptions) -> ProbeResult<()>;

    /// Stop every track and the recorder, releasing the device
    fn stop_tracks(&self) -> ProbeResult<()>;

    /// Whether any track is still live
    fn is_active(&self) -> bool {
        self.video_tracks().iter().any(VideoTrack::is_live)
    }
}

/// Supplies the frame currently presented by a stream
pub trait FrameSource: Send + Sync {
    /// Latest frame, or `None` when nothing is being presented
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Whether the source will never present another frame
    fn is_ended(&self) -> bool {
        false
    }
}
