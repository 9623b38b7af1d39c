//! In-process capture backend for tests, demos and headless hosts

use super::{CaptureBackend, DeviceId, FrameSource, MediaStream, RecordOptions};
use crate::tracks::{TrackState, VideoFrame, VideoTrack};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use visionprobe_core::{
    Clock, DeviceCapability, ProbeError, ProbeResult, StreamConstraints, SystemClock,
};

/// Failure a [`MockCaptureBackend`] can be told to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Capability lookup fails with `DeviceUnavailable`
    DeviceUnavailable,
    /// Opening the stream fails with `PermissionDenied`
    PermissionDenied,
    /// Opening the stream fails with `ConstraintsNotSatisfiable`
    ConstraintsNotSatisfiable,
    /// Stopping tracks reports an error (tracks still end)
    StopTracks,
}

/// Mock capture backend with a configurable device list and capability
pub struct MockCaptureBackend {
    devices: Vec<DeviceId>,
    capability: DeviceCapability,
    failure: Option<MockFailure>,
    clock: Arc<dyn Clock>,
    opened: RwLock<Vec<Arc<MockStream>>>,
    last_constraints: RwLock<Option<StreamConstraints>>,
}

impl MockCaptureBackend {
    /// One 1080p camera reporting 30 fps
    pub fn new() -> Self {
        Self {
            devices: vec![DeviceId::new("mock_camera_0")],
            capability: DeviceCapability::new(1920, 1080, 30.0),
            failure: None,
            clock: Arc::new(SystemClock),
            opened: RwLock::new(Vec::new()),
            last_constraints: RwLock::new(None),
        }
    }

    /// Report this capability for every device
    pub fn with_capability(mut self, capability: DeviceCapability) -> Self {
        self.capability = capability;
        self
    }

    /// Replace the device list
    pub fn with_devices(mut self, devices: Vec<DeviceId>) -> Self {
        self.devices = devices;
        self
    }

    /// Inject a failure
    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Stamp frames with this clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Streams opened so far
    pub fn opened_streams(&self) -> Vec<Arc<MockStream>> {
        self.opened.read().clone()
    }

    /// Constraints of the most recent open request
    pub fn last_constraints(&self) -> Option<StreamConstraints> {
        self.last_constraints.read().clone()
    }
}

impl Default for MockCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for MockCaptureBackend {
    async fn enumerate_video_devices(&self) -> ProbeResult<Vec<DeviceId>> {
        Ok(self.devices.clone())
    }

    async fn get_capability(&self, device: &DeviceId) -> ProbeResult<DeviceCapability> {
        if self.failure == Some(MockFailure::DeviceUnavailable) || !self.devices.contains(device)
        {
            return Err(ProbeError::DeviceUnavailable {
                reason: format!("device {} is not connected", device),
            });
        }
        Ok(self.capability)
    }

    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> ProbeResult<Arc<dyn MediaStream>> {
        *self.last_constraints.write() = Some(constraints.clone());

        match self.failure {
            Some(MockFailure::PermissionDenied) => {
                return Err(ProbeError::PermissionDenied {
                    operation: "open camera stream".to_string(),
                })
            }
            Some(MockFailure::ConstraintsNotSatisfiable) => {
                return Err(ProbeError::ConstraintsNotSatisfiable {
                    constraint: format!("{:?}", constraints),
                })
            }
            _ => {}
        }

        let width = constraints
            .width
            .or(self.capability.max_width)
            .unwrap_or(640);
        let height = constraints
            .height
            .or(self.capability.max_height)
            .unwrap_or(480);
        let stream = Arc::new(MockStream::new(
            width,
            height,
            self.clock.clone(),
            self.failure == Some(MockFailure::StopTracks),
        ));

        info!(stream_id = %stream.id(), width, height, "opened mock camera stream");
        self.opened.write().push(stream.clone());
        Ok(stream as Arc<dyn MediaStream>)
    }
}

/// Stream produced by [`MockCaptureBackend`]
pub struct MockStream {
    id: String,
    track: VideoTrack,
    frames: Arc<MockFrameSource>,
    recording: RwLock<Option<RecordOptions>>,
    stop_calls: AtomicUsize,
    fail_stop: bool,
}

impl MockStream {
    fn new(width: u32, height: u32, clock: Arc<dyn Clock>, fail_stop: bool) -> Self {
        let id = Uuid::new_v4().to_string();
        let track = VideoTrack::new(format!("{}-video", id), "Mock Camera");
        let frames = Arc::new(MockFrameSource {
            track: track.clone(),
            width,
            height,
            clock,
            sequence: AtomicU64::new(0),
        });

        Self {
            id,
            track,
            frames,
            recording: RwLock::new(None),
            stop_calls: AtomicUsize::new(0),
            fail_stop,
        }
    }

    /// Options the stream is being recorded with, if recording
    pub fn recording(&self) -> Option<RecordOptions> {
        self.recording.read().clone()
    }

    /// How many times `stop_tracks` was called
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// End the track as if the camera was unplugged
    pub fn simulate_disconnect(&self) {
        self.track.stop();
    }
}

impl MediaStream for MockStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn video_tracks(&self) -> Vec<VideoTrack> {
        vec![self.track.clone()]
    }

    fn frame_source(&self) -> Arc<dyn FrameSource> {
        self.frames.clone()
    }

    fn record(&self, options: &RecordOptions) -> ProbeResult<()> {
        if !self.track.is_live() {
            return Err(ProbeError::StreamEnded {
                reason: "cannot record an ended stream".to_string(),
            });
        }
        debug!(stream_id = %self.id, ?options, "mock recorder started");
        *self.recording.write() = Some(options.clone());
        Ok(())
    }

    fn stop_tracks(&self) -> ProbeResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.track.stop();
        *self.recording.write() = None;

        if self.fail_stop {
            return Err(ProbeError::StreamEnded {
                reason: "recorder reported an error while stopping".to_string(),
            });
        }
        Ok(())
    }
}

/// Synthetic frames sized to the negotiated constraints
struct MockFrameSource {
    track: VideoTrack,
    width: u32,
    height: u32,
    clock: Arc<dyn Clock>,
    sequence: AtomicU64,
}

impl FrameSource for MockFrameSource {
    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.track.is_live() {
            return None;
        }

        // One byte per pixel is enough for predictors that only look at shape
        let data = Bytes::from(vec![0u8; (self.width as usize) * (self.height as usize)]);
        Some(VideoFrame::new(
            self.width,
            self.height,
            data,
            self.clock.now_millis(),
            self.sequence.fetch_add(1, Ordering::SeqCst),
        ))
    }

    fn is_ended(&self) -> bool {
        self.track.state() == TrackState::Ended
    }
}
