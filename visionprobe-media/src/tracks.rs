//! Track abstractions and video frame types

use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Video frame representation
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Raw frame data
    pub data: Bytes,
    /// Capture timestamp in epoch milliseconds
    pub timestamp: i64,
    /// Monotonic frame counter within the stream
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a new video frame
    pub fn new(width: u32, height: u32, data: Bytes, timestamp: i64, sequence: u64) -> Self {
        Self {
            width,
            height,
            data,
            timestamp,
            sequence,
        }
    }
}

/// Lifecycle of a capture track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackState {
    /// Track is delivering frames
    Live,
    /// Track was stopped and released its device
    Ended,
}

/// A single video track of a media stream
///
/// Clones share state, so stopping any clone ends the track everywhere.
#[derive(Debug, Clone)]
pub struct VideoTrack {
    id: String,
    label: String,
    state: Arc<RwLock<TrackState>>,
}

impl VideoTrack {
    /// Create a new live video track
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            state: Arc::new(RwLock::new(TrackState::Live)),
        }
    }

    /// Get track ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Device label of the track
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current state
    pub fn state(&self) -> TrackState {
        *self.state.read()
    }

    /// Whether the track still delivers frames
    pub fn is_live(&self) -> bool {
        self.state() == TrackState::Live
    }

    /// End the track; stopping an ended track is a no-op
    pub fn stop(&self) {
        let mut state = self.state.write();
        if *state == TrackState::Live {
            tracing::debug!(track_id = %self.id, "stopping video track");
            *state = TrackState::Ended;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_stop_is_shared_and_idempotent() {
        let track = VideoTrack::new("track-1", "Mock Camera");
        let clone = track.clone();
        assert!(track.is_live());

        clone.stop();
        assert_eq!(track.state(), TrackState::Ended);
        track.stop();
        assert!(!clone.is_live());
    }
}
