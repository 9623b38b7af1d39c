//! Event system for session lifecycle and inference events

use crate::session::{SessionReport, SessionState};
use crate::Detection;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of each session's event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events published by a recording session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session moved between states
    StateChanged {
        /// Previous state
        from: SessionState,
        /// New state
        to: SessionState,
    },
    /// A prediction produced a result above the confidence threshold
    Detection {
        /// Completion time in epoch milliseconds
        timestamp: i64,
        /// The first confident result
        detection: Detection,
    },
    /// The inference loop gave up after repeated prediction failures
    InferenceStalled {
        /// Display text of the last error
        error: String,
    },
    /// The media stream failed while recording, or its frame source ended
    StreamFailed {
        /// Failure reason
        reason: String,
    },
    /// Final report, published once when recording stops
    Report {
        /// The report
        report: Box<SessionReport>,
    },
}

impl SessionEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::Detection { .. } => "detection",
            SessionEvent::InferenceStalled { .. } => "inference_stalled",
            SessionEvent::StreamFailed { .. } => "stream_failed",
            SessionEvent::Report { .. } => "report",
        }
    }

    /// Check if this is an error event
    pub fn is_error_event(&self) -> bool {
        matches!(
            self,
            SessionEvent::InferenceStalled { .. } | SessionEvent::StreamFailed { .. }
        )
    }
}

/// Stream of session events for async iteration
///
/// Slow readers skip events they fell behind on rather than blocking the
/// session.
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl EventStream {
    /// Wrap a broadcast receiver
    pub fn new(receiver: broadcast::Receiver<SessionEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next event, or `None` once the session is gone
    pub async fn next(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Get the next event without waiting
    pub fn try_next(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "event stream lagged");
                }
                Err(_) => return None,
            }
        }
    }

    /// Get the next event whose type is one of `event_types`
    pub async fn next_of(&mut self, event_types: &[&str]) -> Option<SessionEvent> {
        loop {
            let event = self.next().await?;
            if event_types.contains(&event.event_type()) {
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_stream_basic() {
        let (tx, rx) = broadcast::channel(4);
        let mut events = EventStream::new(rx);

        tx.send(SessionEvent::StreamFailed {
            reason: "track ended".to_string(),
        })
        .unwrap();

        let event = events.next().await.unwrap();
        assert_eq!(event.event_type(), "stream_failed");
        assert!(event.is_error_event());
        assert!(events.try_next().is_none());

        drop(tx);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_next_of_skips_other_types() {
        let (tx, rx) = broadcast::channel(8);
        let mut events = EventStream::new(rx);

        tx.send(SessionEvent::StateChanged {
            from: SessionState::Idle,
            to: SessionState::NegotiatingCapability,
        })
        .unwrap();
        tx.send(SessionEvent::InferenceStalled {
            error: "model exploded".to_string(),
        })
        .unwrap();

        let event = events.next_of(&["inference_stalled"]).await.unwrap();
        assert!(matches!(event, SessionEvent::InferenceStalled { .. }));
    }

    #[tokio::test]
    async fn test_lagged_reader_keeps_newest() {
        let (tx, rx) = broadcast::channel(2);
        let mut events = EventStream::new(rx);
        for i in 0..5 {
            tx.send(SessionEvent::StreamFailed {
                reason: i.to_string(),
            })
            .unwrap();
        }
        match events.try_next() {
            Some(SessionEvent::StreamFailed { reason }) => assert_eq!(reason, "3"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
