//! Integration tests for the inference scheduler
//!
//! Covers sample collection, the one-in-flight guarantee, cancellation
//! races, predictor failures and teardown timeouts.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_test::assert_ok;
use visionprobe_core::{FacingMode, ProbeError, ProbeResult, StreamConstraints};
use visionprobe_media::*;

fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        frame_interval: Duration::from_millis(1),
        stop_timeout: Duration::from_millis(500),
        ..SchedulerConfig::default()
    }
}

async fn open_frames() -> (MockCaptureBackend, Arc<dyn MediaStream>) {
    let backend = MockCaptureBackend::new();
    let constraints = StreamConstraints {
        device_id: None,
        width: Some(32),
        height: Some(24),
        frame_rate: Some(30),
        facing: FacingMode::Environment,
    };
    let stream = backend
        .open_stream(&constraints)
        .await
        .ok()
        .expect("mock stream should open");
    (backend, stream)
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Counts calls and the highest number of overlapping predictions
struct CountingPredictor {
    detections: Vec<Detection>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl CountingPredictor {
    fn new(detections: Vec<Detection>, delay: Duration) -> Self {
        Self {
            detections,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl Predictor for CountingPredictor {
    fn name(&self) -> &str {
        "counting"
    }

    async fn predict(&self, _frame: &VideoFrame) -> ProbeResult<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }
}

/// Blocks inside `predict` until released
struct GatedPredictor {
    entered: Notify,
    release: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl Predictor for GatedPredictor {
    fn name(&self) -> &str {
        "gated"
    }

    async fn predict(&self, _frame: &VideoFrame) -> ProbeResult<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(vec![Detection::new("person", 0.95)])
    }
}

/// Fails the first `failures` calls
struct FlakyPredictor {
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl Predictor for FlakyPredictor {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn predict(&self, _frame: &VideoFrame) -> ProbeResult<Vec<Detection>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ProbeError::Inference {
                model: "flaky".to_string(),
                reason: format!("backend error on call {}", call),
            });
        }
        Ok(vec![Detection::new("cat", 0.8)])
    }
}

/// Never resolves; counts predictions whose future was dropped
#[derive(Default)]
struct HangingPredictor {
    released: Arc<AtomicUsize>,
}

struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Predictor for HangingPredictor {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn predict(&self, _frame: &VideoFrame) -> ProbeResult<Vec<Detection>> {
        let _guard = ReleaseGuard(self.released.clone());
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

// ============================================================================
// SAMPLE COLLECTION
// ============================================================================

#[tokio::test]
async fn test_collects_all_and_confident_samples() {
    let (_backend, stream) = open_frames().await;
    let predictor = Arc::new(CountingPredictor::new(
        vec![Detection::new("person", 0.9), Detection::new("chair", 0.3)],
        Duration::from_millis(1),
    ));
    let surfaced = Arc::new(Mutex::new(Vec::new()));

    let mut scheduler = InferenceScheduler::new(test_config());
    let sink = surfaced.clone();
    let token = assert_ok!(scheduler.start(stream.frame_source(), predictor.clone(), move |e| {
        sink.lock().push(e)
    }));
    assert!(scheduler.is_running());

    wait_until(|| scheduler.sample_count() >= 5).await;
    let shutdown = assert_ok!(scheduler.stop(&token).await);
    assert!(!shutdown.was_aborted());
    let samples = shutdown.samples;
    assert!(!scheduler.is_running());

    assert!(samples.all_samples().len() >= 5);
    assert_eq!(samples.all_samples(), samples.confident_samples());
    assert!(samples.all_samples().windows(2).all(|w| w[0] <= w[1]));

    let surfaced = surfaced.lock();
    assert_eq!(surfaced.len(), samples.confident_samples().len());
    assert!(surfaced.iter().all(|e| e.detection.label == "person"));
    assert_eq!(scheduler.sample_count(), 0);
}

#[tokio::test]
async fn test_low_scores_are_not_confident() {
    let (_backend, stream) = open_frames().await;
    let predictor = Arc::new(CountingPredictor::new(
        vec![Detection::new("chair", 0.3)],
        Duration::ZERO,
    ));
    let surfaced = Arc::new(AtomicUsize::new(0));

    let mut scheduler = InferenceScheduler::new(test_config());
    let counter = surfaced.clone();
    let token = scheduler
        .start(stream.frame_source(), predictor, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    wait_until(|| scheduler.sample_count() >= 3).await;
    let samples = scheduler.stop(&token).await.unwrap().samples;

    assert!(!samples.all_samples().is_empty());
    assert!(samples.confident_samples().is_empty());
    assert_eq!(surfaced.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_never_more_than_one_prediction_in_flight() {
    let (_backend, stream) = open_frames().await;
    let predictor = Arc::new(CountingPredictor::new(
        vec![Detection::new("person", 0.9)],
        Duration::from_millis(4),
    ));

    let mut scheduler = InferenceScheduler::new(test_config());
    let token = scheduler
        .start(stream.frame_source(), predictor.clone(), |_| {})
        .unwrap();
    wait_until(|| predictor.calls.load(Ordering::SeqCst) >= 5).await;
    scheduler.stop(&token).await.unwrap();

    assert_eq!(predictor.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ended_stream_exits_loop_without_prediction() {
    let (_backend, stream) = open_frames().await;
    stream.stop_tracks().unwrap();
    let predictor = Arc::new(CountingPredictor::new(Vec::new(), Duration::ZERO));
    let ended = Arc::new(AtomicUsize::new(0));

    let mut scheduler = InferenceScheduler::new(test_config());
    let counter = ended.clone();
    scheduler.set_source_ended_handler(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let token = scheduler
        .start(stream.frame_source(), predictor.clone(), |_| {})
        .unwrap();

    wait_until(|| !scheduler.is_running()).await;
    assert!(scheduler.is_source_ended());
    assert!(!scheduler.is_stalled());
    assert_eq!(ended.load(Ordering::SeqCst), 1);

    let samples = scheduler.stop(&token).await.unwrap().samples;
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
    assert!(samples.is_empty());
}

#[tokio::test]
async fn test_source_ending_mid_recording_is_noticed() {
    let (backend, stream) = open_frames().await;
    let predictor = Arc::new(CountingPredictor::new(
        vec![Detection::new("person", 0.9)],
        Duration::ZERO,
    ));
    let ended = Arc::new(AtomicBool::new(false));

    let mut scheduler = InferenceScheduler::new(test_config());
    let flag = ended.clone();
    scheduler.set_source_ended_handler(move || flag.store(true, Ordering::SeqCst));
    let token = scheduler
        .start(stream.frame_source(), predictor, |_| {})
        .unwrap();

    wait_until(|| scheduler.sample_count() >= 2).await;
    backend.opened_streams()[0].simulate_disconnect();
    wait_until(|| ended.load(Ordering::SeqCst)).await;
    assert!(!scheduler.is_running());

    let samples = scheduler.stop(&token).await.unwrap().samples;
    assert!(samples.all_samples().len() >= 2);
}

// ============================================================================
// CANCELLATION
// ============================================================================

#[tokio::test]
async fn test_result_settling_after_cancel_is_discarded() {
    let (_backend, stream) = open_frames().await;
    let predictor = Arc::new(GatedPredictor {
        entered: Notify::new(),
        release: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let surfaced = Arc::new(AtomicUsize::new(0));

    let mut scheduler = InferenceScheduler::new(test_config());
    let counter = surfaced.clone();
    let token = scheduler
        .start(stream.frame_source(), predictor.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    predictor.entered.notified().await;
    token.cancel();
    predictor.release.notify_one();

    let samples = scheduler.stop(&token).await.unwrap().samples;
    assert!(samples.all_samples().is_empty());
    assert!(samples.confident_samples().is_empty());
    assert_eq!(surfaced.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_aborts_hung_prediction_after_timeout() {
    let (_backend, stream) = open_frames().await;
    let config = SchedulerConfig {
        stop_timeout: Duration::from_millis(20),
        ..test_config()
    };

    let predictor = Arc::new(HangingPredictor::default());

    let mut scheduler = InferenceScheduler::new(config);
    let token = scheduler
        .start(stream.frame_source(), predictor.clone(), |_| {})
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let shutdown = tokio::time::timeout(Duration::from_secs(2), scheduler.stop(&token))
        .await
        .expect("stop should not wait for the hung prediction")
        .unwrap();
    assert!(shutdown.samples.is_empty());
    assert!(!scheduler.is_running());

    let aborted = shutdown.aborted.expect("abort should be reported");
    assert_eq!(aborted.error_code(), "TIMEOUT");
    assert!(aborted.to_string().contains("stop inference loop"));
    wait_until(|| predictor.released.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test]
async fn test_drop_aborts_hung_loop() {
    let (_backend, stream) = open_frames().await;
    let predictor = Arc::new(HangingPredictor::default());

    let mut scheduler = InferenceScheduler::new(test_config());
    let token = scheduler
        .start(stream.frame_source(), predictor.clone(), |_| {})
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(predictor.released.load(Ordering::SeqCst), 0);

    drop(scheduler);
    assert!(token.is_cancelled());
    wait_until(|| predictor.released.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test]
async fn test_start_twice_and_foreign_token_are_rejected() {
    let (_backend, stream) = open_frames().await;
    let predictor = Arc::new(CountingPredictor::new(Vec::new(), Duration::ZERO));

    let mut scheduler = InferenceScheduler::new(test_config());
    let token = scheduler
        .start(stream.frame_source(), predictor.clone(), |_| {})
        .unwrap();

    let again = scheduler.start(stream.frame_source(), predictor, |_| {});
    assert_eq!(again.unwrap_err().error_code(), "INVALID_STATE");

    let foreign = scheduler.stop(&CancelToken::new()).await.unwrap_err();
    assert_eq!(foreign.error_code(), "INVALID_OPERATION");
    assert!(scheduler.is_running());

    assert_ok!(scheduler.stop(&token).await);
}

// ============================================================================
// PREDICTOR FAILURES
// ============================================================================

#[tokio::test]
async fn test_failure_stalls_loop_without_retry() {
    let (_backend, stream) = open_frames().await;
    let predictor = Arc::new(FlakyPredictor {
        failures: usize::MAX,
        calls: AtomicUsize::new(0),
    });
    let stalls = Arc::new(AtomicUsize::new(0));

    let mut scheduler = InferenceScheduler::new(test_config());
    let counter = stalls.clone();
    scheduler.set_stall_handler(move |error| {
        assert_eq!(error.error_code(), "INFERENCE_ERROR");
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let token = scheduler
        .start(stream.frame_source(), predictor.clone(), |_| {})
        .unwrap();

    wait_until(|| stalls.load(Ordering::SeqCst) == 1).await;
    assert!(!scheduler.is_running());
    assert!(scheduler.is_stalled());
    assert!(scheduler.last_error().unwrap().contains("backend error"));
    assert_eq!(stalls.load(Ordering::SeqCst), 1);
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);

    let samples = scheduler.stop(&token).await.unwrap().samples;
    assert!(samples.is_empty());
}

#[tokio::test]
async fn test_retry_limit_tolerates_transient_failures() {
    let (_backend, stream) = open_frames().await;
    let predictor = Arc::new(FlakyPredictor {
        failures: 2,
        calls: AtomicUsize::new(0),
    });
    let config = SchedulerConfig {
        retry_limit: 2,
        ..test_config()
    };

    let mut scheduler = InferenceScheduler::new(config);
    let token = scheduler
        .start(stream.frame_source(), predictor, |_| {})
        .unwrap();

    wait_until(|| scheduler.sample_count() >= 3).await;
    assert!(!scheduler.is_stalled());
    let samples = scheduler.stop(&token).await.unwrap().samples;
    assert_eq!(samples.all_samples().len(), samples.confident_samples().len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stall_state_is_visible_when_handler_runs() {
    let (_backend, stream) = open_frames().await;
    let predictor = Arc::new(FlakyPredictor {
        failures: usize::MAX,
        calls: AtomicUsize::new(0),
    });
    let (notify_tx, mut notify_rx) = tokio::sync::mpsc::unbounded_channel();

    let mut scheduler = InferenceScheduler::new(test_config());
    scheduler.set_stall_handler(move |_| {
        let _ = notify_tx.send(());
        // Hold the loop inside the handler while the listener reads state
        std::thread::sleep(Duration::from_millis(100));
    });
    let token = scheduler
        .start(stream.frame_source(), predictor, |_| {})
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), notify_rx.recv())
        .await
        .expect("stall handler should run")
        .expect("handler channel open");
    assert!(scheduler.is_stalled());
    assert!(!scheduler.is_running());
    assert!(scheduler.last_error().unwrap().contains("backend error"));

    assert_ok!(scheduler.stop(&token).await);
}
