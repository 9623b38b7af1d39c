//! Frame-paced inference scheduling
//!
//! The scheduler runs one cooperative loop per recording: wait for the next
//! frame tick, hand the presented frame to the predictor, wait for its
//! result, record the completion time, repeat. There is never more than one
//! prediction in flight.
//!
//! Cancellation is observed at tick boundaries and again before a settled
//! result is committed, so a prediction that resolves after [`CancelToken::cancel`]
//! neither records a sample nor schedules another tick.

use crate::capture::FrameSource;
use crate::inference::{first_confident, Detection, Predictor};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use visionprobe_core::{Clock, ProbeError, ProbeResult, SystemClock};

/// Score a detection needs to count as a confident sample
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// One display refresh at roughly 60 Hz
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Signal the loop waits on between predictions
#[async_trait]
pub trait FrameClock: Send {
    /// Resolve at the next frame presentation
    async fn next_frame(&mut self);
}

/// Frame clock ticking at a fixed period
///
/// Ticks missed while a prediction was running are not replayed; the next
/// tick is one full period after the late one.
pub struct IntervalFrameClock {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalFrameClock {
    /// Create a clock with the given tick period
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }
}

#[async_trait]
impl FrameClock for IntervalFrameClock {
    async fn next_frame(&mut self) {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
    }
}

/// Cooperative cancellation flag shared between a scheduler and its loop
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Completion timestamps collected during one recording
///
/// Both sequences are non-decreasing: a timestamp earlier than the previous
/// one (wall clock stepped back) is clamped to the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleLog {
    all: Vec<i64>,
    confident: Vec<i64>,
}

impl SampleLog {
    /// Record an inference completion, returning the stored timestamp
    pub fn record(&mut self, timestamp: i64) -> i64 {
        let timestamp = clamp_to_last(&self.all, timestamp);
        self.all.push(timestamp);
        timestamp
    }

    /// Record a completion whose top result met the confidence threshold
    pub fn record_confident(&mut self, timestamp: i64) -> i64 {
        let timestamp = clamp_to_last(&self.confident, timestamp);
        self.confident.push(timestamp);
        timestamp
    }

    /// Every completion
    pub fn all_samples(&self) -> &[i64] {
        &self.all
    }

    /// Confident completions only
    pub fn confident_samples(&self) -> &[i64] {
        &self.confident
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Reset both sequences
    pub fn clear(&mut self) {
        self.all.clear();
        self.confident.clear();
    }
}

fn clamp_to_last(samples: &[i64], timestamp: i64) -> i64 {
    samples.last().map_or(timestamp, |&last| timestamp.max(last))
}

/// A confident result surfaced to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEvent {
    /// Completion time in epoch milliseconds
    pub timestamp: i64,
    /// First detection meeting the threshold
    pub detection: Detection,
}

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Inclusive score threshold for confident samples
    pub confidence_threshold: f32,
    /// Tick period of the default frame clock
    pub frame_interval: Duration,
    /// Consecutive prediction failures tolerated before the loop stalls
    pub retry_limit: u32,
    /// How long `stop` waits for an in-flight prediction before aborting
    pub stop_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            retry_limit: 0,
            stop_timeout: Duration::from_secs(5),
        }
    }
}

type StallHandler = Arc<dyn Fn(&ProbeError) + Send + Sync>;
type SourceEndedHandler = Arc<dyn Fn() + Send + Sync>;

/// What [`InferenceScheduler::stop`] hands back
#[derive(Debug)]
pub struct LoopShutdown {
    /// Samples committed before the loop exited
    pub samples: SampleLog,
    /// Set when the loop outlived the stop timeout and was aborted
    pub aborted: Option<ProbeError>,
}

impl LoopShutdown {
    /// Whether the loop had to be aborted
    pub fn was_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Drives the per-frame prediction loop
pub struct InferenceScheduler {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    token: Option<CancelToken>,
    samples: Arc<Mutex<SampleLog>>,
    source_ended: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<Arc<ProbeError>>>>,
    on_stall: Option<StallHandler>,
    on_source_ended: Option<SourceEndedHandler>,
    task: Option<JoinHandle<()>>,
}

impl InferenceScheduler {
    /// Scheduler stamping samples with the system clock
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Scheduler stamping samples with `clock`
    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            running: Arc::new(AtomicBool::new(false)),
            token: None,
            samples: Arc::new(Mutex::new(SampleLog::default())),
            source_ended: Arc::new(AtomicBool::new(false)),
            last_error: Arc::new(Mutex::new(None)),
            on_stall: None,
            on_source_ended: None,
            task: None,
        }
    }

    /// Called once when the loop gives up after repeated prediction failures
    pub fn set_stall_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ProbeError) + Send + Sync + 'static,
    {
        self.on_stall = Some(Arc::new(handler));
    }

    /// Called once when the frame source reports it has ended for good
    pub fn set_source_ended_handler<F>(&mut self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_source_ended = Some(Arc::new(handler));
    }

    /// Start the loop with the default interval frame clock
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(
        &mut self,
        frames: Arc<dyn FrameSource>,
        predictor: Arc<dyn Predictor>,
        on_sample: F,
    ) -> ProbeResult<CancelToken>
    where
        F: Fn(SampleEvent) + Send + Sync + 'static,
    {
        let frame_clock = Box::new(IntervalFrameClock::new(self.config.frame_interval));
        self.start_with_frame_clock(frames, predictor, frame_clock, on_sample)
    }

    /// Start the loop paced by a caller-supplied frame clock
    pub fn start_with_frame_clock<F>(
        &mut self,
        frames: Arc<dyn FrameSource>,
        predictor: Arc<dyn Predictor>,
        frame_clock: Box<dyn FrameClock>,
        on_sample: F,
    ) -> ProbeResult<CancelToken>
    where
        F: Fn(SampleEvent) + Send + Sync + 'static,
    {
        if self.token.is_some() {
            return Err(ProbeError::InvalidState {
                expected: "stopped scheduler".to_string(),
                actual: "running scheduler".to_string(),
            });
        }

        let token = CancelToken::new();
        self.samples.lock().clear();
        *self.last_error.lock() = None;
        self.source_ended.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let inference_loop = InferenceLoop {
            token: token.clone(),
            frames,
            predictor,
            clock: self.clock.clone(),
            samples: self.samples.clone(),
            last_error: self.last_error.clone(),
            running: self.running.clone(),
            source_ended: self.source_ended.clone(),
            on_stall: self.on_stall.clone(),
            on_source_ended: self.on_source_ended.clone(),
            confidence_threshold: self.config.confidence_threshold,
            retry_limit: self.config.retry_limit,
        };

        info!(
            model = inference_loop.predictor.name(),
            threshold = self.config.confidence_threshold,
            "starting inference loop"
        );
        self.task = Some(tokio::spawn(inference_loop.run(frame_clock, on_sample)));
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Cancel the loop, wait for it to exit and hand back the collected samples
    ///
    /// A loop still inside a prediction after `stop_timeout` is aborted; the
    /// samples committed so far are kept and the timeout is reported in
    /// [`LoopShutdown::aborted`]. The internal sample log is left empty.
    pub async fn stop(&mut self, token: &CancelToken) -> ProbeResult<LoopShutdown> {
        let current = self.token.as_ref().ok_or_else(|| ProbeError::InvalidState {
            expected: "running scheduler".to_string(),
            actual: "stopped scheduler".to_string(),
        })?;
        if !current.same_as(token) {
            return Err(ProbeError::InvalidOperation {
                operation: "stop with a token from another run".to_string(),
            });
        }

        token.cancel();
        let mut aborted = None;
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.config.stop_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_error)) => warn!(%join_error, "inference loop ended abnormally"),
                Err(_) => {
                    warn!(
                        timeout = ?self.config.stop_timeout,
                        "prediction still in flight, aborting inference loop"
                    );
                    task.abort();
                    aborted = Some(ProbeError::Timeout {
                        operation: "stop inference loop".to_string(),
                        duration: self.config.stop_timeout,
                    });
                }
            }
        }

        self.token = None;
        self.running.store(false, Ordering::SeqCst);
        let samples = std::mem::take(&mut *self.samples.lock());
        debug!(
            samples = samples.all_samples().len(),
            confident = samples.confident_samples().len(),
            aborted = aborted.is_some(),
            "inference loop stopped"
        );
        Ok(LoopShutdown { samples, aborted })
    }

    /// Whether the loop is still scheduling ticks
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the loop gave up on prediction errors while not cancelled
    pub fn is_stalled(&self) -> bool {
        self.token.is_some() && !self.is_running() && self.last_error.lock().is_some()
    }

    /// Display text of the error that stalled the loop, if any
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().as_ref().map(ToString::to_string)
    }

    /// Whether the loop exited because the frame source ended
    pub fn is_source_ended(&self) -> bool {
        self.source_ended.load(Ordering::SeqCst)
    }

    /// Number of completions recorded so far in the current run
    pub fn sample_count(&self) -> usize {
        self.samples.lock().all_samples().len()
    }
}

impl Drop for InferenceScheduler {
    fn drop(&mut self) {
        if let Some(token) = &self.token {
            token.cancel();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct InferenceLoop {
    token: CancelToken,
    frames: Arc<dyn FrameSource>,
    predictor: Arc<dyn Predictor>,
    clock: Arc<dyn Clock>,
    samples: Arc<Mutex<SampleLog>>,
    last_error: Arc<Mutex<Option<Arc<ProbeError>>>>,
    running: Arc<AtomicBool>,
    source_ended: Arc<AtomicBool>,
    on_stall: Option<StallHandler>,
    on_source_ended: Option<SourceEndedHandler>,
    confidence_threshold: f32,
    retry_limit: u32,
}

impl InferenceLoop {
    async fn run<F>(self, mut frame_clock: Box<dyn FrameClock>, on_sample: F)
    where
        F: Fn(SampleEvent) + Send + Sync + 'static,
    {
        let mut consecutive_failures = 0u32;

        loop {
            if self.token.is_cancelled() {
                break;
            }
            frame_clock.next_frame().await;
            if self.token.is_cancelled() {
                break;
            }

            let Some(frame) = self.frames.current_frame() else {
                if self.frames.is_ended() {
                    warn!(
                        model = self.predictor.name(),
                        "frame source ended, inference loop exiting"
                    );
                    self.source_ended.store(true, Ordering::SeqCst);
                    self.running.store(false, Ordering::SeqCst);
                    if let Some(on_source_ended) = &self.on_source_ended {
                        on_source_ended();
                    }
                    break;
                }
                trace!("no frame presented, waiting for next tick");
                continue;
            };

            match self.predictor.predict(&frame).await {
                Ok(detections) => {
                    consecutive_failures = 0;
                    let surfaced = {
                        let mut samples = self.samples.lock();
                        if self.token.is_cancelled() {
                            debug!("discarding prediction settled after cancellation");
                            break;
                        }
                        let timestamp = samples.record(self.clock.now_millis());
                        first_confident(detections, self.confidence_threshold).map(|detection| {
                            samples.record_confident(timestamp);
                            SampleEvent {
                                timestamp,
                                detection,
                            }
                        })
                    };
                    if let Some(event) = surfaced {
                        on_sample(event);
                    }
                }
                Err(prediction_error) => {
                    if self.token.is_cancelled() {
                        break;
                    }
                    consecutive_failures += 1;
                    if consecutive_failures > self.retry_limit {
                        error!(
                            model = self.predictor.name(),
                            error = %prediction_error,
                            failures = consecutive_failures,
                            "prediction failed, inference loop stalled"
                        );
                        let prediction_error = Arc::new(prediction_error);
                        *self.last_error.lock() = Some(prediction_error.clone());
                        self.running.store(false, Ordering::SeqCst);
                        if let Some(on_stall) = &self.on_stall {
                            on_stall(prediction_error.as_ref());
                        }
                        break;
                    }
                    warn!(
                        model = self.predictor.name(),
                        error = %prediction_error,
                        attempt = consecutive_failures,
                        "prediction failed, retrying on next frame"
                    );
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        debug!("inference loop exited");
    }
}
