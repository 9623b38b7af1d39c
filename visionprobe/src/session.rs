//! Recording session state machine and builder

use crate::event::{EventStream, SessionEvent, EVENT_CHANNEL_CAPACITY};
use crate::{
    average, choose_configuration, format_capture_time, summarize, CancelToken, CaptureBackend,
    ChosenConfiguration, Clock, DeviceCapability, DeviceId, FacingMode, FrameRateTier,
    FrameSource, InferenceScheduler, LogTracer, MeasurementUnit, MediaStream, MemoryProbe,
    MemorySampler, MetricsSummary, Predictor, ProbeError, ProbeResult, ProcessMemoryProbe,
    RecordOptions, ResolutionTier, SampleLog, SessionConfig, SpanHandle, StreamConstraints,
    SystemClock, Tracer, TransactionHandle, TransactionStatus, VisionProbe,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Span wrapping model weight loading
pub const SPAN_MODEL_LOADING: &str = "Model loading";
/// Span wrapping stream acquisition
pub const SPAN_ASKING_PERMISSION: &str = "Asking Permission";
/// Capture span, open while recording
pub const SPAN_TAKE_VIDEO: &str = "Take Video";
/// Inference span, open while recording
pub const SPAN_MODEL_PREDICTION: &str = "Model prediction";

/// Lifecycle states of a [`RecordingSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    /// Not started, or returned here after a failed start
    Idle,
    /// Querying the capture backend for device capability
    NegotiatingCapability,
    /// Configuration chosen, stream not yet open
    Ready,
    /// Stream open and inference loop running
    Recording,
    /// Terminal
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::NegotiatingCapability => "negotiating_capability",
            SessionState::Ready => "ready",
            SessionState::Recording => "recording",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Everything reported when a recording stops
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Session id
    pub session_id: Uuid,
    /// Wall time the recording started
    pub started_at: DateTime<Utc>,
    /// Configuration the stream was opened with
    pub configuration: ChosenConfiguration,
    /// Predictor name
    pub model: String,
    /// Summary over every completion
    pub all_samples: MetricsSummary,
    /// Summary over confident completions
    pub confident_samples: MetricsSummary,
    /// Number of completions
    pub sample_count: usize,
    /// Number of confident completions
    pub confident_count: usize,
    /// Rounded mean of the memory readings in megabytes, `NaN` without readings
    pub average_memory_mb: f64,
    /// Time between record start and stop
    pub capture_duration: Duration,
    /// Status the transaction was finished with
    pub status: TransactionStatus,
    /// Teardown steps that failed, in order
    pub teardown_errors: Vec<String>,
}

struct ActiveRecording {
    transaction: TransactionHandle,
    capture_span: SpanHandle,
    prediction_span: SpanHandle,
    stream: Arc<dyn MediaStream>,
    frames: Option<Arc<dyn FrameSource>>,
    token: CancelToken,
    started: Instant,
    started_at: DateTime<Utc>,
}

/// One negotiate, record, aggregate and report lifecycle
///
/// A session owns its stream exclusively and is not resumable once
/// [`Stopped`](SessionState::Stopped).
pub struct RecordingSession {
    id: Uuid,
    config: SessionConfig,
    capture: Arc<dyn CaptureBackend>,
    predictor: Arc<dyn Predictor>,
    tracer: Arc<dyn Tracer>,
    state: SessionState,
    device: Option<DeviceId>,
    capability: Option<DeviceCapability>,
    configuration: ChosenConfiguration,
    scheduler: InferenceScheduler,
    memory: MemorySampler,
    model_loaded: bool,
    active: Option<ActiveRecording>,
    report: Option<SessionReport>,
    events: broadcast::Sender<SessionEvent>,
}

impl RecordingSession {
    /// Session id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Chosen capture configuration; empty until negotiated
    pub fn configuration(&self) -> ChosenConfiguration {
        self.configuration
    }

    /// Capability reported by the selected device
    pub fn capability(&self) -> Option<DeviceCapability> {
        self.capability
    }

    /// Selected device
    pub fn device(&self) -> Option<&DeviceId> {
        self.device.as_ref()
    }

    /// Subscribe to session events
    pub fn events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Report of the finished recording, once stopped
    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    /// Whether the inference loop gave up while the session still records
    pub fn is_stalled(&self) -> bool {
        self.state == SessionState::Recording && self.scheduler.is_stalled()
    }

    /// Error that stalled the inference loop, if any
    pub fn last_inference_error(&self) -> Option<String> {
        self.scheduler.last_error()
    }

    /// Completions recorded so far in the current recording
    pub fn sample_count(&self) -> usize {
        self.scheduler.sample_count()
    }

    /// Negotiate then record
    pub async fn start(&mut self) -> ProbeResult<()> {
        if self.state == SessionState::Idle {
            self.negotiate().await?;
        }
        self.record().await
    }

    /// Pick a device and derive the capture configuration from its capability
    ///
    /// On failure the session returns to `Idle`.
    pub async fn negotiate(&mut self) -> ProbeResult<ChosenConfiguration> {
        self.expect_state(SessionState::Idle)?;
        self.transition(SessionState::NegotiatingCapability);

        match self.query_device().await {
            Ok((device, capability)) => {
                let configuration = choose_configuration(&capability);
                info!(
                    session = %self.id,
                    device = %device,
                    resolution = ?configuration.resolution.map(|r| r.label),
                    frame_rate = ?configuration.frame_rate.map(|f| f.label),
                    bit_rate = ?configuration.bit_rate.map(|b| b.label),
                    "capability negotiated"
                );
                self.device = Some(device);
                self.capability = Some(capability);
                self.configuration = configuration;
                self.transition(SessionState::Ready);
                Ok(configuration)
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "capability negotiation failed");
                self.transition(SessionState::Idle);
                Err(e)
            }
        }
    }

    async fn query_device(&self) -> ProbeResult<(DeviceId, DeviceCapability)> {
        let device = self
            .capture
            .enumerate_video_devices()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProbeError::DeviceUnavailable {
                reason: "no video input devices".to_string(),
            })?;
        let capability = self.capture.get_capability(&device).await?;
        Ok((device, capability))
    }

    /// Replace the negotiated resolution; bit rate is re-derived
    pub fn override_resolution(
        &mut self,
        resolution: ResolutionTier,
    ) -> ProbeResult<ChosenConfiguration> {
        self.expect_state(SessionState::Ready)?;
        self.configuration = self.configuration.with_resolution(resolution);
        debug!(session = %self.id, resolution = resolution.label, "resolution overridden");
        Ok(self.configuration)
    }

    /// Replace the negotiated frame rate; bit rate is re-derived
    ///
    /// A rate above the device maximum is rejected.
    pub fn override_frame_rate(
        &mut self,
        frame_rate: FrameRateTier,
    ) -> ProbeResult<ChosenConfiguration> {
        self.expect_state(SessionState::Ready)?;
        if let Some(max) = self.capability.and_then(|c| c.max_frame_rate) {
            if f64::from(frame_rate.fps) > max {
                return Err(ProbeError::ConstraintsNotSatisfiable {
                    constraint: format!("frame rate {} above device maximum {}", frame_rate.fps, max),
                });
            }
        }
        self.configuration = self.configuration.with_frame_rate(frame_rate);
        debug!(session = %self.id, frame_rate = frame_rate.label, "frame rate overridden");
        Ok(self.configuration)
    }

    /// Open the stream, start recording and start the inference loop
    ///
    /// On failure everything acquired so far is released, the transaction
    /// is finished as cancelled and the session returns to `Idle`.
    pub async fn record(&mut self) -> ProbeResult<()> {
        self.expect_state(SessionState::Ready)?;

        let transaction = self
            .tracer
            .start_transaction(&self.config.transaction_name, &self.config.operation);

        match self.begin_recording(&transaction).await {
            Ok((stream, frames, token)) => {
                let capture_span = self.tracer.start_span(&transaction, SPAN_TAKE_VIDEO);
                let prediction_span = self.tracer.start_span(&transaction, SPAN_MODEL_PREDICTION);
                self.memory.start();
                self.active = Some(ActiveRecording {
                    transaction,
                    capture_span,
                    prediction_span,
                    stream,
                    frames: Some(frames),
                    token,
                    started: Instant::now(),
                    started_at: Utc::now(),
                });
                self.transition(SessionState::Recording);
                Ok(())
            }
            Err(e) => {
                error!(session = %self.id, error = %e, "failed to start recording");
                if let Err(finish_error) = self
                    .tracer
                    .finish(transaction, TransactionStatus::Cancelled)
                {
                    warn!(error = %finish_error, "failed to finish abandoned transaction");
                }
                self.transition(SessionState::Idle);
                Err(e)
            }
        }
    }

    async fn begin_recording(
        &mut self,
        transaction: &TransactionHandle,
    ) -> ProbeResult<(Arc<dyn MediaStream>, Arc<dyn FrameSource>, CancelToken)> {
        if !self.model_loaded {
            self.load_model(transaction).await?;
        }

        let constraints = StreamConstraints::from_configuration(
            self.device.as_ref().map(|d| d.0.clone()),
            &self.configuration,
            self.config.portrait,
            self.config.facing,
        );
        let permission_span = self.tracer.start_span(transaction, SPAN_ASKING_PERMISSION);
        let opened = self.capture.open_stream(&constraints).await;
        self.finish_span_logged(permission_span);
        let stream = opened?;

        let options = RecordOptions {
            mime_type: self.config.mime_type.clone(),
            bits_per_second: self.configuration.bit_rate.map(|b| b.bits_per_second),
        };
        let frames = stream.frame_source();
        let started = stream.record(&options).and_then(|()| {
            let events = self.events.clone();
            self.scheduler
                .start(frames.clone(), self.predictor.clone(), move |sample| {
                    let _ = events.send(SessionEvent::Detection {
                        timestamp: sample.timestamp,
                        detection: sample.detection,
                    });
                })
        });

        match started {
            Ok(token) => {
                info!(
                    session = %self.id,
                    stream = stream.id(),
                    mime_type = %options.mime_type,
                    bits_per_second = ?options.bits_per_second,
                    "recording started"
                );
                Ok((stream, frames, token))
            }
            Err(e) => {
                if let Err(stop_error) = stream.stop_tracks() {
                    warn!(error = %stop_error, "failed to release stream after start failure");
                }
                Err(e)
            }
        }
    }

    async fn load_model(&mut self, transaction: &TransactionHandle) -> ProbeResult<()> {
        let span = self.tracer.start_span(transaction, SPAN_MODEL_LOADING);
        let started = Instant::now();
        let loaded = self.predictor.load().await;
        let elapsed = started.elapsed();
        self.finish_span_logged(span);

        if let Err(e) = loaded {
            warn!(model = self.predictor.name(), error = %e, "model failed to load");
            return Err(match e {
                ProbeError::ModelNotLoaded { .. } => e,
                _ => ProbeError::ModelNotLoaded {
                    model: self.predictor.name().to_string(),
                },
            });
        }

        if let Err(e) = self.tracer.set_measurement(
            transaction,
            "model_loading_time",
            elapsed.as_secs_f64(),
            MeasurementUnit::Second,
        ) {
            warn!(error = %e, "failed to report model loading time");
        }
        info!(model = self.predictor.name(), elapsed_ms = elapsed.as_millis() as u64, "model loaded");
        self.model_loaded = true;
        Ok(())
    }

    /// Stop the session
    ///
    /// From `Recording` this runs the full teardown and returns the report;
    /// the transaction finishes as `UnknownError` if the frame source had
    /// already ended. From any other state the session simply becomes
    /// `Stopped`. Stopping twice does nothing and returns `None`.
    pub async fn stop(&mut self) -> Option<SessionReport> {
        match self.state {
            SessionState::Stopped => None,
            SessionState::Recording if self.scheduler.is_source_ended() => {
                self.teardown(TransactionStatus::UnknownError).await
            }
            SessionState::Recording => self.teardown(TransactionStatus::Ok).await,
            _ => {
                self.transition(SessionState::Stopped);
                None
            }
        }
    }

    /// Tear down after an unrecoverable stream failure
    pub async fn handle_stream_error(&mut self, reason: &str) -> Option<SessionReport> {
        if self.state != SessionState::Recording {
            return None;
        }
        error!(session = %self.id, reason, "media stream failed");
        // The loop already announced an ended frame source
        if !self.scheduler.is_source_ended() {
            let _ = self.events.send(SessionEvent::StreamFailed {
                reason: reason.to_string(),
            });
        }
        self.teardown(TransactionStatus::UnknownError).await
    }

    /// Tear down if every track of the stream has ended
    ///
    /// The inference loop publishes [`SessionEvent::StreamFailed`] on its own
    /// when the frame source ends; hosts react to that event by calling this
    /// or [`stop`](Self::stop).
    pub async fn check_stream(&mut self) -> Option<SessionReport> {
        let ended = self.active.as_ref().map_or(false, |active| {
            !active.stream.is_active() || self.scheduler.is_source_ended()
        });
        if ended {
            self.handle_stream_error("all video tracks ended").await
        } else {
            None
        }
    }

    async fn teardown(&mut self, status: TransactionStatus) -> Option<SessionReport> {
        let Some(active) = self.active.take() else {
            self.transition(SessionState::Stopped);
            return None;
        };
        let ActiveRecording {
            transaction,
            capture_span,
            prediction_span,
            stream,
            frames,
            token,
            started,
            started_at,
        } = active;
        let mut errors = Vec::new();

        let samples = match self.scheduler.stop(&token).await {
            Ok(shutdown) => {
                if let Some(e) = &shutdown.aborted {
                    record_failure(&mut errors, "stop inference loop", e);
                }
                shutdown.samples
            }
            Err(e) => {
                record_failure(&mut errors, "stop inference loop", &e);
                SampleLog::default()
            }
        };

        if let Err(e) = stream.stop_tracks() {
            record_failure(&mut errors, "stop stream tracks", &e);
        }

        drop(frames);
        let memory = self.memory.stop();
        let capture_duration = started.elapsed();

        for span in [prediction_span, capture_span] {
            let name = span.name().to_string();
            if let Err(e) = self.tracer.finish_span(span) {
                record_failure(&mut errors, &format!("finish span '{}'", name), &e);
            }
        }

        let all_samples = summarize(samples.all_samples());
        let confident_samples = summarize(samples.confident_samples());
        let average_memory_mb = average(&memory);

        self.report_to_tracer(
            &transaction,
            &all_samples,
            &confident_samples,
            average_memory_mb,
            capture_duration,
            &mut errors,
        );

        if let Err(e) = self.tracer.finish(transaction, status) {
            record_failure(&mut errors, "finish transaction", &e);
        }

        let report = SessionReport {
            session_id: self.id,
            started_at,
            configuration: self.configuration,
            model: self.predictor.name().to_string(),
            all_samples,
            confident_samples,
            sample_count: samples.all_samples().len(),
            confident_count: samples.confident_samples().len(),
            average_memory_mb,
            capture_duration,
            status,
            teardown_errors: errors,
        };
        info!(
            session = %self.id,
            status = status.as_str(),
            samples = report.sample_count,
            confident = report.confident_count,
            failed_steps = report.teardown_errors.len(),
            "recording stopped"
        );

        self.report = Some(report.clone());
        let _ = self.events.send(SessionEvent::Report {
            report: Box::new(report.clone()),
        });
        self.transition(SessionState::Stopped);
        Some(report)
    }

    fn report_to_tracer(
        &self,
        transaction: &TransactionHandle,
        all: &MetricsSummary,
        confident: &MetricsSummary,
        average_memory_mb: f64,
        capture_duration: Duration,
        errors: &mut Vec<String>,
    ) {
        let configuration = &self.configuration;
        let tags = [
            (
                "video_config.resolution",
                configuration.resolution.map(|r| r.value()),
            ),
            (
                "video_config.frame_rate",
                configuration.frame_rate.map(|f| f.value()),
            ),
            (
                "video_config.bit_rate",
                configuration.bit_rate.map(|b| b.value()),
            ),
        ];
        for (key, value) in tags {
            let value = value.unwrap_or_else(|| "default".to_string());
            if let Err(e) = self.tracer.set_tag(transaction, key, &value) {
                record_failure(errors, &format!("tag '{}'", key), &e);
            }
        }

        let tags = [
            ("embeddedModel", self.predictor.name().to_string()),
            (
                "measurements.average_memory_usage",
                format!("{} MB", average_memory_mb),
            ),
            (
                "measurements.max_capture_time",
                format_capture_time(capture_duration),
            ),
        ];
        for (key, value) in tags {
            if let Err(e) = self.tracer.set_tag(transaction, key, &value) {
                record_failure(errors, &format!("tag '{}'", key), &e);
            }
        }

        let measurements = [
            ("avg_pps_count", all.avg_count_per_second, MeasurementUnit::None),
            ("avg_pps_interval", all.avg_intra_second_offset, MeasurementUnit::Millisecond),
            (
                "avg_prediction_interval",
                all.avg_inter_sample_interval_ms,
                MeasurementUnit::Millisecond,
            ),
            (
                "avg_accurate_pps_count",
                confident.avg_count_per_second,
                MeasurementUnit::None,
            ),
            (
                "avg_accurate_pps_interval",
                confident.avg_intra_second_offset,
                MeasurementUnit::Millisecond,
            ),
            (
                "avg_accurate_prediction_interval",
                confident.avg_inter_sample_interval_ms,
                MeasurementUnit::Millisecond,
            ),
            ("avg_memory_used", average_memory_mb, MeasurementUnit::Megabyte),
        ];
        for (name, value, unit) in measurements {
            if let Err(e) = self.tracer.set_measurement(transaction, name, value, unit) {
                record_failure(errors, &format!("measurement '{}'", name), &e);
            }
        }
    }

    fn finish_span_logged(&self, span: SpanHandle) {
        let name = span.name().to_string();
        if let Err(e) = self.tracer.finish_span(span) {
            warn!(span = %name, error = %e, "failed to finish span");
        }
    }

    fn expect_state(&self, expected: SessionState) -> ProbeResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ProbeError::InvalidState {
                expected: expected.to_string(),
                actual: self.state.to_string(),
            })
        }
    }

    fn transition(&mut self, to: SessionState) {
        let from = std::mem::replace(&mut self.state, to);
        if from != to {
            debug!(session = %self.id, %from, %to, "session state changed");
            let _ = self.events.send(SessionEvent::StateChanged { from, to });
        }
    }
}

fn record_failure(errors: &mut Vec<String>, step: &str, error: &ProbeError) {
    warn!(step, %error, "teardown step failed");
    errors.push(format!("{}: {}", step, error));
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            warn!(session = %self.id, "session dropped while recording");
            active.token.cancel();
            let _ = active.stream.stop_tracks();
        }
    }
}

impl fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("device", &self.device)
            .field("configuration", &self.configuration)
            .field("model", &self.predictor.name())
            .finish()
    }
}

/// Fluent builder for a [`RecordingSession`]
pub struct SessionBuilder {
    capture: Arc<dyn CaptureBackend>,
    predictor: Arc<dyn Predictor>,
    tracer: Option<Arc<dyn Tracer>>,
    clock: Option<Arc<dyn Clock>>,
    memory_probe: Option<Arc<dyn MemoryProbe>>,
    config: SessionConfig,
}

impl SessionBuilder {
    pub(crate) fn new(
        probe: &VisionProbe,
        capture: Arc<dyn CaptureBackend>,
        predictor: Arc<dyn Predictor>,
    ) -> Self {
        Self {
            capture,
            predictor,
            tracer: None,
            clock: None,
            memory_probe: None,
            config: probe.config().session_defaults.clone(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Score threshold for confident samples
    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    /// Portrait viewport; swaps requested width and height
    pub fn portrait(mut self, portrait: bool) -> Self {
        self.config.portrait = portrait;
        self
    }

    /// Preferred camera
    pub fn facing(mut self, facing: FacingMode) -> Self {
        self.config.facing = facing;
        self
    }

    /// Frame clock period
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.config.frame_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Memory sampling period
    pub fn memory_sample_interval(mut self, interval: Duration) -> Self {
        self.config.memory_sample_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Consecutive prediction failures tolerated before the loop stalls
    pub fn prediction_retry_limit(mut self, limit: u32) -> Self {
        self.config.prediction_retry_limit = limit;
        self
    }

    /// Upper bound on waiting for an in-flight prediction at stop
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.config.stop_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Recorder container and codec
    pub fn mime_type(mut self, mime_type: &str) -> Self {
        self.config.mime_type = mime_type.to_string();
        self
    }

    /// Tracing transaction name and operation
    pub fn transaction(mut self, name: &str, operation: &str) -> Self {
        self.config.transaction_name = name.to_string();
        self.config.operation = operation.to_string();
        self
    }

    /// Tracing backend; defaults to [`LogTracer`]
    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Clock stamping inference samples; defaults to the system clock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Memory probe; defaults to the process resident set size
    pub fn memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.memory_probe = Some(probe);
        self
    }

    /// Validate the configuration and create an `Idle` session
    pub fn build(self) -> ProbeResult<RecordingSession> {
        self.config.validate()?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let mut scheduler = InferenceScheduler::with_clock(self.config.scheduler_config(), clock);
        let stall_events = events.clone();
        scheduler.set_stall_handler(move |e: &ProbeError| {
            let _ = stall_events.send(SessionEvent::InferenceStalled {
                error: e.to_string(),
            });
        });
        let ended_events = events.clone();
        scheduler.set_source_ended_handler(move || {
            let _ = ended_events.send(SessionEvent::StreamFailed {
                reason: "frame source ended".to_string(),
            });
        });

        let memory = MemorySampler::new(
            self.memory_probe
                .unwrap_or_else(|| Arc::new(ProcessMemoryProbe)),
            self.config.memory_sample_interval(),
        );

        let session = RecordingSession {
            id: Uuid::new_v4(),
            config: self.config,
            capture: self.capture,
            predictor: self.predictor,
            tracer: self.tracer.unwrap_or_else(|| Arc::new(LogTracer::new())),
            state: SessionState::Idle,
            device: None,
            capability: None,
            configuration: ChosenConfiguration::default(),
            scheduler,
            memory,
            model_loaded: false,
            active: None,
            report: None,
            events,
        };
        debug!(session = %session.id, model = session.predictor.name(), "session created");
        Ok(session)
    }
}
