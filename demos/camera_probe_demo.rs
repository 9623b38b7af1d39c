//! VisionProbe Camera Probe Demo
//!
//! Runs one complete session against the mock camera:
//! - capability negotiation and a manual frame-rate override
//! - a few seconds of frame-paced inference with a static model
//! - teardown and the telemetry report
//!
//! Set `RUST_LOG=visionprobe=debug` to see the tracer output.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use visionprobe::{
    Detection, DeviceCapability, FrameRateTier, GlobalConfig, LogTracer, MockCaptureBackend,
    SessionEvent, StaticPredictor, VisionProbe,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let probe = VisionProbe::init_with(GlobalConfig {
        debug_logging: true,
        ..Default::default()
    })
    .context("failed to initialize VisionProbe")?;

    println!("🎥 VisionProbe camera probe demo");
    println!("================================");

    let capture = Arc::new(
        MockCaptureBackend::new().with_capability(DeviceCapability::new(1920, 1080, 60.0)),
    );
    let predictor = Arc::new(StaticPredictor::new(
        "demo-detector",
        vec![
            Detection::new("cup", 0.42),
            Detection::new("person", 0.87),
        ],
    ));

    let mut session = probe
        .session(capture, predictor)
        .tracer(Arc::new(LogTracer::new()))
        .confidence_threshold(0.6)
        .build()?;

    let mut events = session.events();
    let printer = tokio::spawn(async move {
        let mut detections = 0usize;
        while let Some(event) = events.next().await {
            match event {
                SessionEvent::StateChanged { from, to } => println!("🔄 {} -> {}", from, to),
                SessionEvent::Detection { .. } => detections += 1,
                SessionEvent::InferenceStalled { error } => println!("⚠️  inference stalled: {}", error),
                SessionEvent::StreamFailed { reason } => println!("❌ stream failed: {}", reason),
                SessionEvent::Report { .. } => break,
            }
        }
        detections
    });

    let negotiated = session.negotiate().await?;
    println!(
        "📋 Negotiated: resolution={:?} frame_rate={:?} bit_rate={:?}",
        negotiated.resolution.map(|r| r.label),
        negotiated.frame_rate.map(|f| f.label),
        negotiated.bit_rate.map(|b| b.label),
    );

    if let Some(thirty) = FrameRateTier::from_fps(30) {
        let configuration = session.override_frame_rate(thirty)?;
        println!(
            "✏️  Overrode frame rate, bit rate is now {:?}",
            configuration.bit_rate.map(|b| b.label)
        );
    }

    session.record().await?;
    println!("⏺️  Recording for 3 seconds...");
    tokio::time::sleep(Duration::from_secs(3)).await;

    let report = session
        .stop()
        .await
        .context("session stopped without a report")?;
    let detections = printer.await?;

    println!("\n📊 Report");
    println!("  model:                 {}", report.model);
    println!("  samples:               {}", report.sample_count);
    println!("  confident samples:     {}", report.confident_count);
    println!("  detection events:      {}", detections);
    println!(
        "  predictions/s:         {}",
        report.all_samples.avg_count_per_second
    );
    println!(
        "  prediction interval:   {} ms",
        report.all_samples.avg_inter_sample_interval_ms
    );
    println!(
        "  capture time:          {}",
        visionprobe::format_capture_time(report.capture_duration)
    );
    println!("  average memory:        {} MB", report.average_memory_mb);
    println!("\n{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
