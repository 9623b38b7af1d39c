//! Aggregation properties over realistic sample sequences

use std::time::Duration;
use visionprobe_diagnostics::{
    format_capture_time, group_by_second, summarize, trim_edges, LogTracer, MeasurementUnit,
    RecordingTracer, TraceRecord, Tracer, TransactionStatus,
};

/// Timestamps at a steady rate starting at `start_ms`
fn steady(start_ms: i64, every_ms: i64, count: usize) -> Vec<i64> {
    (0..count as i64).map(|i| start_ms + i * every_ms).collect()
}

#[test]
fn test_steady_thirty_fps_over_five_seconds() {
    // 33 ms apart starting mid-second: partial first and last seconds
    let samples = steady(10_500, 33, 150);
    let summary = summarize(&samples);

    assert!(summary.is_sufficient());
    assert_eq!(summary.avg_inter_sample_interval_ms, 33.0);
    assert!((29.0..=31.0).contains(&summary.avg_count_per_second));
    assert!((400.0..=600.0).contains(&summary.avg_intra_second_offset));
}

#[test]
fn test_trimmed_buckets_exclude_partial_edges() {
    let samples = steady(1_900, 100, 25);
    let buckets = group_by_second(&samples);
    assert_eq!(buckets.first().map(|b| b.count()), Some(1));

    let trimmed = trim_edges(&buckets);
    assert_eq!(trimmed.len(), buckets.len() - 2);
    assert!(trimmed.iter().all(|b| b.count() == 10));
}

#[test]
fn test_single_second_is_insufficient() {
    let summary = summarize(&steady(7_000, 100, 10));
    assert!(!summary.is_sufficient());
    assert!(summary.avg_intra_second_offset.is_nan());
    assert_eq!(summary.avg_inter_sample_interval_ms, 100.0);
}

#[test]
fn test_non_decreasing_sequence_gives_non_negative_intervals() {
    let samples = vec![1_000, 1_000, 1_016, 1_050, 2_010, 2_010, 3_000];
    let summary = summarize(&samples);
    assert!(summary.avg_inter_sample_interval_ms >= 0.0);
    assert_eq!(summary.avg_count_per_second, 2.0);
}

#[test]
fn test_capture_time_format() {
    assert_eq!(format_capture_time(Duration::from_millis(59_999)), "00:00:59.9");
    assert_eq!(format_capture_time(Duration::from_secs(61)), "00:01:01.0");
}

#[test]
fn test_recording_tracer_keeps_call_order() {
    let tracer = RecordingTracer::new();
    let txn = tracer.start_transaction("Video Processing", "video_capturing");
    let span = tracer.start_span(&txn, "Take Video");
    tracer.set_tag(&txn, "video_config.frame_rate", "30").unwrap();
    tracer
        .set_measurement(&txn, "avg_pps_interval", 33.0, MeasurementUnit::Millisecond)
        .unwrap();
    tracer.finish_span(span).unwrap();
    tracer.finish(txn, TransactionStatus::Ok).unwrap();

    let records = tracer.records();
    assert_eq!(records.len(), 6);
    assert!(matches!(records[0], TraceRecord::TransactionStarted { .. }));
    assert_eq!(
        records[5],
        TraceRecord::TransactionFinished {
            name: "Video Processing".to_string(),
            status: TransactionStatus::Ok,
        }
    );
    assert_eq!(tracer.started_spans(), vec!["Take Video".to_string()]);
}

#[test]
fn test_failing_span_finish_still_records() {
    let tracer = RecordingTracer::failing_span_finish();
    let txn = tracer.start_transaction("Video Processing", "video_capturing");
    let span = tracer.start_span(&txn, "Model prediction");
    assert!(tracer.finish_span(span).is_err());
    assert_eq!(
        tracer.count(|r| matches!(r, TraceRecord::SpanFinished { .. })),
        1
    );
    tokio_test::assert_ok!(tracer.finish(txn, TransactionStatus::Ok));
}

#[test]
fn test_log_tracer_rejects_unknown_transaction() {
    let tracer = LogTracer::new();
    let txn = tracer.start_transaction("Video Processing", "video_capturing");
    tokio_test::assert_ok!(tracer.finish(txn.clone(), TransactionStatus::Cancelled));
    tokio_test::assert_err!(tracer.set_measurement(
        &txn,
        "avg_pps_count",
        1.0,
        MeasurementUnit::None
    ));
}
