//! Throughput and latency aggregation over sample timestamps
//!
//! A sample sequence is reduced in three passes:
//!
//! 1. timestamps are grouped into wall-clock second buckets, keeping the
//!    order in which each second was first seen;
//! 2. the first and last buckets are dropped, since a capture rarely starts
//!    or ends on a second boundary and those partial windows skew averages;
//! 3. per-bucket counts and mean offsets are averaged across the remaining
//!    buckets, while the inter-sample interval is averaged over the full,
//!    untrimmed sequence.
//!
//! Averages of empty input are `NaN`, meaning "not enough data".

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use visionprobe_core::{ProbeError, ProbeResult};

/// Throughput/latency summary of one sample sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSummary {
    /// Mean samples per fully observed second
    pub avg_count_per_second: f64,
    /// Mean position of samples within their second, in milliseconds
    ///
    /// This is a positional statistic, not an inter-arrival time; use
    /// [`avg_inter_sample_interval_ms`](Self::avg_inter_sample_interval_ms)
    /// for latency.
    pub avg_intra_second_offset: f64,
    /// Mean gap between consecutive samples, in milliseconds
    pub avg_inter_sample_interval_ms: f64,
}

impl MetricsSummary {
    /// Whether at least one fully observed second contributed
    pub fn is_sufficient(&self) -> bool {
        !self.avg_count_per_second.is_nan()
    }

    /// Turn a `NaN` throughput into an `InsufficientSamples` error
    pub fn ensure_sufficient(&self, buckets: usize) -> ProbeResult<&Self> {
        if self.is_sufficient() {
            Ok(self)
        } else {
            Err(ProbeError::InsufficientSamples { buckets })
        }
    }
}

/// Millisecond offsets of the samples that fell in one wall-clock second
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecondBucket {
    /// Epoch second
    pub second: i64,
    /// Offsets within the second, in arrival order
    pub offsets: Vec<i64>,
}

impl SecondBucket {
    /// Samples observed in this second
    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    /// Rounded mean offset
    pub fn average_offset(&self) -> f64 {
        let offsets: Vec<f64> = self.offsets.iter().map(|&o| o as f64).collect();
        average(&offsets)
    }
}

/// Rounded arithmetic mean; `NaN` for empty input
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    (values.iter().sum::<f64>() / values.len() as f64).round()
}

/// Group timestamps by epoch second, in first-seen order
pub fn group_by_second(samples: &[i64]) -> Vec<SecondBucket> {
    let mut buckets: Vec<SecondBucket> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for &timestamp in samples {
        let second = timestamp.div_euclid(1000);
        let offset = timestamp.rem_euclid(1000);
        match index.get(&second) {
            Some(&i) => buckets[i].offsets.push(offset),
            None => {
                index.insert(second, buckets.len());
                buckets.push(SecondBucket {
                    second,
                    offsets: vec![offset],
                });
            }
        }
    }
    buckets
}

/// Drop the first and last buckets
pub fn trim_edges(buckets: &[SecondBucket]) -> &[SecondBucket] {
    if buckets.len() < 2 {
        return &[];
    }
    &buckets[1..buckets.len() - 1]
}

/// Differences between consecutive timestamps
pub fn inter_sample_intervals(samples: &[i64]) -> Vec<i64> {
    samples.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Reduce a timestamp sequence to its summary
pub fn summarize(samples: &[i64]) -> MetricsSummary {
    let buckets = group_by_second(samples);
    let trimmed = trim_edges(&buckets);

    let counts: Vec<f64> = trimmed.iter().map(|b| b.count() as f64).collect();
    let offsets: Vec<f64> = trimmed.iter().map(SecondBucket::average_offset).collect();
    let intervals: Vec<f64> = inter_sample_intervals(samples)
        .into_iter()
        .map(|i| i as f64)
        .collect();

    let summary = MetricsSummary {
        avg_count_per_second: average(&counts),
        avg_intra_second_offset: average(&offsets),
        avg_inter_sample_interval_ms: average(&intervals),
    };

    tracing::debug!(
        samples = samples.len(),
        buckets = buckets.len(),
        kept = trimmed.len(),
        ?summary,
        "summarized sample sequence"
    );
    summary
}

/// Format a capture duration as `HH:MM:SS.t`
///
/// Hours wrap at 24 and only tenths of a second are shown.
pub fn format_capture_time(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let tenths = (total_ms % 1000) / 100;
    let seconds = (total_ms / 1000) % 60;
    let minutes = (total_ms / (1000 * 60)) % 60;
    let hours = (total_ms / (1000 * 60 * 60)) % 24;
    format!("{:02}:{:02}:{:02}.{}", hours, minutes, seconds, tenths)
}
