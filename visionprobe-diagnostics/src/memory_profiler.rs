//! Periodic process memory sampling

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Source of the current memory usage
pub trait MemoryProbe: Send + Sync {
    /// Used memory in megabytes, `None` when the platform cannot report it
    fn used_megabytes(&self) -> Option<f64>;
}

/// Reads the resident set size of the current process
///
/// Only Linux exposes this through `/proc/self/status`; elsewhere the probe
/// reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessMemoryProbe;

impl ProcessMemoryProbe {
    fn parse_vm_rss(status: &str) -> Option<f64> {
        let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
        let kib: f64 = line
            .trim_start_matches("VmRSS:")
            .trim()
            .trim_end_matches("kB")
            .trim()
            .parse()
            .ok()?;
        Some(((kib / 1024.0) * 100.0).round() / 100.0)
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn used_megabytes(&self) -> Option<f64> {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        Self::parse_vm_rss(&status)
    }
}

/// Probe that always reports the same value
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub Option<f64>);

impl MemoryProbe for FixedMemoryProbe {
    fn used_megabytes(&self) -> Option<f64> {
        self.0
    }
}

/// Samples a [`MemoryProbe`] on a fixed period while running
///
/// Unsupported probes contribute a `0` reading for each tick.
pub struct MemorySampler {
    probe: Arc<dyn MemoryProbe>,
    interval: Duration,
    samples: Arc<Mutex<Vec<f64>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MemorySampler {
    /// Create a sampler; nothing runs until [`start`](Self::start)
    pub fn new(probe: Arc<dyn MemoryProbe>, interval: Duration) -> Self {
        Self {
            probe,
            interval,
            samples: Arc::new(Mutex::new(Vec::new())),
            task: Mutex::new(None),
        }
    }

    /// Start sampling; a second call while running does nothing
    ///
    /// The first reading is taken one full period after starting.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        self.samples.lock().clear();

        let probe = Arc::clone(&self.probe);
        let samples = Arc::clone(&self.samples);
        let period = self.interval;
        tracing::debug!(interval_ms = period.as_millis() as u64, "memory sampling started");

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reading = probe.used_megabytes().unwrap_or(0.0);
                samples.lock().push(reading);
            }
        }));
    }

    /// Stop sampling and take the readings collected so far
    pub fn stop(&self) -> Vec<f64> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            tracing::debug!("memory sampling stopped");
        }
        std::mem::take(&mut *self.samples.lock())
    }

    /// Whether a sampling task is active
    pub fn is_sampling(&self) -> bool {
        self.task.lock().is_some()
    }
}

impl Drop for MemorySampler {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}
