//! Tracing backend collaborator
//!
//! Sessions report through [`Tracer`] using opaque handles: a
//! [`TransactionHandle`] per session phase and a [`SpanHandle`] per sub-step.
//! The backend owns all span and transaction state.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;
use visionprobe_core::{ProbeError, ProbeResult};

/// Opaque reference to an open transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionHandle {
    id: Uuid,
    name: String,
}

impl TransactionHandle {
    /// Create a handle; backends call this from `start_transaction`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    /// Unique id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Transaction name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Opaque reference to an open span inside a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanHandle {
    id: Uuid,
    transaction: Uuid,
    name: String,
}

impl SpanHandle {
    /// Create a handle; backends call this from `start_span`
    pub fn new(transaction: &TransactionHandle, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction: transaction.id,
            name: name.into(),
        }
    }

    /// Unique id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Id of the owning transaction
    pub fn transaction_id(&self) -> Uuid {
        self.transaction
    }

    /// Span name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Unit attached to a numeric measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MeasurementUnit {
    /// Dimensionless count
    None,
    /// Milliseconds
    Millisecond,
    /// Seconds
    Second,
    /// Megabytes
    Megabyte,
}

impl MeasurementUnit {
    /// Backend unit name
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::None => "none",
            MeasurementUnit::Millisecond => "millisecond",
            MeasurementUnit::Second => "second",
            MeasurementUnit::Megabyte => "megabyte",
        }
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded when a transaction finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionStatus {
    /// Completed normally
    Ok,
    /// Ended by an error the session could not classify further
    UnknownError,
    /// Abandoned while the recording was starting
    Cancelled,
}

impl TransactionStatus {
    /// Backend status name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Ok => "ok",
            TransactionStatus::UnknownError => "unknown_error",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

/// Tracing backend
pub trait Tracer: Send + Sync {
    /// Open a transaction
    fn start_transaction(&self, name: &str, op: &str) -> TransactionHandle;

    /// Open a span inside `transaction`
    fn start_span(&self, transaction: &TransactionHandle, name: &str) -> SpanHandle;

    /// Close a span
    fn finish_span(&self, span: SpanHandle) -> ProbeResult<()>;

    /// Attach a string tag to a transaction
    fn set_tag(&self, transaction: &TransactionHandle, key: &str, value: &str) -> ProbeResult<()>;

    /// Attach a numeric measurement to a transaction
    fn set_measurement(
        &self,
        transaction: &TransactionHandle,
        name: &str,
        value: f64,
        unit: MeasurementUnit,
    ) -> ProbeResult<()>;

    /// Close a transaction
    fn finish(&self, transaction: TransactionHandle, status: TransactionStatus)
        -> ProbeResult<()>;
}

fn unknown_transaction(handle_name: &str) -> ProbeError {
    ProbeError::InvalidOperation {
        operation: format!("use of finished or unknown transaction '{}'", handle_name),
    }
}

#[derive(Debug)]
struct OpenTransaction {
    op: String,
    started_at: Instant,
    spans: HashMap<Uuid, (String, Instant)>,
    tags: usize,
    measurements: usize,
}

/// Tracer that reports through `tracing` events
///
/// Durations of spans and transactions are measured locally and logged
/// when they finish.
#[derive(Debug, Default)]
pub struct LogTracer {
    open: Mutex<HashMap<Uuid, OpenTransaction>>,
}

impl LogTracer {
    /// Create a tracer with no open transactions
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions not yet finished
    pub fn open_transactions(&self) -> usize {
        self.open.lock().len()
    }
}

impl Tracer for LogTracer {
    fn start_transaction(&self, name: &str, op: &str) -> TransactionHandle {
        let handle = TransactionHandle::new(name);
        info!(transaction = name, op, id = %handle.id, "transaction started");
        self.open.lock().insert(
            handle.id,
            OpenTransaction {
                op: op.to_string(),
                started_at: Instant::now(),
                spans: HashMap::new(),
                tags: 0,
                measurements: 0,
            },
        );
        handle
    }

    fn start_span(&self, transaction: &TransactionHandle, name: &str) -> SpanHandle {
        let span = SpanHandle::new(transaction, name);
        match self.open.lock().get_mut(&transaction.id) {
            Some(open) => {
                open.spans
                    .insert(span.id, (name.to_string(), Instant::now()));
                info!(transaction = %transaction.name, span = name, "span started");
            }
            None => warn!(
                transaction = %transaction.name,
                span = name,
                "span started on a finished transaction"
            ),
        }
        span
    }

    fn finish_span(&self, span: SpanHandle) -> ProbeResult<()> {
        let mut open = self.open.lock();
        let (name, started_at) = open
            .get_mut(&span.transaction)
            .and_then(|t| t.spans.remove(&span.id))
            .ok_or_else(|| ProbeError::InvalidOperation {
                operation: format!("finish of unknown span '{}'", span.name),
            })?;
        info!(span = %name, elapsed_ms = started_at.elapsed().as_millis() as u64, "span finished");
        Ok(())
    }

    fn set_tag(&self, transaction: &TransactionHandle, key: &str, value: &str) -> ProbeResult<()> {
        let mut open = self.open.lock();
        let entry = open
            .get_mut(&transaction.id)
            .ok_or_else(|| unknown_transaction(&transaction.name))?;
        entry.tags += 1;
        info!(transaction = %transaction.name, key, value, "tag");
        Ok(())
    }

    fn set_measurement(
        &self,
        transaction: &TransactionHandle,
        name: &str,
        value: f64,
        unit: MeasurementUnit,
    ) -> ProbeResult<()> {
        let mut open = self.open.lock();
        let entry = open
            .get_mut(&transaction.id)
            .ok_or_else(|| unknown_transaction(&transaction.name))?;
        entry.measurements += 1;
        info!(transaction = %transaction.name, measurement = name, value, unit = unit.as_str(), "measurement");
        Ok(())
    }

    fn finish(
        &self,
        transaction: TransactionHandle,
        status: TransactionStatus,
    ) -> ProbeResult<()> {
        let finished = self
            .open
            .lock()
            .remove(&transaction.id)
            .ok_or_else(|| unknown_transaction(&transaction.name))?;

        for (name, _) in finished.spans.values() {
            warn!(transaction = %transaction.name, span = %name, "span left open at finish");
        }
        info!(
            transaction = %transaction.name,
            op = %finished.op,
            status = status.as_str(),
            tags = finished.tags,
            measurements = finished.measurements,
            elapsed_ms = finished.started_at.elapsed().as_millis() as u64,
            "transaction finished"
        );
        Ok(())
    }
}

/// One call observed by a [`RecordingTracer`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TraceRecord {
    /// `start_transaction`
    TransactionStarted {
        /// Transaction name
        name: String,
        /// Operation
        op: String,
    },
    /// `start_span`
    SpanStarted {
        /// Span name
        name: String,
    },
    /// `finish_span`
    SpanFinished {
        /// Span name
        name: String,
    },
    /// `set_tag`
    Tag {
        /// Tag key
        key: String,
        /// Tag value
        value: String,
    },
    /// `set_measurement`
    Measurement {
        /// Measurement name
        name: String,
        /// Value, possibly `NaN`
        value: f64,
        /// Unit
        unit: MeasurementUnit,
    },
    /// `finish`
    TransactionFinished {
        /// Transaction name
        name: String,
        /// Final status
        status: TransactionStatus,
    },
}

/// In-memory tracer that keeps every call for later inspection
#[derive(Debug, Default)]
pub struct RecordingTracer {
    records: Mutex<Vec<TraceRecord>>,
    finished: Mutex<HashSet<Uuid>>,
    fail_span_finish: bool,
}

impl RecordingTracer {
    /// Create an empty recording tracer
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `finish_span` call fail after recording it
    pub fn failing_span_finish() -> Self {
        Self {
            fail_span_finish: true,
            ..Self::default()
        }
    }

    /// All calls so far, in order
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    /// Last value set for a tag
    pub fn tag(&self, key: &str) -> Option<String> {
        self.records.lock().iter().rev().find_map(|r| match r {
            TraceRecord::Tag { key: k, value } if k == key => Some(value.clone()),
            _ => None,
        })
    }

    /// Last value and unit set for a measurement
    pub fn measurement(&self, name: &str) -> Option<(f64, MeasurementUnit)> {
        self.records.lock().iter().rev().find_map(|r| match r {
            TraceRecord::Measurement {
                name: n,
                value,
                unit,
            } if n == name => Some((*value, *unit)),
            _ => None,
        })
    }

    /// Number of records matching `predicate`
    pub fn count<F: Fn(&TraceRecord) -> bool>(&self, predicate: F) -> usize {
        self.records.lock().iter().filter(|r| predicate(r)).count()
    }

    /// Names of spans started so far
    pub fn started_spans(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                TraceRecord::SpanStarted { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: TraceRecord) {
        self.records.lock().push(record);
    }

    fn check_open(&self, transaction: &TransactionHandle) -> ProbeResult<()> {
        if self.finished.lock().contains(&transaction.id) {
            return Err(unknown_transaction(&transaction.name));
        }
        Ok(())
    }
}

impl Tracer for RecordingTracer {
    fn start_transaction(&self, name: &str, op: &str) -> TransactionHandle {
        self.push(TraceRecord::TransactionStarted {
            name: name.to_string(),
            op: op.to_string(),
        });
        TransactionHandle::new(name)
    }

    fn start_span(&self, transaction: &TransactionHandle, name: &str) -> SpanHandle {
        self.push(TraceRecord::SpanStarted {
            name: name.to_string(),
        });
        SpanHandle::new(transaction, name)
    }

    fn finish_span(&self, span: SpanHandle) -> ProbeResult<()> {
        self.push(TraceRecord::SpanFinished {
            name: span.name.clone(),
        });
        if self.fail_span_finish {
            return Err(ProbeError::InvalidOperation {
                operation: format!("backend rejected span '{}'", span.name),
            });
        }
        Ok(())
    }

    fn set_tag(&self, transaction: &TransactionHandle, key: &str, value: &str) -> ProbeResult<()> {
        self.check_open(transaction)?;
        self.push(TraceRecord::Tag {
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn set_measurement(
        &self,
        transaction: &TransactionHandle,
        name: &str,
        value: f64,
        unit: MeasurementUnit,
    ) -> ProbeResult<()> {
        self.check_open(transaction)?;
        self.push(TraceRecord::Measurement {
            name: name.to_string(),
            value,
            unit,
        });
        Ok(())
    }

    fn finish(
        &self,
        transaction: TransactionHandle,
        status: TransactionStatus,
    ) -> ProbeResult<()> {
        if !self.finished.lock().insert(transaction.id) {
            return Err(unknown_transaction(&transaction.name));
        }
        self.push(TraceRecord::TransactionFinished {
            name: transaction.name,
            status,
        });
        Ok(())
    }
}
