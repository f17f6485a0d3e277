//! Ingestion gateway: validate, then append.
//!
//! Batches are processed one record at a time in input order and stop at the
//! first failure. Records appended before the failure stay persisted; the
//! records after it are never attempted. [`BatchReport`] says exactly how far
//! the batch got so the caller can resubmit the tail.

use serde::Serialize;
use serde_json::Value;

use crate::error::IngestError;
use crate::record::Record;
use crate::store::RecordStore;
use crate::validate::{check_record, record_from_json};

/// Where a batch stopped and why.
#[derive(Debug)]
pub struct BatchFailure {
    /// Zero-based position of the failing record in the submitted batch.
    pub index: usize,
    pub error: IngestError,
}

/// Outcome of [`IngestGateway::submit_batch`].
#[derive(Debug)]
pub struct BatchReport {
    pub submitted: usize,
    pub appended: usize,
    /// At most one entry: the failure that aborted the batch.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Records after the failing one that were skipped.
    pub fn not_attempted(&self) -> usize {
        self.submitted
            .saturating_sub(self.appended)
            .saturating_sub(self.failures.len())
    }
}

/// Liveness snapshot of the store behind the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub csv_file: String,
    pub total_logs: usize,
}

/// Acknowledgement of a clear.
#[derive(Debug, Clone, Serialize)]
pub struct ClearReceipt {
    pub message: String,
    pub csv_file: String,
}

/// Front door for writes. Owns its store handle.
#[derive(Debug, Clone)]
pub struct IngestGateway {
    store: RecordStore,
}

impl IngestGateway {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Validate and append one typed record; returns what was stored.
    pub fn submit(&self, mut record: Record) -> Result<Record, IngestError> {
        // An empty crash log is stored as an empty cell, which reads back absent.
        if record.crash_log.as_deref() == Some("") {
            record.crash_log = None;
        }
        check_record(&record)?;
        self.store.append(&record)?;
        Ok(record)
    }

    /// Validate a JSON object field by field, then append it.
    pub fn submit_json(&self, value: &Value) -> Result<Record, IngestError> {
        let record = record_from_json(value, None)?;
        self.store.append(&record)?;
        Ok(record)
    }

    /// Submit records in order, stopping at the first failure.
    pub fn submit_batch(&self, records: Vec<Record>) -> BatchReport {
        self.run_batch(records.len(), records.into_iter().map(|r| self.submit(r)))
    }

    /// JSON form of [`Self::submit_batch`].
    pub fn submit_json_batch(&self, values: &[Value]) -> BatchReport {
        self.run_batch(values.len(), values.iter().map(|v| self.submit_json(v)))
    }

    fn run_batch<I>(&self, submitted: usize, results: I) -> BatchReport
    where
        I: Iterator<Item = Result<Record, IngestError>>,
    {
        let mut report = BatchReport {
            submitted,
            appended: 0,
            failures: Vec::new(),
        };
        // The iterator is lazy, so breaking here means later records are
        // never validated or written.
        for (index, result) in results.enumerate() {
            match result {
                Ok(_) => report.appended += 1,
                Err(error) => {
                    log::warn!(
                        "batch aborted at record {index} of {submitted}: {error} \
                         ({} appended, {} not attempted)",
                        report.appended,
                        submitted - index - 1
                    );
                    report.failures.push(BatchFailure { index, error });
                    break;
                }
            }
        }
        report
    }

    pub fn count(&self) -> Result<usize, IngestError> {
        Ok(self.store.count()?)
    }

    pub fn health(&self) -> Result<HealthStatus, IngestError> {
        Ok(HealthStatus {
            status: "healthy",
            csv_file: self.store.path().display().to_string(),
            total_logs: self.store.count()?,
        })
    }

    pub fn clear(&self) -> Result<ClearReceipt, IngestError> {
        self.store.clear()?;
        Ok(ClearReceipt {
            message: "All logs cleared successfully".to_string(),
            csv_file: self.store.path().display().to_string(),
        })
    }
}
