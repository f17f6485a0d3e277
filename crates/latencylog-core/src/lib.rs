//! # latencylog-core
//!
//! **Latency telemetry for on-device inference, from append to analysis.**
//!
//! `latencylog-core` persists latency records to an append-only CSV file and
//! computes grouped summaries over them: per model, per run, across runs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use latencylog_core::{IngestGateway, Record, RecordStore, StoreConfig, aggregate};
//!
//! let store = RecordStore::new(StoreConfig::from_env());
//! let gateway = IngestGateway::new(store.clone());
//!
//! let record = Record::new("run-1", "req_0001", "gemma3", 212.4, "iPhone 15", "2.0.0")
//!     .with_battery(81.0);
//! gateway.submit(record).unwrap();
//!
//! let records = store.read_all().unwrap();
//! let summary = aggregate::global_summary(&records);
//! println!("{} records, mean {:?} ms", summary.count, summary.latency.mean);
//! ```
//!
//! ## Architecture
//!
//! client → [`IngestGateway`] → [`RecordStore`] → [`filter`] → [`aggregate`]
//!
//! Every read goes back to the file. Nothing is cached and there is no
//! in-process write lock: concurrent writers from separate processes can
//! interleave at line granularity.

pub mod aggregate;
pub mod config;
pub mod csv;
pub mod error;
pub mod filter;
pub mod import;
pub mod ingest;
pub mod record;
pub mod stats;
pub mod store;
pub mod validate;

pub use aggregate::{
    Comparison, CorrelationMatrix, CrashEntry, FeedbackCounts, GlobalSummary, GroupMetrics,
    LatencyStats, ModelFeedback, ModelSummary, NumericField, RunComparison, RunDetail, RunSummary,
    TimelinePoint, compare_runs, correlation_matrix, feedback_by_model, global_summary,
    group_by_model, group_by_run, run_detail,
};
pub use config::{CSV_PATH_ENV, DEFAULT_CSV_PATH, StoreConfig};
pub use error::{ImportError, IngestError, PartialAppend, StoreError, ValidationError};
pub use filter::{Facets, FilterSpec, facets};
pub use ingest::{BatchFailure, BatchReport, ClearReceipt, HealthStatus, IngestGateway};
pub use record::{COLUMNS, Feedback, Record, TemperatureLevel};
pub use store::RecordStore;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
