//! Append-only record store backed by a single CSV file.
//!
//! Every operation is a full open/act/close cycle against the configured
//! path. There is no write lock: two processes appending to the same file
//! can interleave, and each line is emitted with a single `write_all` to
//! keep that to whole-line granularity on filesystems with atomic appends.
//! Reads always go back to disk.
//!
//! # Storage Format
//!
//! UTF-8, comma-separated, header row first:
//!
//! ```text
//! run_id,request_id,model_name,latency_ms,device_model,app_version,crash_log,user_feedback,device_temperature,battery_percentage
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::csv::{check_header, count_rows, decode_record, encode_record, header_line, parse_rows};
use crate::error::{PartialAppend, StoreError};
use crate::record::Record;

/// Handle on the backing file. Cheap to clone; holds no open descriptors.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { path: config.path }
    }

    /// Store at `path` with the header row guaranteed to exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(StoreConfig::new(path));
        store.ensure_initialized()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with the canonical header if it is missing or empty.
    /// Idempotent.
    pub fn ensure_initialized(&self) -> Result<(), StoreError> {
        self.init_with(Self::read_err)
    }

    /// `ensure_initialized` on a write path: a failed probe of the file is
    /// reported as a write error.
    fn init_for_write(&self) -> Result<(), StoreError> {
        self.init_with(Self::write_err)
    }

    fn init_with(&self, probe_err: fn(&Self, io::Error) -> StoreError) -> Result<(), StoreError> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() > 0 => return Ok(()),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(probe_err(self, e)),
        }
        self.write_header()?;
        log::info!("initialized record store at {}", self.path.display());
        Ok(())
    }

    /// Append one record as a new row.
    pub fn append(&self, record: &Record) -> Result<(), StoreError> {
        self.init_for_write()?;
        let line = encode_record(record);
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_err(e))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| self.write_err(e))?;
        log::debug!(
            "appended request {} (run {}) to {}",
            record.request_id,
            record.run_id,
            self.path.display()
        );
        Ok(())
    }

    /// Append records one at a time in order. Not atomic: on failure the
    /// rows written before it stay persisted and the count is reported.
    pub fn append_many(&self, records: &[Record]) -> Result<usize, PartialAppend> {
        for (appended, record) in records.iter().enumerate() {
            self.append(record)
                .map_err(|source| PartialAppend { appended, source })?;
        }
        Ok(records.len())
    }

    /// Every record in file order.
    pub fn read_all(&self) -> Result<Vec<Record>, StoreError> {
        self.ensure_initialized()?;
        let text = fs::read_to_string(&self.path).map_err(|e| self.read_err(e))?;
        let rows = parse_rows(&text)?;

        let Some((header, data)) = rows.split_first() else {
            return Err(StoreError::Malformed {
                line: 1,
                column: None,
                reason: "missing header row".to_string(),
            });
        };
        check_header(header)?;

        let records = data
            .iter()
            .map(decode_record)
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Number of data rows, counted without decoding them.
    pub fn count(&self) -> Result<usize, StoreError> {
        self.ensure_initialized()?;
        let bytes = fs::read(&self.path).map_err(|e| self.read_err(e))?;
        Ok(count_rows(&bytes))
    }

    /// Truncate to the header row. Irreversible.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.write_header()?;
        log::info!("cleared record store at {}", self.path.display());
        Ok(())
    }

    fn write_header(&self) -> Result<(), StoreError> {
        let mut file = File::create(&self.path).map_err(|e| self.write_err(e))?;
        writeln!(file, "{}", header_line())
            .and_then(|()| file.flush())
            .map_err(|e| self.write_err(e))
    }

    fn write_err(&self, source: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }

    fn read_err(&self, source: io::Error) -> StoreError {
        StoreError::Read {
            path: self.path.clone(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
