//! Import of raw telemetry dumps.
//!
//! Devices dump telemetry as a run of loose JSON objects, sometimes wrapped
//! in stray single quotes and separated by newlines, commas or other noise.
//! [`parse_blob`] pulls out each top-level object, validates it, and stamps
//! it with the run id of the import.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::config::StoreConfig;
use crate::error::ImportError;
use crate::record::Record;
use crate::store::RecordStore;
use crate::validate::record_from_json;

/// Byte ranges of the top-level `{...}` objects in `text`. Braces inside
/// string literals are ignored.
fn object_spans(text: &str) -> Result<Vec<(usize, usize)>, ImportError> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            // Anything between objects is separator noise.
            _ => {}
        }
    }

    if depth > 0 {
        return Err(ImportError::Unterminated { offset: start });
    }
    Ok(spans)
}

/// Parse a telemetry dump into validated records, in order, each with
/// `run_id` set to `run_id`.
pub fn parse_blob(text: &str, run_id: &str) -> Result<Vec<Record>, ImportError> {
    let cleaned = text.replace('\'', "");

    object_spans(&cleaned)?
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| {
            let value: Value = serde_json::from_str(&cleaned[start..end])
                .map_err(|source| ImportError::Json { index, source })?;
            record_from_json(&value, Some(run_id))
                .map_err(|source| ImportError::Invalid { index, source })
        })
        .collect()
}

/// Convert the dump at `input` into a fresh canonical CSV at `output`.
/// Any existing file at `output` is replaced. Returns the record count.
pub fn convert(input: &Path, output: &Path, run_id: &str) -> Result<usize, ImportError> {
    let text = fs::read_to_string(input).map_err(|source| ImportError::Input {
        path: input.to_path_buf(),
        source,
    })?;
    let records = parse_blob(&text, run_id)?;

    let store = RecordStore::new(StoreConfig::new(output));
    store.clear()?;
    let written = store.append_many(&records).map_err(|e| {
        log::error!("import into {} stopped after {} records", output.display(), e.appended);
        e.source
    })?;

    log::info!(
        "imported {written} records from {} into {} (run {run_id})",
        input.display(),
        output.display()
    );
    Ok(written)
}
