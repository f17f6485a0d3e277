//! CSV row codec for the canonical ten-column layout.
//!
//! Fields containing a comma, quote, CR or LF are wrapped in double quotes
//! with inner quotes doubled, so crash logs with stack traces survive a
//! round trip. Absent optional values are zero-length fields.

use std::borrow::Cow;

use crate::error::StoreError;
use crate::record::{COLUMNS, Feedback, Record, TemperatureLevel};

/// The header line, without terminator.
pub fn header_line() -> String {
    COLUMNS.join(",")
}

/// Quote a field only when it needs it.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Encode one record as a terminated CSV line.
pub fn encode_record(record: &Record) -> String {
    let latency = record.latency_ms.to_string();
    let battery = record
        .battery_percentage
        .map(|b| b.to_string())
        .unwrap_or_default();
    let fields: [&str; 10] = [
        &record.run_id,
        &record.request_id,
        &record.model_name,
        &latency,
        &record.device_model,
        &record.app_version,
        record.crash_log.as_deref().unwrap_or(""),
        record.user_feedback.map(Feedback::as_str).unwrap_or(""),
        record.device_temperature.map(TemperatureLevel::label).unwrap_or(""),
        &battery,
    ];

    let mut line = String::with_capacity(64);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_field(field));
    }
    line.push('\n');
    line
}

/// A parsed row with the 1-based line number it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Split CSV text into rows of unescaped fields. Blank lines are skipped.
pub fn parse_rows(text: &str) -> Result<Vec<RawRow>, StoreError> {
    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut row_start = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_row(&mut rows, std::mem::take(&mut fields), row_start);
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(StoreError::Malformed {
            line: row_start,
            column: None,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_row(&mut rows, fields, row_start);
    }
    Ok(rows)
}

fn push_row(rows: &mut Vec<RawRow>, fields: Vec<String>, line: usize) {
    let blank = fields.len() == 1 && fields[0].is_empty();
    if !blank {
        rows.push(RawRow { line, fields });
    }
}

/// Count data rows without unescaping any field. Quoted newlines do not
/// end a record.
pub fn count_rows(bytes: &[u8]) -> usize {
    let mut records = 0usize;
    let mut in_quotes = false;
    let mut line_has_content = false;

    for &b in bytes {
        match b {
            b'"' => {
                in_quotes = !in_quotes;
                line_has_content = true;
            }
            b'\n' if !in_quotes => {
                if line_has_content {
                    records += 1;
                }
                line_has_content = false;
            }
            b'\r' if !in_quotes => {}
            _ => line_has_content = true,
        }
    }
    if line_has_content {
        records += 1;
    }
    // Header is not a data row.
    records.saturating_sub(1)
}

/// Verify a header row lists exactly the canonical columns in order.
pub fn check_header(row: &RawRow) -> Result<(), StoreError> {
    let matches = row.fields.len() == COLUMNS.len()
        && row.fields.iter().zip(COLUMNS).all(|(f, c)| f.trim() == c);
    if matches {
        Ok(())
    } else {
        Err(StoreError::Malformed {
            line: row.line,
            column: None,
            reason: format!(
                "header does not match canonical columns: got [{}]",
                row.fields.join(",")
            ),
        })
    }
}

/// Decode one data row into a typed record.
pub fn decode_record(row: &RawRow) -> Result<Record, StoreError> {
    if row.fields.len() != COLUMNS.len() {
        return Err(StoreError::Malformed {
            line: row.line,
            column: None,
            reason: format!(
                "expected {} columns, found {}",
                COLUMNS.len(),
                row.fields.len()
            ),
        });
    }

    let f = &row.fields;
    let malformed = |column: &'static str, reason: String| StoreError::Malformed {
        line: row.line,
        column: Some(column),
        reason,
    };
    let required = |idx: usize| -> Result<String, StoreError> {
        if f[idx].is_empty() {
            Err(malformed(COLUMNS[idx], "mandatory value is empty".to_string()))
        } else {
            Ok(f[idx].clone())
        }
    };
    let optional = |idx: usize| -> Option<&str> {
        let v = f[idx].trim();
        if v.is_empty() { None } else { Some(v) }
    };

    let latency_ms = f[3]
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| malformed("latency_ms", format!("not a non-negative number: {:?}", f[3])))?;

    let user_feedback = optional(7)
        .map(|v| v.parse::<Feedback>().map_err(|e| malformed("user_feedback", e)))
        .transpose()?;
    let device_temperature = optional(8)
        .map(|v| {
            v.parse::<TemperatureLevel>()
                .map_err(|e| malformed("device_temperature", e))
        })
        .transpose()?;
    let battery_percentage = optional(9)
        .map(|v| {
            v.parse::<f64>()
                .ok()
                .filter(|b| (0.0..=100.0).contains(b))
                .ok_or_else(|| {
                    malformed(
                        "battery_percentage",
                        format!("not a number in [0, 100]: {v:?}"),
                    )
                })
        })
        .transpose()?;

    Ok(Record {
        run_id: required(0)?,
        request_id: required(1)?,
        model_name: required(2)?,
        latency_ms,
        device_model: required(4)?,
        app_version: required(5)?,
        crash_log: if f[6].is_empty() { None } else { Some(f[6].clone()) },
        user_feedback,
        device_temperature,
        battery_percentage,
    })
}
