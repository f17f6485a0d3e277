//! Field-level validation for incoming records.
//!
//! Two entry points: [`record_from_json`] for loosely typed input (HTTP
//! bodies, imported telemetry objects) and [`check_record`] for records
//! built in-process. Both report the first offending field by its canonical
//! column name.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::record::{Feedback, Record, TemperatureLevel};

/// Check the invariants a typed record must satisfy before it is stored.
pub fn check_record(record: &Record) -> Result<(), ValidationError> {
    for (field, value) in [
        ("run_id", &record.run_id),
        ("request_id", &record.request_id),
        ("model_name", &record.model_name),
        ("device_model", &record.device_model),
        ("app_version", &record.app_version),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::new(field, "must not be empty"));
        }
    }
    check_latency(record.latency_ms)?;
    if let Some(b) = record.battery_percentage {
        check_battery(b)?;
    }
    Ok(())
}

/// Build a validated record from a JSON object.
///
/// `run_id_override`, when given, replaces whatever `run_id` the object
/// carries (and satisfies the field when it is missing).
pub fn record_from_json(
    value: &Value,
    run_id_override: Option<&str>,
) -> Result<Record, ValidationError> {
    let Value::Object(obj) = value else {
        return Err(ValidationError::new("record", "expected a JSON object"));
    };

    let run_id = match run_id_override {
        Some(id) => id.to_string(),
        None => required_string(obj, "run_id")?,
    };

    let record = Record {
        run_id,
        request_id: required_string(obj, "request_id")?,
        model_name: required_string(obj, "model_name")?,
        latency_ms: required_latency(obj)?,
        device_model: required_string(obj, "device_model")?,
        app_version: required_string(obj, "app_version")?,
        crash_log: optional_string(obj, "crash_log")?.filter(|s| !s.is_empty()),
        user_feedback: optional_feedback(obj)?,
        device_temperature: optional_temperature(obj)?,
        battery_percentage: optional_battery(obj)?,
    };
    check_record(&record)?;
    Ok(record)
}

fn present<'a>(obj: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required_string(obj: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match present(obj, field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::new(
            field,
            format!("expected string, got {}", type_name(other)),
        )),
        None => Err(ValidationError::new(field, "field required")),
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match present(obj, field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ValidationError::new(
            field,
            format!("expected string or null, got {}", type_name(other)),
        )),
        None => Ok(None),
    }
}

fn number(field: &'static str, v: &Value) -> Result<f64, ValidationError> {
    v.as_f64().ok_or_else(|| {
        ValidationError::new(field, format!("expected number, got {}", type_name(v)))
    })
}

fn required_latency(obj: &Map<String, Value>) -> Result<f64, ValidationError> {
    let v = present(obj, "latency_ms")
        .ok_or_else(|| ValidationError::new("latency_ms", "field required"))?;
    let latency = number("latency_ms", v)?;
    check_latency(latency)?;
    Ok(latency)
}

fn optional_feedback(obj: &Map<String, Value>) -> Result<Option<Feedback>, ValidationError> {
    match present(obj, "user_feedback") {
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .parse::<Feedback>()
            .map(Some)
            .map_err(|e| ValidationError::new("user_feedback", e)),
        Some(other) => Err(ValidationError::new(
            "user_feedback",
            format!("expected \"up\", \"down\" or null, got {}", type_name(other)),
        )),
        None => Ok(None),
    }
}

fn optional_temperature(
    obj: &Map<String, Value>,
) -> Result<Option<TemperatureLevel>, ValidationError> {
    let field = "device_temperature";
    match present(obj, field) {
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .parse::<TemperatureLevel>()
            .map(Some)
            .map_err(|e| ValidationError::new(field, e)),
        Some(v @ Value::Number(_)) => {
            let n = number(field, v)?;
            let level = (n.fract() == 0.0)
                .then(|| TemperatureLevel::from_ordinal(n as i64))
                .flatten();
            level.map(Some).ok_or_else(|| {
                ValidationError::new(field, format!("ordinal must be 1-4, got {n}"))
            })
        }
        Some(other) => Err(ValidationError::new(
            field,
            format!("expected label or ordinal, got {}", type_name(other)),
        )),
        None => Ok(None),
    }
}

fn optional_battery(obj: &Map<String, Value>) -> Result<Option<f64>, ValidationError> {
    match present(obj, "battery_percentage") {
        Some(v) => {
            let b = number("battery_percentage", v)?;
            check_battery(b)?;
            Ok(Some(b))
        }
        None => Ok(None),
    }
}

fn check_latency(latency: f64) -> Result<(), ValidationError> {
    if !latency.is_finite() {
        return Err(ValidationError::new("latency_ms", "must be a finite number"));
    }
    if latency < 0.0 {
        return Err(ValidationError::new(
            "latency_ms",
            format!("must be >= 0, got {latency}"),
        ));
    }
    Ok(())
}

fn check_battery(pct: f64) -> Result<(), ValidationError> {
    if !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::new(
            "battery_percentage",
            format!("must be within [0, 100], got {pct}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "run_id": "run-8",
            "request_id": "req_ab12cd34",
            "model_name": "LFM2-VL-450M",
            "latency_ms": 195.3,
            "device_model": "iPhone 15 Pro",
            "app_version": "2.0.0",
        })
    }

    fn with(field: &str, value: Value) -> Value {
        let mut v = base();
        v[field] = value;
        v
    }

    #[test]
    fn accepts_minimal_record() {
        let r = record_from_json(&base(), None).unwrap();
        assert_eq!(r.model_name, "LFM2-VL-450M");
        assert_eq!(r.device_temperature, None);
    }

    #[test]
    fn accepts_full_record() {
        let v = json!({
            "run_id": "run-8", "request_id": "q", "model_name": "m", "latency_ms": 10,
            "device_model": "d", "app_version": "v", "crash_log": "boom",
            "user_feedback": "down", "device_temperature": 3, "battery_percentage": 55.5,
        });
        let r = record_from_json(&v, None).unwrap();
        assert!(r.crashed());
        assert_eq!(r.user_feedback, Some(Feedback::Down));
        assert_eq!(r.device_temperature, Some(TemperatureLevel::Serious));
        assert_eq!(r.battery_percentage, Some(55.5));
    }

    #[test]
    fn missing_mandatory_field_is_named() {
        let mut v = base();
        v.as_object_mut().unwrap().remove("device_model");
        let err = record_from_json(&v, None).unwrap_err();
        assert_eq!(err.field, "device_model");
    }

    #[test]
    fn null_mandatory_field_is_rejected() {
        let err = record_from_json(&with("model_name", Value::Null), None).unwrap_err();
        assert_eq!(err.field, "model_name");
    }

    #[test]
    fn negative_latency_rejected() {
        let err = record_from_json(&with("latency_ms", json!(-1.0)), None).unwrap_err();
        assert_eq!(err.field, "latency_ms");
    }

    #[test]
    fn string_latency_rejected() {
        let err = record_from_json(&with("latency_ms", json!("fast")), None).unwrap_err();
        assert_eq!(err.field, "latency_ms");
        assert!(err.reason.contains("string"));
    }

    #[test]
    fn battery_range_enforced() {
        assert!(record_from_json(&with("battery_percentage", json!(100)), None).is_ok());
        assert!(record_from_json(&with("battery_percentage", json!(0)), None).is_ok());
        let err = record_from_json(&with("battery_percentage", json!(100.5)), None).unwrap_err();
        assert_eq!(err.field, "battery_percentage");
    }

    #[test]
    fn bad_feedback_rejected() {
        let err = record_from_json(&with("user_feedback", json!("sideways")), None).unwrap_err();
        assert_eq!(err.field, "user_feedback");
    }

    #[test]
    fn temperature_ordinal_out_of_range_rejected() {
        let err = record_from_json(&with("device_temperature", json!(0)), None).unwrap_err();
        assert_eq!(err.field, "device_temperature");
        let ok = record_from_json(&with("device_temperature", json!("critical")), None).unwrap();
        assert_eq!(ok.device_temperature, Some(TemperatureLevel::Critical));
    }

    #[test]
    fn empty_crash_log_normalizes_to_none() {
        let r = record_from_json(&with("crash_log", json!("")), None).unwrap();
        assert_eq!(r.crash_log, None);
    }

    #[test]
    fn run_id_override_wins() {
        let mut v = base();
        v.as_object_mut().unwrap().remove("run_id");
        let r = record_from_json(&v, Some("8")).unwrap();
        assert_eq!(r.run_id, "8");
    }

    #[test]
    fn non_object_rejected() {
        assert!(record_from_json(&json!([1, 2]), None).is_err());
    }

    #[test]
    fn check_record_rejects_blank_request_id() {
        let r = Record::new("r", " ", "m", 1.0, "d", "v");
        assert_eq!(check_record(&r).unwrap_err().field, "request_id");
    }
}
