//! The latency record and its enumerated fields.
//!
//! Optional columns are `Option`s here and only become empty strings at the
//! CSV edge (see [`crate::csv`]). Temperature is normalized to
//! [`TemperatureLevel`] at this boundary so every aggregation sees one
//! representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical column order of the persisted file.
pub const COLUMNS: [&str; 10] = [
    "run_id",
    "request_id",
    "model_name",
    "latency_ms",
    "device_model",
    "app_version",
    "crash_log",
    "user_feedback",
    "device_temperature",
    "battery_percentage",
];

/// One observation of a model-inference latency event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub run_id: String,
    pub request_id: String,
    pub model_name: String,
    pub latency_ms: f64,
    pub device_model: String,
    pub app_version: String,
    #[serde(default)]
    pub crash_log: Option<String>,
    #[serde(default)]
    pub user_feedback: Option<Feedback>,
    #[serde(default)]
    pub device_temperature: Option<TemperatureLevel>,
    #[serde(default)]
    pub battery_percentage: Option<f64>,
}

impl Record {
    /// A record with only the mandatory fields set.
    pub fn new(
        run_id: impl Into<String>,
        request_id: impl Into<String>,
        model_name: impl Into<String>,
        latency_ms: f64,
        device_model: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            request_id: request_id.into(),
            model_name: model_name.into(),
            latency_ms,
            device_model: device_model.into(),
            app_version: app_version.into(),
            crash_log: None,
            user_feedback: None,
            device_temperature: None,
            battery_percentage: None,
        }
    }

    /// True when a non-empty crash log is attached.
    pub fn crashed(&self) -> bool {
        self.crash_log.as_deref().is_some_and(|log| !log.is_empty())
    }

    /// True when the user gave a thumbs up.
    pub fn feedback_up(&self) -> bool {
        self.user_feedback == Some(Feedback::Up)
    }

    /// Ordinal temperature score (nominal=1 .. critical=4).
    pub fn temp_score(&self) -> Option<f64> {
        self.device_temperature.map(|t| f64::from(t.ordinal()))
    }

    pub fn with_crash_log(mut self, log: impl Into<String>) -> Self {
        let log = log.into();
        self.crash_log = if log.is_empty() { None } else { Some(log) };
        self
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.user_feedback = Some(feedback);
        self
    }

    pub fn with_temperature(mut self, level: TemperatureLevel) -> Self {
        self.device_temperature = Some(level);
        self
    }

    pub fn with_battery(mut self, pct: f64) -> Self {
        self.battery_percentage = Some(pct);
        self
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// Thumbs up / thumbs down user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Up,
    Down,
}

impl Feedback {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feedback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("expected \"up\" or \"down\", got {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Temperature
// ---------------------------------------------------------------------------

/// Device thermal state. Ordering follows severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemperatureLevel {
    Nominal,
    Fair,
    Serious,
    Critical,
}

impl TemperatureLevel {
    pub const ALL: [TemperatureLevel; 4] = [
        TemperatureLevel::Nominal,
        TemperatureLevel::Fair,
        TemperatureLevel::Serious,
        TemperatureLevel::Critical,
    ];

    /// nominal=1, fair=2, serious=3, critical=4.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Nominal => 1,
            Self::Fair => 2,
            Self::Serious => 3,
            Self::Critical => 4,
        }
    }

    pub fn from_ordinal(n: i64) -> Option<Self> {
        match n {
            1 => Some(Self::Nominal),
            2 => Some(Self::Fair),
            3 => Some(Self::Serious),
            4 => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Nominal => "nominal",
            Self::Fair => "fair",
            Self::Serious => "serious",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for TemperatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts a label (any case) or an ordinal `1`..`4`.
impl FromStr for TemperatureLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "nominal" => return Ok(Self::Nominal),
            "fair" => return Ok(Self::Fair),
            "serious" => return Ok(Self::Serious),
            "critical" => return Ok(Self::Critical),
            _ => {}
        }
        // "2" and "2.0" are both ordinals.
        let n = s
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64);
        n.and_then(Self::from_ordinal).ok_or_else(|| {
            format!("expected nominal|fair|serious|critical or ordinal 1-4, got {s:?}")
        })
    }
}

impl Serialize for TemperatureLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for TemperatureLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Label(String),
            Ordinal(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Label(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Ordinal(n) => Self::from_ordinal(n).ok_or_else(|| {
                serde::de::Error::custom(format!("temperature ordinal out of range 1-4: {n}"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_ordinal_mapping() {
        let scores: Vec<u8> = TemperatureLevel::ALL.iter().map(|t| t.ordinal()).collect();
        assert_eq!(scores, vec![1, 2, 3, 4]);
        for level in TemperatureLevel::ALL {
            assert_eq!(TemperatureLevel::from_ordinal(i64::from(level.ordinal())), Some(level));
        }
        assert_eq!(TemperatureLevel::from_ordinal(0), None);
        assert_eq!(TemperatureLevel::from_ordinal(5), None);
    }

    #[test]
    fn temperature_parses_label_and_ordinal() {
        assert_eq!("Serious".parse::<TemperatureLevel>(), Ok(TemperatureLevel::Serious));
        assert_eq!("4".parse::<TemperatureLevel>(), Ok(TemperatureLevel::Critical));
        assert_eq!("1.0".parse::<TemperatureLevel>(), Ok(TemperatureLevel::Nominal));
        assert!("hot".parse::<TemperatureLevel>().is_err());
        assert!("2.5".parse::<TemperatureLevel>().is_err());
    }

    #[test]
    fn temperature_rank_order() {
        assert!(TemperatureLevel::Nominal < TemperatureLevel::Fair);
        assert!(TemperatureLevel::Serious < TemperatureLevel::Critical);
    }

    #[test]
    fn temperature_json_accepts_both_encodings() {
        let a: TemperatureLevel = serde_json::from_str("\"fair\"").unwrap();
        let b: TemperatureLevel = serde_json::from_str("2").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"fair\"");
        assert!(serde_json::from_str::<TemperatureLevel>("9").is_err());
    }

    #[test]
    fn feedback_roundtrip_str() {
        assert_eq!("UP".parse::<Feedback>(), Ok(Feedback::Up));
        assert_eq!(Feedback::Down.to_string(), "down");
        assert!("meh".parse::<Feedback>().is_err());
    }

    #[test]
    fn crashed_requires_non_empty_log() {
        let r = Record::new("r1", "q1", "m", 10.0, "d", "1.0");
        assert!(!r.crashed());
        let r = r.with_crash_log("");
        assert!(!r.crashed());
        let r = r.with_crash_log("SIGABRT");
        assert!(r.crashed());
    }

    #[test]
    fn record_json_optional_fields_default_to_none() {
        let json = r#"{"run_id":"r","request_id":"q","model_name":"m",
            "latency_ms":1.5,"device_model":"d","app_version":"v"}"#;
        let r: Record = serde_json::from_str(json).unwrap();
        assert_eq!(r.crash_log, None);
        assert_eq!(r.device_temperature, None);
        assert_eq!(r.battery_percentage, None);
    }
}
