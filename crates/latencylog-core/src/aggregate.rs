//! Aggregation engine: grouped summaries over a record sequence.
//!
//! Every function here is pure. Callers pass an already filtered slice and
//! get a fresh summary back; nothing is cached between calls. Empty input
//! yields a summary with `count == 0` and `None` statistics.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::record::{Feedback, Record, TemperatureLevel};
use crate::stats;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Latency distribution of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p95: Option<f64>,
}

impl LatencyStats {
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            mean: stats::mean(values),
            min: stats::min(values),
            max: stats::max(values),
            p95: stats::p95(values),
        }
    }
}

/// Metrics shared by every grouping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupMetrics {
    pub count: usize,
    pub latency: LatencyStats,
    pub dominant_temperature: Option<TemperatureLevel>,
    pub mean_battery: Option<f64>,
    pub crash_rate_pct: Option<f64>,
    /// Absent feedback counts as not-up.
    pub feedback_positive_pct: Option<f64>,
}

impl GroupMetrics {
    fn compute(records: &[&Record]) -> Self {
        let latencies: Vec<f64> = records.iter().map(|r| r.latency_ms).collect();
        let batteries: Vec<f64> = records.iter().filter_map(|r| r.battery_percentage).collect();
        let crashes = records.iter().filter(|r| r.crashed()).count();
        let ups = records.iter().filter(|r| r.feedback_up()).count();

        Self {
            count: records.len(),
            latency: LatencyStats::from_values(&latencies),
            dominant_temperature: dominant_temperature(records),
            mean_battery: stats::mean(&batteries),
            crash_rate_pct: stats::rate_pct(crashes, records.len()),
            feedback_positive_pct: stats::rate_pct(ups, records.len()),
        }
    }
}

/// Overview of a whole record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalSummary {
    pub count: usize,
    pub latency: LatencyStats,
    /// Distinct values in first-seen order.
    pub run_ids: Vec<String>,
    pub models: Vec<String>,
    pub devices: Vec<String>,
    pub versions: Vec<String>,
    pub crash_rate_pct: Option<f64>,
    pub feedback_positive_pct: Option<f64>,
    pub dominant_temperature: Option<TemperatureLevel>,
    pub mean_battery: Option<f64>,
}

impl GlobalSummary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub model_name: String,
    #[serde(flatten)]
    pub metrics: GroupMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    /// Most frequent model within the run.
    pub dominant_model: Option<String>,
    #[serde(flatten)]
    pub metrics: GroupMetrics,
}

/// One run's summary plus first-to-last deltas in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunComparison {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub battery_drain: Option<f64>,
    pub temperature_rise: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrashEntry {
    pub run_id: String,
    pub request_id: String,
    pub crash_log: String,
}

/// Cross-run comparison over the requested run ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// One entry per requested run id, in request order.
    pub runs: Vec<RunComparison>,
    pub correlation: CorrelationMatrix,
    pub crashes: Vec<CrashEntry>,
}

/// Counts of up / down / absent feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackCounts {
    pub up: usize,
    pub down: usize,
    pub none: usize,
}

impl FeedbackCounts {
    fn tally<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut counts = Self::default();
        for r in records {
            match r.user_feedback {
                Some(Feedback::Up) => counts.up += 1,
                Some(Feedback::Down) => counts.down += 1,
                None => counts.none += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFeedback {
    pub model_name: String,
    #[serde(flatten)]
    pub counts: FeedbackCounts,
}

/// A point of a run's request timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub request_id: String,
    pub latency_ms: f64,
    pub battery_percentage: Option<f64>,
    pub temp_score: Option<f64>,
}

/// Drill-down into a single run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunDetail {
    pub summary: RunSummary,
    pub timeline: Vec<TimelinePoint>,
    pub feedback: FeedbackCounts,
    pub crashes: Vec<CrashEntry>,
}

impl RunDetail {
    pub fn is_empty(&self) -> bool {
        self.summary.metrics.count == 0
    }
}

// ---------------------------------------------------------------------------
// Numeric fields and correlation
// ---------------------------------------------------------------------------

/// Numeric projections of a record usable in a correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    LatencyMs,
    BatteryPercentage,
    TempScore,
}

impl NumericField {
    pub const ALL: [Self; 3] = [Self::LatencyMs, Self::BatteryPercentage, Self::TempScore];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LatencyMs => "latency_ms",
            Self::BatteryPercentage => "battery_percentage",
            Self::TempScore => "temp_score",
        }
    }

    pub fn value(self, record: &Record) -> Option<f64> {
        match self {
            Self::LatencyMs => Some(record.latency_ms),
            Self::BatteryPercentage => record.battery_percentage,
            Self::TempScore => record.temp_score(),
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumericField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latency_ms" | "latency" => Ok(Self::LatencyMs),
            "battery_percentage" | "battery" => Ok(Self::BatteryPercentage),
            "temp_score" | "device_temperature" | "temperature" => Ok(Self::TempScore),
            other => Err(format!(
                "unknown numeric field {other:?} (expected latency_ms, battery_percentage or temp_score)"
            )),
        }
    }
}

/// Pairwise Pearson coefficients, `coefficients[i][j]` for
/// `fields[i]` x `fields[j]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<NumericField>,
    /// Rows where every requested field was present.
    pub rows_used: usize,
    pub coefficients: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: NumericField, b: NumericField) -> Option<f64> {
        let i = self.fields.iter().position(|&f| f == a)?;
        let j = self.fields.iter().position(|&f| f == b)?;
        self.coefficients[i][j]
    }
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

/// Mode over the stored labels, so ties go to the alphabetically first
/// label (critical < fair < nominal < serious), not the least severe.
fn dominant_temperature(records: &[&Record]) -> Option<TemperatureLevel> {
    let labels = records
        .iter()
        .filter_map(|r| r.device_temperature.map(TemperatureLevel::label));
    stats::mode(labels).and_then(|label| label.parse().ok())
}

/// `last - first` over the run's first and last records in file order.
/// Undefined when either end lacks the field.
fn endpoint_delta(group: &[&Record], field: NumericField) -> Option<f64> {
    let first = field.value(group.first()?)?;
    let last = field.value(group.last()?)?;
    stats::delta(&[first, last])
}

fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out
}

fn group_by<'a, F>(records: &'a [Record], key: F) -> BTreeMap<&'a str, Vec<&'a Record>>
where
    F: Fn(&'a Record) -> &'a str,
{
    let mut groups: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for r in records {
        groups.entry(key(r)).or_default().push(r);
    }
    groups
}

fn run_summary(run_id: &str, records: &[&Record]) -> RunSummary {
    RunSummary {
        run_id: run_id.to_string(),
        dominant_model: stats::mode(records.iter().map(|r| r.model_name.as_str()))
            .map(str::to_string),
        metrics: GroupMetrics::compute(records),
    }
}

fn crash_entries<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<CrashEntry> {
    records
        .into_iter()
        .filter_map(|r| match &r.crash_log {
            Some(log) if !log.is_empty() => Some(CrashEntry {
                run_id: r.run_id.clone(),
                request_id: r.request_id.clone(),
                crash_log: log.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Whole-set overview.
pub fn global_summary(records: &[Record]) -> GlobalSummary {
    let all: Vec<&Record> = records.iter().collect();
    let metrics = GroupMetrics::compute(&all);

    GlobalSummary {
        count: metrics.count,
        latency: metrics.latency,
        run_ids: distinct(records.iter().map(|r| &r.run_id)),
        models: distinct(records.iter().map(|r| &r.model_name)),
        devices: distinct(records.iter().map(|r| &r.device_model)),
        versions: distinct(records.iter().map(|r| &r.app_version)),
        crash_rate_pct: metrics.crash_rate_pct,
        feedback_positive_pct: metrics.feedback_positive_pct,
        dominant_temperature: metrics.dominant_temperature,
        mean_battery: metrics.mean_battery,
    }
}

/// One summary per distinct model, sorted by model name.
pub fn group_by_model(records: &[Record]) -> Vec<ModelSummary> {
    group_by(records, |r| r.model_name.as_str())
        .into_iter()
        .map(|(model, group)| ModelSummary {
            model_name: model.to_string(),
            metrics: GroupMetrics::compute(&group),
        })
        .collect()
}

/// One summary per distinct run, sorted by run id.
pub fn group_by_run(records: &[Record]) -> Vec<RunSummary> {
    group_by(records, |r| r.run_id.as_str())
        .into_iter()
        .map(|(run_id, group)| run_summary(run_id, &group))
        .collect()
}

/// Compare the requested runs. Only records of those runs are considered;
/// a requested id with no records gets a zero-count entry. Duplicate ids
/// are reported once.
pub fn compare_runs<S: AsRef<str>>(records: &[Record], run_ids: &[S]) -> Comparison {
    let mut requested: Vec<&str> = Vec::new();
    for id in run_ids {
        let id = id.as_ref();
        if !requested.contains(&id) {
            requested.push(id);
        }
    }

    let subset: Vec<Record> = records
        .iter()
        .filter(|r| requested.contains(&r.run_id.as_str()))
        .cloned()
        .collect();

    let runs = requested
        .iter()
        .map(|&run_id| {
            let group: Vec<&Record> = subset.iter().filter(|r| r.run_id == run_id).collect();
            RunComparison {
                summary: run_summary(run_id, &group),
                battery_drain: endpoint_delta(&group, NumericField::BatteryPercentage),
                temperature_rise: endpoint_delta(&group, NumericField::TempScore),
            }
        })
        .collect();

    Comparison {
        runs,
        correlation: correlation_matrix(&subset, &NumericField::ALL),
        crashes: crash_entries(&subset),
    }
}

/// Pearson matrix over `fields`, using only rows where every field is
/// present.
pub fn correlation_matrix(records: &[Record], fields: &[NumericField]) -> CorrelationMatrix {
    let rows: Vec<Vec<f64>> = records
        .iter()
        .filter_map(|r| fields.iter().map(|f| f.value(r)).collect::<Option<Vec<f64>>>())
        .collect();

    let columns: Vec<Vec<f64>> = (0..fields.len())
        .map(|i| rows.iter().map(|row| row[i]).collect())
        .collect();

    let coefficients = columns
        .iter()
        .map(|a| columns.iter().map(|b| stats::pearson(a, b)).collect())
        .collect();

    CorrelationMatrix {
        fields: fields.to_vec(),
        rows_used: rows.len(),
        coefficients,
    }
}

/// Drill-down for one run. An unknown run yields an empty detail.
pub fn run_detail(records: &[Record], run_id: &str) -> RunDetail {
    let group: Vec<&Record> = records.iter().filter(|r| r.run_id == run_id).collect();

    RunDetail {
        summary: run_summary(run_id, &group),
        timeline: group
            .iter()
            .map(|r| TimelinePoint {
                request_id: r.request_id.clone(),
                latency_ms: r.latency_ms,
                battery_percentage: r.battery_percentage,
                temp_score: r.temp_score(),
            })
            .collect(),
        feedback: FeedbackCounts::tally(group.iter().copied()),
        crashes: crash_entries(group.iter().copied()),
    }
}

/// Feedback counts per model, sorted by model name.
pub fn feedback_by_model(records: &[Record]) -> Vec<ModelFeedback> {
    group_by(records, |r| r.model_name.as_str())
        .into_iter()
        .map(|(model, group)| ModelFeedback {
            model_name: model.to_string(),
            counts: FeedbackCounts::tally(group),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
