pub mod clear;
pub mod compare;
pub mod correlate;
pub mod count;
pub mod detail;
pub mod facets;
pub mod generate;
pub mod import;
pub mod models;
pub mod runs;
pub mod serve;
pub mod stats;
pub mod submit;

use std::collections::BTreeSet;
use std::path::Path;

use clap::Args;
use serde::Serialize;

use latencylog_core::filter::filter;
use latencylog_core::{Feedback, FilterSpec, Record, RecordStore, StoreConfig, TemperatureLevel};

/// Filter flags shared by the query commands.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Only these models (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Only these device models (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub devices: Option<Vec<String>>,

    /// Only these app versions (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub versions: Option<Vec<String>>,

    /// Only these feedback values: up, down
    #[arg(long, value_delimiter = ',')]
    pub feedback: Option<Vec<Feedback>>,

    /// Only these temperature levels (labels or 1-4)
    #[arg(long = "temperatures", value_delimiter = ',')]
    pub temperatures: Option<Vec<TemperatureLevel>>,

    /// Minimum battery percentage, inclusive
    #[arg(long)]
    pub battery_min: Option<f64>,

    /// Maximum battery percentage, inclusive
    #[arg(long)]
    pub battery_max: Option<f64>,

    /// Only records with a crash log
    #[arg(long)]
    pub crashed_only: bool,
}

fn to_set<T: Ord + Clone>(values: &Option<Vec<T>>) -> Option<BTreeSet<T>> {
    values.as_ref().map(|v| v.iter().cloned().collect())
}

impl FilterArgs {
    pub fn to_spec(&self) -> Result<FilterSpec, String> {
        let battery_range = match (self.battery_min, self.battery_max) {
            (None, None) => None,
            (lo, hi) => {
                let (lo, hi) = (lo.unwrap_or(0.0), hi.unwrap_or(100.0));
                if lo > hi {
                    return Err(format!("--battery-min {lo} exceeds --battery-max {hi}"));
                }
                Some((lo, hi))
            }
        };
        Ok(FilterSpec {
            models: to_set(&self.models),
            devices: to_set(&self.devices),
            versions: to_set(&self.versions),
            feedback: to_set(&self.feedback),
            temperature_levels: to_set(&self.temperatures),
            battery_range,
            crashed_only: self.crashed_only,
        })
    }
}

/// Print to stderr and exit non-zero.
pub fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

pub fn open_store(csv: &Path) -> RecordStore {
    RecordStore::new(StoreConfig::new(csv))
}

/// Read every record and apply `filters`.
pub fn load(csv: &Path, filters: &FilterArgs) -> Vec<Record> {
    let spec = filters.to_spec().unwrap_or_else(|e| fail(e));
    let records = open_store(csv).read_all().unwrap_or_else(|e| fail(e));
    let subset = filter(&records, &spec);
    if subset.is_empty() {
        log::warn!("no records match the query ({} stored)", records.len());
    }
    subset
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => fail(format!("failed to encode JSON: {e}")),
    }
}

/// Format an optional number, `-` when undefined.
pub fn num(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "-".to_string(),
    }
}

pub fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}%"),
        None => "-".to_string(),
    }
}

pub fn label<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_bounds_default_to_full_range() {
        let args = FilterArgs {
            battery_min: Some(20.0),
            ..Default::default()
        };
        assert_eq!(args.to_spec().unwrap().battery_range, Some((20.0, 100.0)));
    }

    #[test]
    fn inverted_battery_bounds_rejected() {
        let args = FilterArgs {
            battery_min: Some(80.0),
            battery_max: Some(10.0),
            ..Default::default()
        };
        assert!(args.to_spec().is_err());
    }

    #[test]
    fn lists_become_sets() {
        let args = FilterArgs {
            models: Some(vec!["b".into(), "a".into(), "b".into()]),
            feedback: Some(vec![Feedback::Up]),
            ..Default::default()
        };
        let spec = args.to_spec().unwrap();
        assert_eq!(spec.models.unwrap().len(), 2);
        assert!(spec.devices.is_none());
        assert!(spec.feedback.unwrap().contains(&Feedback::Up));
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(num(Some(12.345), 1), "12.3");
        assert_eq!(num(None, 1), "-");
        assert_eq!(pct(Some(50.0)), "50.0%");
        assert_eq!(label(Some(TemperatureLevel::Fair)), "fair");
        assert_eq!(label::<TemperatureLevel>(None), "-");
    }
}
