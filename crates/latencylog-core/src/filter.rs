//! Record filtering and filter facets.
//!
//! Each supplied criterion is ANDed with the others; `None` means "no
//! constraint on this dimension". `Some(empty set)` matches nothing. Records
//! missing an optional value never match a criterion on that value.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::record::{Feedback, Record, TemperatureLevel};

/// Conjunctive filter over records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub models: Option<BTreeSet<String>>,
    pub devices: Option<BTreeSet<String>>,
    pub versions: Option<BTreeSet<String>>,
    pub feedback: Option<BTreeSet<Feedback>>,
    pub temperature_levels: Option<BTreeSet<TemperatureLevel>>,
    /// Inclusive on both ends.
    pub battery_range: Option<(f64, f64)>,
    #[serde(default)]
    pub crashed_only: bool,
}

impl FilterSpec {
    /// True when no criterion is set.
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, r: &Record) -> bool {
        fn member<T: Ord>(set: &Option<BTreeSet<T>>, value: &T) -> bool {
            set.as_ref().is_none_or(|s| s.contains(value))
        }
        fn member_opt<T: Ord>(set: &Option<BTreeSet<T>>, value: Option<&T>) -> bool {
            match set {
                None => true,
                Some(s) => value.is_some_and(|v| s.contains(v)),
            }
        }

        member(&self.models, &r.model_name)
            && member(&self.devices, &r.device_model)
            && member(&self.versions, &r.app_version)
            && member_opt(&self.feedback, r.user_feedback.as_ref())
            && member_opt(&self.temperature_levels, r.device_temperature.as_ref())
            && self.battery_range.is_none_or(|(lo, hi)| {
                r.battery_percentage.is_some_and(|b| b >= lo && b <= hi)
            })
            && (!self.crashed_only || r.crashed())
    }
}

/// Records matching `spec`, in their original order.
pub fn filter(records: &[Record], spec: &FilterSpec) -> Vec<Record> {
    if spec.is_unconstrained() {
        return records.to_vec();
    }
    records.iter().filter(|r| spec.matches(r)).cloned().collect()
}

/// Distinct values available to build a [`FilterSpec`] from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facets {
    pub models: Vec<String>,
    pub devices: Vec<String>,
    pub versions: Vec<String>,
    pub feedback: Vec<Feedback>,
    pub temperature_levels: Vec<TemperatureLevel>,
    /// First-seen order.
    pub run_ids: Vec<String>,
    pub battery_min: Option<f64>,
    pub battery_max: Option<f64>,
}

pub fn facets(records: &[Record]) -> Facets {
    let mut models = BTreeSet::new();
    let mut devices = BTreeSet::new();
    let mut versions = BTreeSet::new();
    let mut feedback = BTreeSet::new();
    let mut temps = BTreeSet::new();
    let mut run_ids: Vec<String> = Vec::new();
    let mut battery_min: Option<f64> = None;
    let mut battery_max: Option<f64> = None;

    for r in records {
        models.insert(r.model_name.clone());
        devices.insert(r.device_model.clone());
        versions.insert(r.app_version.clone());
        if let Some(f) = r.user_feedback {
            feedback.insert(f);
        }
        if let Some(t) = r.device_temperature {
            temps.insert(t);
        }
        if !run_ids.contains(&r.run_id) {
            run_ids.push(r.run_id.clone());
        }
        if let Some(b) = r.battery_percentage {
            battery_min = Some(battery_min.map_or(b, |m| m.min(b)));
            battery_max = Some(battery_max.map_or(b, |m| m.max(b)));
        }
    }

    Facets {
        models: models.into_iter().collect(),
        devices: devices.into_iter().collect(),
        versions: versions.into_iter().collect(),
        feedback: feedback.into_iter().collect(),
        temperature_levels: temps.into_iter().collect(),
        run_ids,
        battery_min,
        battery_max,
    }
}
