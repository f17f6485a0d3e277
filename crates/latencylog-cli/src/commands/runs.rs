//! `latencylog runs`: per-run summary.

use std::path::Path;

use latencylog_core::aggregate::group_by_run;

use super::{FilterArgs, label, num, pct};

pub fn run(csv: &Path, filters: &FilterArgs, json: bool) {
    let records = super::load(csv, filters);
    let runs = group_by_run(&records);

    if json {
        super::print_json(&runs);
        return;
    }

    if runs.is_empty() {
        println!("No records.");
        return;
    }

    println!(
        "{:<16} {:<24} {:>6} {:>9} {:>9} {:>9} {:>8} {:>8}",
        "Run", "Model", "N", "Mean ms", "Temp", "Battery", "Crash", "Up"
    );
    println!("{}", "-".repeat(96));
    for r in &runs {
        let g = &r.metrics;
        println!(
            "{:<16} {:<24} {:>6} {:>9} {:>9} {:>9} {:>8} {:>8}",
            r.run_id,
            r.dominant_model.as_deref().unwrap_or("-"),
            g.count,
            num(g.latency.mean, 1),
            label(g.dominant_temperature),
            num(g.mean_battery, 1),
            pct(g.crash_rate_pct),
            pct(g.feedback_positive_pct),
        );
    }
}
