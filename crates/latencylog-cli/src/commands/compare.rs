//! `latencylog compare`: side-by-side run comparison.

use std::path::Path;

use latencylog_core::aggregate::compare_runs;

use super::{FilterArgs, label, num, pct};

pub fn run(csv: &Path, run_ids: &[String], filters: &FilterArgs, json: bool) {
    let records = super::load(csv, filters);
    let cmp = compare_runs(&records, run_ids);

    if json {
        super::print_json(&cmp);
        return;
    }

    println!(
        "{:<16} {:<24} {:>6} {:>9} {:>9} {:>9} {:>8} {:>8} {:>8} {:>6}",
        "Run", "Model", "N", "Mean ms", "Temp", "Battery", "Crash", "Up", "Drain", "Rise"
    );
    println!("{}", "-".repeat(112));
    for r in &cmp.runs {
        let s = &r.summary;
        let g = &s.metrics;
        println!(
            "{:<16} {:<24} {:>6} {:>9} {:>9} {:>9} {:>8} {:>8} {:>8} {:>6}",
            s.run_id,
            s.dominant_model.as_deref().unwrap_or("-"),
            g.count,
            num(g.latency.mean, 1),
            label(g.dominant_temperature),
            num(g.mean_battery, 1),
            pct(g.crash_rate_pct),
            pct(g.feedback_positive_pct),
            num(r.battery_drain, 1),
            num(r.temperature_rise, 0),
        );
    }

    println!();
    super::correlate::print_matrix(&cmp.correlation);

    if !cmp.crashes.is_empty() {
        println!();
        println!("Crashes:");
        for c in &cmp.crashes {
            println!(
                "  [{}] {}: {}",
                c.run_id,
                c.request_id,
                c.crash_log.replace('\n', " | ")
            );
        }
    }
}
