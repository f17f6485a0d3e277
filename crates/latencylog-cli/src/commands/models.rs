//! `latencylog models`: per-model summary and feedback breakdown.

use std::path::Path;

use latencylog_core::aggregate::{feedback_by_model, group_by_model};

use super::{FilterArgs, label, num, pct};

pub fn run(csv: &Path, filters: &FilterArgs, json: bool) {
    let records = super::load(csv, filters);
    let models = group_by_model(&records);
    let feedback = feedback_by_model(&records);

    if json {
        super::print_json(&serde_json::json!({ "models": models, "feedback": feedback }));
        return;
    }

    if models.is_empty() {
        println!("No records.");
        return;
    }

    println!(
        "{:<28} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>8} {:>8} {:>9}",
        "Model", "N", "Mean", "Min", "Max", "P95", "Temp", "Battery", "Crash", "Up"
    );
    println!("{}", "-".repeat(112));
    for m in &models {
        let g = &m.metrics;
        println!(
            "{:<28} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>8} {:>8} {:>9}",
            m.model_name,
            g.count,
            num(g.latency.mean, 1),
            num(g.latency.min, 1),
            num(g.latency.max, 1),
            num(g.latency.p95, 1),
            label(g.dominant_temperature),
            num(g.mean_battery, 1),
            pct(g.crash_rate_pct),
            pct(g.feedback_positive_pct),
        );
    }

    println!();
    println!("{:<28} {:>6} {:>6} {:>6}", "Feedback", "up", "down", "none");
    for f in &feedback {
        println!(
            "{:<28} {:>6} {:>6} {:>6}",
            f.model_name, f.counts.up, f.counts.down, f.counts.none
        );
    }
}
