//! `latencylog run <id>`: drill into one run.

use std::path::Path;

use latencylog_core::aggregate::run_detail;

use super::{FilterArgs, label, num, pct};

pub fn run(csv: &Path, run_id: &str, filters: &FilterArgs, json: bool) {
    let records = super::load(csv, filters);
    let detail = run_detail(&records, run_id);

    if json {
        super::print_json(&detail);
        return;
    }

    if detail.is_empty() {
        println!("No records for run {run_id}.");
        return;
    }

    let s = &detail.summary;
    let g = &s.metrics;
    println!("Run {run_id}");
    println!("  model           {}", s.dominant_model.as_deref().unwrap_or("-"));
    println!("  records         {}", g.count);
    println!(
        "  latency ms      mean {} / min {} / max {} / p95 {}",
        num(g.latency.mean, 1),
        num(g.latency.min, 1),
        num(g.latency.max, 1),
        num(g.latency.p95, 1)
    );
    println!("  mean battery    {}", num(g.mean_battery, 1));
    println!("  dominant temp   {}", label(g.dominant_temperature));
    println!("  crash rate      {}", pct(g.crash_rate_pct));
    println!(
        "  feedback        up {} / down {} / none {}",
        detail.feedback.up, detail.feedback.down, detail.feedback.none
    );

    println!();
    println!("{:<20} {:>10} {:>9} {:>6}", "Request", "Latency", "Battery", "Temp");
    for p in &detail.timeline {
        println!(
            "{:<20} {:>10} {:>9} {:>6}",
            p.request_id,
            num(Some(p.latency_ms), 1),
            num(p.battery_percentage, 1),
            num(p.temp_score, 0)
        );
    }

    if !detail.crashes.is_empty() {
        println!();
        println!("Crashes:");
        for c in &detail.crashes {
            println!("  {}: {}", c.request_id, c.crash_log.replace('\n', " | "));
        }
    }
}
