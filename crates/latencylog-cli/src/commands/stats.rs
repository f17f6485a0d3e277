//! `latencylog stats`: global summary.

use std::path::Path;

use latencylog_core::aggregate::global_summary;

use super::{FilterArgs, label, num, pct};

pub fn run(csv: &Path, filters: &FilterArgs, json: bool) {
    let records = super::load(csv, filters);
    let s = global_summary(&records);

    if json {
        super::print_json(&s);
        return;
    }

    if s.is_empty() {
        println!("No records.");
        return;
    }

    println!("Records:          {}", s.count);
    println!("Runs:             {}", s.run_ids.join(", "));
    println!("Models:           {}", s.models.join(", "));
    println!("Devices:          {}", s.devices.join(", "));
    println!("Versions:         {}", s.versions.join(", "));
    println!();
    println!("Latency (ms)");
    println!("  mean            {}", num(s.latency.mean, 1));
    println!("  min             {}", num(s.latency.min, 1));
    println!("  max             {}", num(s.latency.max, 1));
    println!("  p95             {}", num(s.latency.p95, 1));
    println!();
    println!("Crash rate:       {}", pct(s.crash_rate_pct));
    println!("Feedback up:      {}", pct(s.feedback_positive_pct));
    println!("Dominant temp:    {}", label(s.dominant_temperature));
    println!("Mean battery:     {}", num(s.mean_battery, 1));
}
