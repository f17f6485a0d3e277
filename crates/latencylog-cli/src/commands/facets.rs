//! `latencylog facets`: distinct values available for filtering.

use std::path::Path;

use super::num;

pub fn run(csv: &Path, json: bool) {
    let records = super::open_store(csv)
        .read_all()
        .unwrap_or_else(|e| super::fail(e));
    let f = latencylog_core::facets(&records);

    if json {
        super::print_json(&f);
        return;
    }

    let join = |items: Vec<String>| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };

    println!("models:        {}", join(f.models));
    println!("devices:       {}", join(f.devices));
    println!("versions:      {}", join(f.versions));
    println!("feedback:      {}", join(f.feedback.iter().map(|v| v.to_string()).collect()));
    println!(
        "temperatures:  {}",
        join(f.temperature_levels.iter().map(|v| v.to_string()).collect())
    );
    println!("runs:          {}", join(f.run_ids));
    println!("battery:       {} .. {}", num(f.battery_min, 1), num(f.battery_max, 1));
}
