//! `latencylog import`: convert a raw telemetry dump into a CSV file.

use std::path::Path;

pub fn run(input: &Path, output: &Path, run_id: &str) {
    match latencylog_core::import::convert(input, output, run_id) {
        Ok(n) => {
            println!("Converted {n} records from {}", input.display());
            println!("   run id: {run_id}");
            println!("   output: {}", output.display());
        }
        Err(e) => super::fail(e),
    }
}
