//! `latencylog clear`: truncate the store to its header row.

use std::path::Path;

use latencylog_core::IngestGateway;

pub fn run(csv: &Path) {
    let gateway = IngestGateway::new(super::open_store(csv));
    let before = gateway.count().unwrap_or_else(|e| super::fail(e));
    let receipt = gateway.clear().unwrap_or_else(|e| super::fail(e));
    println!("{} ({before} records removed from {})", receipt.message, receipt.csv_file);
}
