//! `latencylog count`: number of stored records.

use std::path::Path;

pub fn run(csv: &Path) {
    let count = super::open_store(csv)
        .count()
        .unwrap_or_else(|e| super::fail(e));
    println!("{count} records in {}", csv.display());
}
