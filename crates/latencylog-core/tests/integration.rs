//! Integration tests for latencylog-core.
//!
//! These tests drive the full pipeline against a real file:
//! gateway → store → filter → aggregation.

use std::collections::BTreeSet;

use latencylog_core::{
    Feedback, FilterSpec, IngestGateway, Record, RecordStore, StoreConfig, TemperatureLevel,
    compare_runs, filter::filter, global_summary, group_by_model, group_by_run,
};

fn temp_gateway() -> (tempfile::TempDir, IngestGateway) {
    let tmp = tempfile::tempdir().unwrap();
    let store = RecordStore::new(StoreConfig::new(tmp.path().join("latency_logs.csv")));
    (tmp, IngestGateway::new(store))
}

fn synthetic(i: usize) -> Record {
    let models = ["gemma3", "LFM2-VL-450M", "qwen2.5"];
    let temps = TemperatureLevel::ALL;
    let mut r = Record::new(
        format!("run-{}", i % 4),
        format!("req_{i:08x}"),
        models[i % models.len()],
        50.0 + (i % 97) as f64 * 3.5,
        if i % 2 == 0 { "iPhone 15" } else { "Pixel 8" },
        "2.1.0",
    );
    if i % 5 != 0 {
        r = r.with_battery(100.0 - (i % 100) as f64);
    }
    if i % 3 == 0 {
        r = r.with_temperature(temps[i % temps.len()]);
    }
    if i % 7 == 0 {
        r = r.with_crash_log(format!("EXC_BAD_ACCESS at frame {i},\n\"thread\" {}", i % 4));
    }
    match i % 4 {
        0 => r.with_feedback(Feedback::Up),
        1 => r.with_feedback(Feedback::Down),
        _ => r,
    }
}

#[test]
fn round_trip_preserves_records() {
    for n in [0usize, 1, 1000] {
        let (_tmp, gw) = temp_gateway();
        let records: Vec<Record> = (0..n).map(synthetic).collect();
        let report = gw.submit_batch(records.clone());
        assert!(report.is_complete(), "batch of {n} did not complete");

        let back = gw.store().read_all().unwrap();
        assert_eq!(back.len(), n);
        assert_eq!(back, records, "round trip of {n} records differs");
        assert_eq!(gw.count().unwrap(), n);
    }
}

#[test]
fn clear_then_read_is_empty() {
    let (_tmp, gw) = temp_gateway();
    gw.submit_batch((0..25).map(synthetic).collect());
    gw.clear().unwrap();
    assert!(gw.store().read_all().unwrap().is_empty());
    assert!(global_summary(&gw.store().read_all().unwrap()).is_empty());
}

#[test]
fn mean_lies_between_min_and_max() {
    let records: Vec<Record> = (0..300).map(synthetic).collect();
    let s = global_summary(&records);
    let (mean, min, max) = (
        s.latency.mean.unwrap(),
        s.latency.min.unwrap(),
        s.latency.max.unwrap(),
    );
    assert!(min <= mean && mean <= max, "{min} <= {mean} <= {max}");
    assert!(s.latency.p95.unwrap() <= max);
}

#[test]
fn batch_with_invalid_middle_record_persists_only_prefix() {
    let (_tmp, gw) = temp_gateway();
    let mut bad = synthetic(2);
    bad.latency_ms = -1.0;
    let report = gw.submit_batch(vec![synthetic(1), bad, synthetic(3)]);

    assert_eq!(report.appended, 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.not_attempted(), 1);
    assert_eq!(gw.store().read_all().unwrap(), vec![synthetic(1)]);
}

#[test]
fn groups_partition_filtered_records() {
    let records: Vec<Record> = (0..200).map(synthetic).collect();
    let spec = FilterSpec {
        devices: Some(BTreeSet::from(["Pixel 8".to_string()])),
        battery_range: Some((20.0, 80.0)),
        ..Default::default()
    };
    let subset = filter(&records, &spec);
    assert!(!subset.is_empty());
    assert!(subset.iter().all(|r| r.device_model == "Pixel 8"));

    let by_model: usize = group_by_model(&subset).iter().map(|g| g.metrics.count).sum();
    let by_run: usize = group_by_run(&subset).iter().map(|g| g.metrics.count).sum();
    assert_eq!(by_model, subset.len());
    assert_eq!(by_run, subset.len());
}

#[test]
fn compare_runs_reads_back_from_disk() {
    let (_tmp, gw) = temp_gateway();
    for (i, battery) in [80.0, 75.0, 60.0].into_iter().enumerate() {
        let r = Record::new("8", format!("req_{i}"), "gemma3", 100.0, "iPhone 15", "2.0.0")
            .with_battery(battery);
        gw.submit(r).unwrap();
    }
    gw.submit(Record::new("9", "req_x", "qwen", 90.0, "Pixel 8", "2.0.0").with_battery(50.0))
        .unwrap();

    let records = gw.store().read_all().unwrap();
    let cmp = compare_runs(&records, &["8", "9"]);
    assert_eq!(cmp.runs[0].battery_drain, Some(-20.0));
    assert_eq!(cmp.runs[1].battery_drain, Some(0.0));
    assert_eq!(cmp.correlation.rows_used, 0);
}
