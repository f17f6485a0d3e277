//! `latencylog generate`: submit a synthetic batch with random latency.

use std::path::Path;

use rand::Rng;
use uuid::Uuid;

use latencylog_core::{IngestGateway, Record};

/// Settings for one generated batch.
pub struct GenerateConfig<'a> {
    pub csv: &'a Path,
    pub count: usize,
    pub model: &'a str,
    pub device: &'a str,
    pub version: &'a str,
    pub latency_min: f64,
    pub latency_max: f64,
    pub run_id: Option<&'a str>,
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// `req_` followed by 8 hex digits.
pub fn request_id() -> String {
    format!("req_{}", short_id())
}

/// Build `count` records with latency drawn uniformly from
/// `[latency_min, latency_max]`, rounded to one decimal.
fn synthesize(config: &GenerateConfig<'_>, run_id: &str) -> Vec<Record> {
    let mut rng = rand::rng();
    (0..config.count)
        .map(|_| {
            let latency = rng.random_range(config.latency_min..=config.latency_max);
            Record::new(
                run_id,
                request_id(),
                config.model,
                (latency * 10.0).round() / 10.0,
                config.device,
                config.version,
            )
        })
        .collect()
}

pub fn run(config: GenerateConfig<'_>) {
    if !(config.latency_min.is_finite() && config.latency_max.is_finite()) {
        super::fail("latency bounds must be finite");
    }
    if config.latency_min < 0.0 || config.latency_min > config.latency_max {
        super::fail(format!(
            "invalid latency range {}..{}",
            config.latency_min, config.latency_max
        ));
    }

    let run_id = config
        .run_id
        .map_or_else(|| format!("run_{}", short_id()), str::to_string);
    let records = synthesize(&config, &run_id);

    let gateway = IngestGateway::new(super::open_store(config.csv));
    let report = gateway.submit_batch(records);

    println!(
        "Submitted {}/{} records for run {run_id} ({} on {} v{})",
        report.appended, report.submitted, config.model, config.device, config.version
    );
    if let Some(failure) = report.failures.first() {
        eprintln!(
            "Stopped at record {}: {} ({} not attempted)",
            failure.index,
            failure.error,
            report.not_attempted()
        );
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_shape() {
        let id = request_id();
        assert_eq!(id.len(), 12);
        assert!(id.starts_with("req_"));
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn synthesized_latency_in_range_and_rounded() {
        let config = GenerateConfig {
            csv: Path::new("unused.csv"),
            count: 200,
            model: "gemma3",
            device: "Pixel 8",
            version: "1.0.0",
            latency_min: 100.0,
            latency_max: 150.0,
            run_id: None,
        };
        let records = synthesize(&config, "run_x");
        assert_eq!(records.len(), 200);
        for r in &records {
            assert!((100.0..=150.0).contains(&r.latency_ms));
            assert!(((r.latency_ms * 10.0).round() - r.latency_ms * 10.0).abs() < 1e-6);
            assert_eq!(r.run_id, "run_x");
        }
    }
}
