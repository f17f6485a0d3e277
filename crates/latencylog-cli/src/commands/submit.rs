//! `latencylog submit`: validate and append one record.

use std::path::Path;

use latencylog_core::{Feedback, IngestGateway, Record, TemperatureLevel};

pub struct SubmitArgs {
    pub run_id: String,
    pub request_id: Option<String>,
    pub model: String,
    pub latency: f64,
    pub device: String,
    pub app_version: String,
    pub crash_log: Option<String>,
    pub feedback: Option<Feedback>,
    pub temperature: Option<TemperatureLevel>,
    pub battery: Option<f64>,
}

impl SubmitArgs {
    fn into_record(self) -> Record {
        let request_id = self
            .request_id
            .unwrap_or_else(super::generate::request_id);
        let mut record = Record::new(
            self.run_id,
            request_id,
            self.model,
            self.latency,
            self.device,
            self.app_version,
        );
        if let Some(log) = self.crash_log {
            record = record.with_crash_log(log);
        }
        record.user_feedback = self.feedback;
        record.device_temperature = self.temperature;
        record.battery_percentage = self.battery;
        record
    }
}

pub fn run(csv: &Path, args: SubmitArgs) {
    let gateway = IngestGateway::new(super::open_store(csv));
    match gateway.submit(args.into_record()) {
        Ok(record) => println!(
            "Stored {} (run {}, {} ms) in {}",
            record.request_id,
            record.run_id,
            record.latency_ms,
            csv.display()
        ),
        Err(e) => super::fail(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_request_id_when_missing() {
        let args = SubmitArgs {
            run_id: "8".into(),
            request_id: None,
            model: "gemma3".into(),
            latency: 120.0,
            device: "iPhone 15".into(),
            app_version: "2.0.0".into(),
            crash_log: Some(String::new()),
            feedback: Some(Feedback::Up),
            temperature: None,
            battery: Some(40.0),
        };
        let r = args.into_record();
        assert!(r.request_id.starts_with("req_"));
        assert_eq!(r.crash_log, None);
        assert_eq!(r.battery_percentage, Some(40.0));
    }
}
