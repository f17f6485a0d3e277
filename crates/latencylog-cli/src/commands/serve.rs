//! `latencylog serve`: run the HTTP API.

use std::path::Path;

use latencylog_core::StoreConfig;
use latencylog_server::{ServerConfig, run_server};

pub fn run(csv: &Path, host: &str, port: u16) {
    let config = ServerConfig {
        host: host.to_string(),
        port,
        store: StoreConfig::new(csv),
    };
    let base = format!("http://{}", config.addr());

    println!("Latencylog API v{}", latencylog_core::VERSION);
    println!("   {base}");
    println!("   store: {}", csv.display());
    println!();
    println!("   Endpoints:");
    println!("     POST   /api/logs            Submit one record");
    println!("     POST   /api/logs/batch      Submit an array of records");
    println!("     GET    /api/logs            All records");
    println!("     GET    /api/logs/count      Record count");
    println!("     DELETE /api/logs/clear      Truncate the store");
    println!("     GET    /api/stats           Global summary");
    println!("     GET    /api/summary/models  Per-model summary");
    println!("     GET    /api/summary/runs    Per-run summary");
    println!("     GET    /api/runs/{{run_id}}   Run drill-down");
    println!("     GET    /api/compare         ?run_ids=a,b");
    println!("     GET    /api/correlation     ?fields=latency_ms,battery_percentage,temp_score");
    println!("     GET    /api/facets          Distinct filter values");
    println!();
    println!("   Filters: models, devices, versions, feedback, temperatures,");
    println!("            battery_min, battery_max, crashed_only");
    println!();
    println!("   Example:");
    println!("     curl '{base}/api/stats?models=gemma3&battery_min=20'");
    println!();

    let rt = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| super::fail(format!("failed to start runtime: {e}")));
    if let Err(e) = rt.block_on(run_server(config)) {
        super::fail(format!("server error: {e}"));
    }
}
