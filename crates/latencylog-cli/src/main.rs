//! CLI for latencylog: collect and analyze on-device inference latency.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::FilterArgs;
use latencylog_core::{Feedback, TemperatureLevel};

#[derive(Parser)]
#[command(name = "latencylog")]
#[command(about = "latencylog: append-only latency telemetry with grouped analytics")]
#[command(version = latencylog_core::VERSION)]
struct Cli {
    /// Path to the latency log CSV file
    #[arg(
        long,
        global = true,
        env = latencylog_core::CSV_PATH_ENV,
        default_value = latencylog_core::DEFAULT_CSV_PATH
    )]
    csv: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP ingestion and query API
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Print the number of stored records
    Count,

    /// Delete every record, keeping the header row
    Clear,

    /// Global summary: latency distribution, crash rate, feedback, battery
    Stats {
        #[command(flatten)]
        filters: FilterArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Per-model summary with feedback breakdown
    Models {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Per-run summary
    Runs {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Drill into a single run: timeline, feedback, crashes
    Run {
        /// Run id to inspect
        run_id: String,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Compare runs side by side, with battery drain and temperature rise
    Compare {
        /// Comma-separated run ids
        #[arg(long, value_delimiter = ',', required = true)]
        runs: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Pearson correlation matrix over numeric fields
    Correlate {
        /// Comma-separated fields: latency_ms, battery_percentage, temp_score
        #[arg(
            long,
            value_delimiter = ',',
            default_value = "latency_ms,battery_percentage,temp_score"
        )]
        fields: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// List the distinct values available for filtering
    Facets {
        #[arg(long)]
        json: bool,
    },

    /// Validate and append a single record
    Submit {
        #[arg(long)]
        run_id: String,

        /// Request id (default: generated req_<8 hex>)
        #[arg(long)]
        request_id: Option<String>,

        #[arg(long)]
        model: String,

        /// Latency in milliseconds
        #[arg(long)]
        latency: f64,

        #[arg(long)]
        device: String,

        #[arg(long)]
        app_version: String,

        #[arg(long)]
        crash_log: Option<String>,

        /// up or down
        #[arg(long)]
        feedback: Option<Feedback>,

        /// nominal, fair, serious, critical (or 1-4)
        #[arg(long)]
        temperature: Option<TemperatureLevel>,

        /// Battery level, 0-100
        #[arg(long)]
        battery: Option<f64>,
    },

    /// Convert a raw telemetry dump of loose JSON objects into a CSV file
    Import {
        /// Telemetry dump to read
        input: PathBuf,

        /// CSV file to write (replaced if it exists)
        #[arg(long)]
        output: PathBuf,

        /// Run id stamped on every imported record
        #[arg(long)]
        run_id: String,
    },

    /// Submit a batch of synthetic records with random latency
    Generate {
        /// Number of records
        #[arg(long, default_value = "10")]
        count: usize,

        #[arg(long)]
        model: String,

        #[arg(long)]
        device: String,

        #[arg(long)]
        version: String,

        /// Lower latency bound in ms
        #[arg(long, default_value = "100")]
        latency_min: f64,

        /// Upper latency bound in ms
        #[arg(long, default_value = "500")]
        latency_max: f64,

        /// Run id (default: generated run_<8 hex>)
        #[arg(long)]
        run_id: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let csv = cli.csv.as_path();

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(csv, &host, port),
        Commands::Count => commands::count::run(csv),
        Commands::Clear => commands::clear::run(csv),
        Commands::Stats { filters, json } => commands::stats::run(csv, &filters, json),
        Commands::Models { filters, json } => commands::models::run(csv, &filters, json),
        Commands::Runs { filters, json } => commands::runs::run(csv, &filters, json),
        Commands::Run {
            run_id,
            filters,
            json,
        } => commands::detail::run(csv, &run_id, &filters, json),
        Commands::Compare {
            runs,
            filters,
            json,
        } => commands::compare::run(csv, &runs, &filters, json),
        Commands::Correlate {
            fields,
            filters,
            json,
        } => commands::correlate::run(csv, &fields, &filters, json),
        Commands::Facets { json } => commands::facets::run(csv, json),
        Commands::Submit {
            run_id,
            request_id,
            model,
            latency,
            device,
            app_version,
            crash_log,
            feedback,
            temperature,
            battery,
        } => commands::submit::run(
            csv,
            commands::submit::SubmitArgs {
                run_id,
                request_id,
                model,
                latency,
                device,
                app_version,
                crash_log,
                feedback,
                temperature,
                battery,
            },
        ),
        Commands::Import {
            input,
            output,
            run_id,
        } => commands::import::run(&input, &output, &run_id),
        Commands::Generate {
            count,
            model,
            device,
            version,
            latency_min,
            latency_max,
            run_id,
        } => commands::generate::run(commands::generate::GenerateConfig {
            csv,
            count,
            model: &model,
            device: &device,
            version: &version,
            latency_min,
            latency_max,
            run_id: run_id.as_deref(),
        }),
    }
}
