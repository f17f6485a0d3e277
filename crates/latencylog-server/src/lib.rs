//! HTTP ingestion and query server.
//!
//! Thin axum transport over [`latencylog_core`]: write endpoints go through
//! the [`IngestGateway`], read endpoints re-read the store, apply the filter
//! query parameters and return the aggregation as JSON.
//!
//! Handlers call the store synchronously and hold no lock around it.
//! Concurrent appends from other processes can interleave at line level.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use latencylog_core::{
    BatchReport, Feedback, FilterSpec, IngestError, IngestGateway, NumericField, Record,
    RecordStore, StoreConfig, StoreError, TemperatureLevel, ValidationError, aggregate, facets,
    filter::filter,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where to listen and which file to serve.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            store: StoreConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared server state.
struct AppState {
    gateway: IngestGateway,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error surfaced to HTTP clients.
#[derive(Debug)]
enum ApiError {
    Validation(ValidationError),
    Storage(StoreError),
    BadRequest { param: &'static str, message: String },
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Validation(v) => Self::Validation(v),
            IngestError::Storage(s) => Self::Storage(s),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "validation", "field": e.field, "message": e.to_string() }),
            ),
            Self::Storage(e) => {
                log::error!("storage failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "storage", "message": e.to_string() }),
                )
            }
            Self::BadRequest { param, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "bad_request", "param": param, "message": message }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Filter query parameters. Lists are comma separated; a parameter given
/// with an empty value is an explicit empty set.
#[derive(Debug, Default, Deserialize)]
struct FilterParams {
    models: Option<String>,
    devices: Option<String>,
    versions: Option<String>,
    feedback: Option<String>,
    temperatures: Option<String>,
    battery_min: Option<f64>,
    battery_max: Option<f64>,
    crashed_only: Option<bool>,
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn string_set(raw: Option<String>) -> Option<BTreeSet<String>> {
    raw.map(|s| split_list(&s).map(str::to_string).collect())
}

fn parsed_set<T>(param: &'static str, raw: Option<String>) -> Result<Option<BTreeSet<T>>, ApiError>
where
    T: FromStr<Err = String> + Ord,
{
    raw.map(|s| {
        split_list(&s)
            .map(|item| {
                item.parse::<T>()
                    .map_err(|message| ApiError::BadRequest { param, message })
            })
            .collect()
    })
    .transpose()
}

impl FilterParams {
    fn into_spec(self) -> Result<FilterSpec, ApiError> {
        let battery_range = match (self.battery_min, self.battery_max) {
            (None, None) => None,
            (lo, hi) => {
                let (lo, hi) = (lo.unwrap_or(0.0), hi.unwrap_or(100.0));
                if lo > hi {
                    return Err(ApiError::BadRequest {
                        param: "battery_min",
                        message: format!("battery_min {lo} exceeds battery_max {hi}"),
                    });
                }
                Some((lo, hi))
            }
        };

        Ok(FilterSpec {
            models: string_set(self.models),
            devices: string_set(self.devices),
            versions: string_set(self.versions),
            feedback: parsed_set::<Feedback>("feedback", self.feedback)?,
            temperature_levels: parsed_set::<TemperatureLevel>("temperatures", self.temperatures)?,
            battery_range,
            crashed_only: self.crashed_only.unwrap_or(false),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompareParams {
    run_ids: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CorrelationParams {
    fields: Option<String>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

const EMPTY_WARNING: &str = "no records match the query";

/// Body with an optional empty-result warning alongside it.
#[derive(Serialize)]
struct Reply<T: Serialize> {
    #[serde(flatten)]
    body: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'static str>,
}

fn reply<T: Serialize>(endpoint: &str, empty: bool, body: T) -> Json<Reply<T>> {
    if empty {
        log::warn!("{endpoint}: {EMPTY_WARNING}");
    }
    Json(Reply {
        body,
        warning: empty.then_some(EMPTY_WARNING),
    })
}

/// Read the store and apply the request's filters.
fn load(state: &AppState, params: FilterParams) -> Result<Vec<Record>, ApiError> {
    let spec = params.into_spec()?;
    let records = state.gateway.store().read_all()?;
    Ok(filter(&records, &spec))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_index() -> Json<Value> {
    Json(json!({
        "status": "online",
        "service": "Latencylog API",
        "version": latencylog_core::VERSION,
        "endpoints": {
            "/": "This API index",
            "/health": "Health check with record count",
            "/api/logs": {
                "GET": "All records (filterable)",
                "POST": "Submit one record",
            },
            "/api/logs/batch": "POST a JSON array of records; stops at the first invalid one",
            "/api/logs/count": "Number of stored records",
            "/api/logs/clear": "DELETE all records (header is kept)",
            "/api/stats": "Global summary (filterable)",
            "/api/summary/models": "Per-model summary and feedback breakdown (filterable)",
            "/api/summary/runs": "Per-run summary (filterable)",
            "/api/runs/{run_id}": "Single run drill-down (filterable)",
            "/api/compare": "Cross-run comparison, ?run_ids=a,b (filterable)",
            "/api/correlation": "Pearson matrix, ?fields=latency_ms,battery_percentage,temp_score (filterable)",
            "/api/facets": "Distinct values for building filters",
        },
        "filters": [
            "models", "devices", "versions", "feedback", "temperatures",
            "battery_min", "battery_max", "crashed_only",
        ],
    }))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.gateway.health()?))
}

async fn handle_submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.gateway.submit_json(&body)?;
    Ok(Json(json!({
        "message": "Log entry created successfully",
        "data": record,
    })))
}

fn batch_response(report: BatchReport) -> Response {
    let count = report.appended;
    let not_attempted = report.not_attempted();
    let Some(failure) = report.failures.into_iter().next() else {
        return Json(json!({
            "message": format!("Successfully created {count} log entries"),
            "count": count,
        }))
        .into_response();
    };

    let status = match failure.error {
        IngestError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IngestError::Storage(ref e) => {
            log::error!("batch storage failure: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let body = json!({
        "count": count,
        "failed_index": failure.index,
        "field": failure.error.field(),
        "message": failure.error.to_string(),
        "not_attempted": not_attempted,
    });
    (status, Json(body)).into_response()
}

async fn handle_submit_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Vec<Value>>,
) -> Response {
    batch_response(state.gateway.submit_json_batch(&body))
}

async fn handle_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let records = load(&state, params)?;
    Ok(reply(
        "/api/logs",
        records.is_empty(),
        json!({ "count": records.len(), "logs": records }),
    ))
}

async fn handle_count(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let health = state.gateway.health()?;
    Ok(Json(json!({
        "total_logs": health.total_logs,
        "csv_file": health.csv_file,
    })))
}

async fn handle_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let records = load(&state, params)?;
    let summary = aggregate::global_summary(&records);
    Ok(reply("/api/stats", summary.is_empty(), summary))
}

async fn handle_model_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let records = load(&state, params)?;
    Ok(reply(
        "/api/summary/models",
        records.is_empty(),
        json!({
            "models": aggregate::group_by_model(&records),
            "feedback": aggregate::feedback_by_model(&records),
        }),
    ))
}

async fn handle_run_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let records = load(&state, params)?;
    Ok(reply(
        "/api/summary/runs",
        records.is_empty(),
        json!({ "runs": aggregate::group_by_run(&records) }),
    ))
}

async fn handle_run_detail(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let records = load(&state, params)?;
    let detail = aggregate::run_detail(&records, &run_id);
    Ok(reply("/api/runs/{run_id}", detail.is_empty(), detail))
}

async fn handle_compare(
    State(state): State<Arc<AppState>>,
    Query(compare): Query<CompareParams>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let run_ids: Vec<String> = compare
        .run_ids
        .as_deref()
        .map(|s| split_list(s).map(str::to_string).collect())
        .unwrap_or_default();
    if run_ids.is_empty() {
        return Err(ApiError::BadRequest {
            param: "run_ids",
            message: "at least one run id is required".to_string(),
        });
    }

    let records = load(&state, params)?;
    let comparison = aggregate::compare_runs(&records, &run_ids);
    let empty = comparison.runs.iter().all(|r| r.summary.metrics.count == 0);
    Ok(reply("/api/compare", empty, comparison))
}

async fn handle_correlation(
    State(state): State<Arc<AppState>>,
    Query(corr): Query<CorrelationParams>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let fields: Vec<NumericField> = match corr.fields.as_deref() {
        None => NumericField::ALL.to_vec(),
        Some(raw) => split_list(raw)
            .map(|f| {
                f.parse::<NumericField>().map_err(|message| ApiError::BadRequest {
                    param: "fields",
                    message,
                })
            })
            .collect::<Result<_, _>>()?,
    };

    let records = load(&state, params)?;
    let matrix = aggregate::correlation_matrix(&records, &fields);
    Ok(reply("/api/correlation", matrix.rows_used == 0, matrix))
}

async fn handle_facets(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let records = state.gateway.store().read_all()?;
    Ok(Json(facets(&records)))
}

async fn handle_clear(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.gateway.clear()?))
}

// ---------------------------------------------------------------------------
// Router and entry point
// ---------------------------------------------------------------------------

/// Build the axum router around an ingestion gateway.
pub fn build_router(gateway: IngestGateway) -> Router {
    let state = Arc::new(AppState { gateway });

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/api/logs", get(handle_logs).post(handle_submit))
        .route("/api/logs/batch", post(handle_submit_batch))
        .route("/api/logs/count", get(handle_count))
        .route("/api/logs/clear", delete(handle_clear))
        .route("/api/stats", get(handle_stats))
        .route("/api/summary/models", get(handle_model_summary))
        .route("/api/summary/runs", get(handle_run_summary))
        .route("/api/runs/{run_id}", get(handle_run_detail))
        .route("/api/compare", get(handle_compare))
        .route("/api/correlation", get(handle_correlation))
        .route("/api/facets", get(handle_facets))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
    }
    log::info!("shutting down");
}

/// Run the HTTP server until Ctrl-C.
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let store = RecordStore::new(config.store.clone());
    store.ensure_initialized().map_err(std::io::Error::other)?;
    let app = build_router(IngestGateway::new(store));

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!(
        "serving {} on http://{addr}",
        config.store.path.display()
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> (tempfile::TempDir, Router) {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::new(StoreConfig::new(tmp.path().join("latency_logs.csv")));
        (tmp, build_router(IngestGateway::new(store)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn log(run: &str, req: &str, model: &str, latency: f64) -> Value {
        json!({
            "run_id": run,
            "request_id": req,
            "model_name": model,
            "latency_ms": latency,
            "device_model": "iPhone 15 Pro",
            "app_version": "2.0.0",
        })
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let (_tmp, app) = test_app();
        let (status, json) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "online");
        assert!(json["endpoints"]["/api/stats"].is_string());
    }

    #[tokio::test]
    async fn test_health_reports_count() {
        let (_tmp, app) = test_app();
        send(&app, "POST", "/api/logs", Some(log("1", "a", "m", 10.0))).await;
        let (status, json) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["total_logs"], 1);
    }

    #[tokio::test]
    async fn test_submit_and_count() {
        let (_tmp, app) = test_app();
        let (status, json) = send(&app, "POST", "/api/logs", Some(log("1", "a", "m", 10.0))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["request_id"], "a");

        let (_, json) = send(&app, "GET", "/api/logs/count", None).await;
        assert_eq!(json["total_logs"], 1);
        assert!(json["csv_file"].as_str().unwrap().ends_with("latency_logs.csv"));
    }

    #[tokio::test]
    async fn test_submit_invalid_is_422_with_field() {
        let (_tmp, app) = test_app();
        let (status, json) = send(&app, "POST", "/api/logs", Some(log("1", "a", "m", -4.0))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "validation");
        assert_eq!(json["field"], "latency_ms");

        let (_, json) = send(&app, "GET", "/api/logs/count", None).await;
        assert_eq!(json["total_logs"], 0);
    }

    #[tokio::test]
    async fn test_batch_aborts_at_first_invalid() {
        let (_tmp, app) = test_app();
        let batch = json!([log("1", "a", "m", 1.0), log("1", "b", "m", -1.0), log("1", "c", "m", 3.0)]);
        let (status, json) = send(&app, "POST", "/api/logs/batch", Some(batch)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["count"], 1);
        assert_eq!(json["failed_index"], 1);
        assert_eq!(json["field"], "latency_ms");
        assert_eq!(json["not_attempted"], 1);

        let (_, json) = send(&app, "GET", "/api/logs", None).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["logs"][0]["request_id"], "a");
    }

    #[tokio::test]
    async fn test_batch_success() {
        let (_tmp, app) = test_app();
        let batch = json!([log("1", "a", "m", 1.0), log("1", "b", "m", 2.0)]);
        let (status, json) = send(&app, "POST", "/api/logs/batch", Some(batch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 2);
    }

    #[tokio::test]
    async fn test_stats_empty_has_warning() {
        let (_tmp, app) = test_app();
        let (status, json) = send(&app, "GET", "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 0);
        assert_eq!(json["warning"], EMPTY_WARNING);
    }

    #[tokio::test]
    async fn test_stats_filtered_by_model() {
        let (_tmp, app) = test_app();
        let batch = json!([
            log("1", "a", "gemma3", 100.0),
            log("1", "b", "qwen", 300.0),
            log("2", "c", "gemma3", 200.0),
        ]);
        send(&app, "POST", "/api/logs/batch", Some(batch)).await;

        let (_, json) = send(&app, "GET", "/api/stats?models=gemma3", None).await;
        assert_eq!(json["count"], 2);
        assert_eq!(json["latency"]["mean"], 150.0);
        assert!(json.get("warning").is_none());

        let (_, json) = send(&app, "GET", "/api/stats?models=", None).await;
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn test_bad_filter_value_is_400() {
        let (_tmp, app) = test_app();
        let (status, json) = send(&app, "GET", "/api/stats?feedback=sideways", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["param"], "feedback");

        let (status, _) = send(&app, "GET", "/api/stats?battery_min=80&battery_max=20", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_summaries_and_run_detail() {
        let (_tmp, app) = test_app();
        let mut first = log("8", "a", "gemma3", 100.0);
        first["battery_percentage"] = json!(80);
        let mut last = log("8", "b", "gemma3", 120.0);
        last["battery_percentage"] = json!(60);
        last["crash_log"] = json!("SIGKILL");
        send(&app, "POST", "/api/logs/batch", Some(json!([first, last, log("9", "c", "qwen", 50.0)]))).await;

        let (_, json) = send(&app, "GET", "/api/summary/models", None).await;
        assert_eq!(json["models"].as_array().unwrap().len(), 2);
        assert_eq!(json["feedback"][0]["none"], 2);

        let (_, json) = send(&app, "GET", "/api/summary/runs", None).await;
        assert_eq!(json["runs"][0]["run_id"], "8");
        assert_eq!(json["runs"][0]["dominant_model"], "gemma3");

        let (_, json) = send(&app, "GET", "/api/runs/8", None).await;
        assert_eq!(json["timeline"].as_array().unwrap().len(), 2);
        assert_eq!(json["crashes"][0]["crash_log"], "SIGKILL");

        let (status, json) = send(&app, "GET", "/api/runs/404", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["warning"], EMPTY_WARNING);
    }

    #[tokio::test]
    async fn test_compare_runs() {
        let (_tmp, app) = test_app();
        let batch: Vec<Value> = [80, 75, 60]
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let mut v = log("8", &format!("r{i}"), "m", 100.0);
                v["battery_percentage"] = json!(b);
                v
            })
            .collect();
        send(&app, "POST", "/api/logs/batch", Some(Value::Array(batch))).await;

        let (status, json) = send(&app, "GET", "/api/compare?run_ids=8,9", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["runs"][0]["battery_drain"], -20.0);
        assert_eq!(json["runs"][1]["count"], 0);

        let (status, _) = send(&app, "GET", "/api/compare", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_correlation_fields() {
        let (_tmp, app) = test_app();
        let (status, json) =
            send(&app, "GET", "/api/correlation?fields=latency_ms,battery_percentage", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["fields"], json!(["latency_ms", "battery_percentage"]));
        assert_eq!(json["rows_used"], 0);

        let (status, _) = send(&app, "GET", "/api/correlation?fields=speed", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_facets_and_clear() {
        let (_tmp, app) = test_app();
        send(&app, "POST", "/api/logs", Some(log("1", "a", "zeta", 1.0))).await;
        send(&app, "POST", "/api/logs", Some(log("1", "b", "alpha", 1.0))).await;

        let (_, json) = send(&app, "GET", "/api/facets", None).await;
        assert_eq!(json["models"], json!(["alpha", "zeta"]));

        let (status, json) = send(&app, "DELETE", "/api/logs/clear", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "All logs cleared successfully");

        let (_, json) = send(&app, "GET", "/api/logs/count", None).await;
        assert_eq!(json["total_logs"], 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::new(StoreConfig::new(tmp.path().join("missing/dir/logs.csv")));
        let app = build_router(IngestGateway::new(store));
        let (status, json) = send(&app, "POST", "/api/logs", Some(log("1", "a", "m", 1.0))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "storage");
    }
}
