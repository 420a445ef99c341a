//! REST API for the bin packing service.
//!
//! Provides HTTP endpoints for communication with the frontend.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, SolverConfig};
use crate::feasibility::{FeasibilityError, screen};
use crate::milp::GoodLpSolver;
use crate::model::{
    BinReport, Objective, PackingRequest, PackingResult, SortMethod, ValidationError,
};
use crate::optimizer::{
    SolveError, SolveOptions, compare_all, compare_all_with_progress, solve_request,
};
use crate::preprocess::SeededShuffler;

#[derive(Clone)]
struct ApiState {
    solve_options: SolveOptions,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>bin-solver API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Embedded Web Assets (HTML, CSS, JS)
#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

fn default_min_items() -> usize {
    1
}

fn default_objective() -> Objective {
    Objective::MinBins
}

/// Request structure for the solve endpoint.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "weights": [10.0, 20.0, 30.0, 40.0, 50.0, 15.0, 25.0, 35.0],
        "bin_capacity": 60.0,
        "objective": "min_bins",
        "min_items_per_bin": 1,
        "sort_method": "none"
    })
)]
pub struct SolveRequest {
    pub weights: Vec<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub item_labels: Option<Vec<String>>,
    pub bin_capacity: f64,
    #[serde(default = "default_objective")]
    pub objective: Objective,
    #[serde(default = "default_min_items")]
    pub min_items_per_bin: usize,
    #[serde(default)]
    #[schema(nullable = true)]
    pub bin_count: Option<usize>,
    #[serde(default)]
    pub sort_method: SortMethod,
    /// RNG seed for `sort_method = "random"`; omitted runs pick one and
    /// report it, so any run can be replayed.
    #[serde(default)]
    #[schema(nullable = true)]
    pub seed: Option<u64>,
}

/// Request structure for the comparison endpoints: one problem, every
/// objective. `bin_count` only affects the `balance_bins` strategy.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "weights": [10.0, 20.0, 30.0, 40.0, 50.0, 15.0, 25.0, 35.0],
        "bin_capacity": 60.0,
        "bin_count": 4,
        "min_items_per_bin": 1
    })
)]
pub struct CompareRequest {
    pub weights: Vec<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub item_labels: Option<Vec<String>>,
    pub bin_capacity: f64,
    #[serde(default = "default_min_items")]
    pub min_items_per_bin: usize,
    #[serde(default)]
    #[schema(nullable = true)]
    pub bin_count: Option<usize>,
    #[serde(default)]
    pub sort_method: SortMethod,
    #[serde(default)]
    #[schema(nullable = true)]
    pub seed: Option<u64>,
}

/// Successful solve response.
#[derive(Serialize, ToSchema)]
pub struct SolveResponse {
    pub success: bool,
    pub objective: Objective,
    pub bins: Vec<BinReport>,
    pub bin_count: usize,
    pub total_weight: f64,
    pub avg_fill_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Seed actually used, reported only for random sorting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl SolveResponse {
    fn from_result(result: PackingResult, seed: Option<u64>) -> Self {
        Self {
            success: true,
            objective: result.objective,
            bin_count: result.bin_count,
            total_weight: result.total_packed_weight(),
            avg_fill_ratio: result.average_fill_ratio(),
            warning: result.warning.clone(),
            bins: result.bins,
            seed,
        }
    }
}

/// Failed solve response; the request was well-formed but unsolvable.
#[derive(Serialize, ToSchema)]
pub struct SolveFailure {
    pub success: bool,
    pub error: String,
    pub error_code: String,
}

impl SolveFailure {
    fn from_error(err: &SolveError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            error_code: err.code().to_string(),
        }
    }
}

/// Outcome of one strategy in a comparison run.
#[derive(Serialize, ToSchema)]
pub struct StrategyReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<Vec<BinReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_fill_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl StrategyReport {
    fn from_outcome(outcome: &Result<PackingResult, SolveError>) -> Self {
        match outcome {
            Ok(result) => Self {
                success: true,
                bins: Some(result.bins.clone()),
                bin_count: Some(result.bin_count),
                total_weight: Some(result.total_packed_weight()),
                avg_fill_ratio: Some(result.average_fill_ratio()),
                warning: result.warning.clone(),
                error: None,
                error_code: None,
            },
            Err(err) => Self {
                success: false,
                bins: None,
                bin_count: None,
                total_weight: None,
                avg_fill_ratio: None,
                warning: None,
                error: Some(err.to_string()),
                error_code: Some(err.code().to_string()),
            },
        }
    }
}

/// Response of the comparison endpoint, keyed by objective name.
#[derive(Serialize, ToSchema)]
pub struct CompareResponse {
    pub success: bool,
    pub results: BTreeMap<String, StrategyReport>,
    pub sort_method: SortMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

/// Seed resolution: an explicit request seed wins, otherwise one is drawn
/// from OS entropy so the run stays replayable.
fn resolve_seed(requested: Option<u64>) -> u64 {
    requested.unwrap_or_else(|| SeededShuffler::from_entropy().fork_seed())
}

fn reported_seed(sort_method: SortMethod, seed: u64) -> Option<u64> {
    (sort_method == SortMethod::Random).then_some(seed)
}

fn build_packing_request(
    weights: &[f64],
    item_labels: Option<&[String]>,
    bin_capacity: f64,
    objective: Objective,
    min_items_per_bin: usize,
    bin_count: Option<usize>,
    sort_method: SortMethod,
) -> Result<PackingRequest, Response> {
    PackingRequest::new(
        weights,
        item_labels,
        bin_capacity,
        objective,
        min_items_per_bin,
        bin_count,
        sort_method,
    )
    .map_err(|err: ValidationError| validation_error(err.to_string()))
}

fn parse_solve_request(
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> Result<(PackingRequest, u64), Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    let request = build_packing_request(
        &payload.weights,
        payload.item_labels.as_deref(),
        payload.bin_capacity,
        payload.objective,
        payload.min_items_per_bin,
        payload.bin_count,
        payload.sort_method,
    )?;
    Ok((request, resolve_seed(payload.seed)))
}

/// Input-error screening shared by the comparison endpoints.
///
/// Malformed input (empty weights, non-positive capacity or min-items) is
/// rejected up front with 422, matching the solve endpoint. Analytic
/// infeasibility and the balance-only checks stay per-strategy outcomes.
fn compare_input_error(request: &PackingRequest) -> Option<FeasibilityError> {
    match screen(
        &request.items,
        request.bin_capacity,
        request.min_items_per_bin,
        Objective::MinBins,
        request.bin_count,
    ) {
        Err(err) if err.is_input_error() => Some(err),
        _ => None,
    }
}

fn parse_compare_request(
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<(PackingRequest, u64), Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    // The objective here is a placeholder: every strategy is screened and
    // solved on its own during the comparison.
    let request = build_packing_request(
        &payload.weights,
        payload.item_labels.as_deref(),
        payload.bin_capacity,
        Objective::MinBins,
        payload.min_items_per_bin,
        payload.bin_count,
        payload.sort_method,
    )?;
    Ok((request, resolve_seed(payload.seed)))
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_solve, handle_compare, handle_compare_stream),
    components(
        schemas(
            SolveRequest,
            CompareRequest,
            SolveResponse,
            SolveFailure,
            CompareResponse,
            StrategyReport,
            BinReport,
            ErrorResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for weight-based bin packing"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the frontend.
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, solver_config: SolverConfig) {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        solve_options: solver_config.solve_options(),
    };

    let app = Router::new()
        // API endpoints
        .route("/api/solve", post(handle_solve))
        .route("/api/compare", post(handle_compare))
        .route("/api/compare/stream", post(handle_compare_stream))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        // Web-UI (embedded)
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_static))
        .layer(cors)
        .with_state(state);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("❌ Could not bind API server to {}: {}", addr, err);
        }
    };

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 API Endpoints:");
    println!("   - POST /api/solve");
    println!("   - POST /api/compare");
    println!("   - POST /api/compare/stream");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");
    println!("🌐 Web-UI: http://{}:{}", display_host, config.port());

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /api/solve.
///
/// Packs the given weights into bins under the requested objective.
/// Malformed input is rejected with 422; a well-formed but unsolvable
/// request returns a structured failure body.
#[utoipa::path(
    post,
    path = "/api/solve",
    request_body = SolveRequest,
    responses(
        (status = 200, description = "Solve outcome, successful or failed", body = SolveResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request data",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_solve(
    State(state): State<ApiState>,
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (request, seed) = match parse_solve_request(payload) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    println!(
        "📥 New solve request: {} items, objective {}",
        request.item_count(),
        request.objective
    );

    let mut shuffler = SeededShuffler::new(seed);
    let outcome = solve_request(&request, &GoodLpSolver, &mut shuffler, &state.solve_options);

    match outcome {
        Ok(result) => {
            let packed_items: usize = result.bins.iter().map(|bin| bin.item_count()).sum();
            println!(
                "📦 Result: {} bins, {} items, avg fill {:.1}%",
                result.bin_count,
                packed_items,
                result.average_fill_ratio() * 100.0
            );
            let seed = reported_seed(request.sort_method, seed);
            (StatusCode::OK, Json(SolveResponse::from_result(result, seed))).into_response()
        }
        Err(SolveError::Rejected(err)) if err.is_input_error() => {
            validation_error(err.to_string())
        }
        Err(err) => {
            println!("📦 Result: no packing ({})", err.code());
            (StatusCode::OK, Json(SolveFailure::from_error(&err))).into_response()
        }
    }
}

/// Handler for POST /api/compare.
///
/// Runs every objective on the same problem and reports each outcome
/// independently; one infeasible strategy never hides the others.
#[utoipa::path(
    post,
    path = "/api/compare",
    request_body = CompareRequest,
    responses(
        (status = 200, description = "Per-strategy outcomes", body = CompareResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request data",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_compare(
    State(state): State<ApiState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (request, seed) = match parse_compare_request(payload) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    if let Some(err) = compare_input_error(&request) {
        return validation_error(err.to_string());
    }

    println!(
        "📥 New compare request: {} items, {} strategies",
        request.item_count(),
        Objective::ALL.len()
    );

    let mut shuffler = SeededShuffler::new(seed);
    let outcomes = compare_all(&request, &GoodLpSolver, &mut shuffler, &state.solve_options);

    let results: BTreeMap<String, StrategyReport> = outcomes
        .iter()
        .map(|(objective, outcome)| {
            (objective.to_string(), StrategyReport::from_outcome(outcome))
        })
        .collect();
    let solved = results.values().filter(|r| r.success).count();
    println!(
        "📦 Comparison finished: {}/{} strategies solved",
        solved,
        results.len()
    );

    let response = CompareResponse {
        success: true,
        results,
        sort_method: request.sort_method,
        seed: reported_seed(request.sort_method, seed),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /api/compare/stream (SSE).
///
/// Streams comparison progress in real-time as Server-Sent Events
/// (text/event-stream). The frontend can show each strategy's outcome as
/// it lands instead of waiting for the full comparison.
#[utoipa::path(
    post,
    path = "/api/compare/stream",
    request_body = CompareRequest,
    responses(
        (
            status = 200,
            description = "Streams comparison events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request data",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_compare_stream(
    State(state): State<ApiState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (request, seed) = match parse_compare_request(payload) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    if let Some(err) = compare_input_error(&request) {
        return validation_error(err.to_string());
    }

    let (tx, rx) = mpsc::channel::<String>(32);
    let options = state.solve_options;

    tokio::task::spawn_blocking(move || {
        let mut shuffler = SeededShuffler::new(seed);
        let _ = compare_all_with_progress(&request, &GoodLpSolver, &mut shuffler, &options, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                if tx.blocking_send(json).is_err() {
                    // Receiver has closed the stream; remaining events are discarded.
                    return;
                }
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Serves the index.html main page
async fn serve_index() -> Response {
    match WebAssets::get("index.html") {
        Some(content) => Html(content.data).into_response(),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Serves static assets (JS, CSS, etc.)
async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match WebAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/api/solve", "/api/compare", "/api/compare/stream"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["SolveRequest", "CompareRequest", "SolveResponse", "ErrorResponse"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn solve_request_defaults_are_applied() {
        let json = r#"{
            "weights": [10.0, 20.0],
            "bin_capacity": 60.0
        }"#;
        let request: SolveRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.objective, Objective::MinBins);
        assert_eq!(request.min_items_per_bin, 1);
        assert_eq!(request.bin_count, None);
        assert_eq!(request.sort_method, SortMethod::None);
        assert_eq!(request.seed, None);
        assert!(request.item_labels.is_none());
    }

    #[test]
    fn solve_request_parses_all_fields() {
        let json = r#"{
            "weights": [10.0, 20.0],
            "item_labels": ["a", "b"],
            "bin_capacity": 60.0,
            "objective": "balance_bins",
            "min_items_per_bin": 2,
            "bin_count": 2,
            "sort_method": "desc",
            "seed": 42
        }"#;
        let request: SolveRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.objective, Objective::BalanceBins);
        assert_eq!(request.min_items_per_bin, 2);
        assert_eq!(request.bin_count, Some(2));
        assert_eq!(request.sort_method, SortMethod::Desc);
        assert_eq!(request.seed, Some(42));
        assert_eq!(request.item_labels.as_deref().map(|l| l.len()), Some(2));
    }

    #[test]
    fn compare_request_parses_without_objective() {
        let json = r#"{
            "weights": [10.0, 20.0, 30.0],
            "bin_capacity": 60.0,
            "bin_count": 2
        }"#;
        let request: CompareRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.bin_count, Some(2));
        assert_eq!(request.min_items_per_bin, 1);
    }

    #[test]
    fn compare_rejects_malformed_input_up_front() {
        let request =
            PackingRequest::new(&[], None, 60.0, Objective::MinBins, 1, None, SortMethod::None)
                .unwrap();
        let err = compare_input_error(&request).expect("empty weights must be rejected");
        assert_eq!(err.code(), "empty_input");

        let request =
            PackingRequest::new(&[10.0], None, 0.0, Objective::MinBins, 1, None, SortMethod::None)
                .unwrap();
        let err = compare_input_error(&request).expect("zero capacity must be rejected");
        assert_eq!(err.code(), "non_positive_capacity");

        let request =
            PackingRequest::new(&[10.0], None, 60.0, Objective::MinBins, 0, None, SortMethod::None)
                .unwrap();
        let err = compare_input_error(&request).expect("zero min-items must be rejected");
        assert_eq!(err.code(), "non_positive_min_items");
    }

    #[test]
    fn compare_keeps_analytic_infeasibility_per_strategy() {
        // An overweight item is a negative answer, not malformed input.
        let request =
            PackingRequest::new(&[70.0], None, 60.0, Objective::MinBins, 1, None, SortMethod::None)
                .unwrap();
        assert!(compare_input_error(&request).is_none());

        // A missing bin_count only fails the balance strategy.
        let request = PackingRequest::new(
            &[10.0, 20.0],
            None,
            60.0,
            Objective::MinBins,
            1,
            None,
            SortMethod::None,
        )
        .unwrap();
        assert!(compare_input_error(&request).is_none());
    }

    #[test]
    fn compare_response_echoes_sort_method_and_seed() {
        let response = CompareResponse {
            success: true,
            results: BTreeMap::new(),
            sort_method: SortMethod::Random,
            seed: Some(42),
        };
        let value = serde_json::to_value(&response).expect("Should serialize");
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["sort_method"], json!("random"));
        assert_eq!(value["seed"], json!(42));

        let response = CompareResponse {
            success: true,
            results: BTreeMap::new(),
            sort_method: SortMethod::None,
            seed: None,
        };
        let value = serde_json::to_value(&response).expect("Should serialize");
        assert_eq!(value["sort_method"], json!("none"));
        assert!(value.get("seed").is_none());
    }

    #[test]
    fn seed_is_reported_only_for_random_sorting() {
        assert_eq!(reported_seed(SortMethod::Random, 42), Some(42));
        assert_eq!(reported_seed(SortMethod::None, 42), None);
        assert_eq!(reported_seed(SortMethod::Asc, 42), None);
    }

    #[test]
    fn explicit_seed_wins_over_entropy() {
        assert_eq!(resolve_seed(Some(7)), 7);
    }

    #[test]
    fn strategy_report_embeds_failures() {
        let outcome: Result<PackingResult, SolveError> = Err(SolveError::EmptyAfterFiltering);
        let report = StrategyReport::from_outcome(&outcome);
        assert!(!report.success);
        assert_eq!(
            report.error_code.as_deref(),
            Some("result_empty_after_filtering")
        );
        assert!(report.bins.is_none());
    }
}
