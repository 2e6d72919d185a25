//! # API REST
//!
//! REST API for the IPS conformance suite.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS)
//!
//! Runs are synchronous in the engine, so `POST /runs` executes on the blocking pool.

#![warn(rust_2018_idioms)]

use api_shared::{ErrorRes, HealthRes, HealthService, RunReq, RunRes, StatusTotalsRes, SuiteRes};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use ips_core::{
    CancellationFlag, GroupOutline, RunConfig, RunOptions, SuiteError, SuiteReport, SuiteService,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<SuiteService>,
}

impl AppState {
    pub fn new(service: SuiteService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, suite, suite_group, create_run),
    components(schemas(HealthRes, ErrorRes, RunReq, RunRes, StatusTotalsRes, SuiteRes))
)]
pub struct ApiDoc;

type ApiError = (StatusCode, Json<ErrorRes>);

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/suite", get(suite))
        .route("/suite/:group_id", get(suite_group))
        .route("/runs", post(create_run))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolve the run configuration from the process environment.
///
/// # Environment Variables
/// - `IPS_CONFIG`: YAML run configuration file (optional)
/// - `IPS_SERVER_URL`: FHIR base URL of the server under test (optional)
/// - `IPS_VALIDATOR_URL`: validator service base URL (optional)
///
/// # Errors
/// Returns an error if the configuration file cannot be read or is invalid.
pub fn run_config_from_env() -> anyhow::Result<RunConfig> {
    let mut config = match std::env::var("IPS_CONFIG") {
        Ok(path) => RunConfig::load(&PathBuf::from(path))?,
        Err(_) => RunConfig::new()?,
    };
    if let Ok(url) = std::env::var("IPS_SERVER_URL") {
        config = config.with_server_url(Some(url));
    }
    if let Ok(url) = std::env::var("IPS_VALIDATOR_URL") {
        config = config.with_validator_url(url)?;
    }
    Ok(config)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/suite",
    responses(
        (status = 200, description = "Outline of the whole suite", body = SuiteRes)
    )
)]
/// Outline of the suite root.
#[axum::debug_handler]
async fn suite(State(state): State<AppState>) -> Result<Json<SuiteRes>, ApiError> {
    let outline = state.service.outline(None).map_err(error_response)?;
    suite_response(&outline).map(Json)
}

#[utoipa::path(
    get,
    path = "/suite/{group_id}",
    params(("group_id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Outline of one group", body = SuiteRes),
        (status = 404, description = "Unknown group", body = ErrorRes)
    )
)]
/// Outline of one group.
#[axum::debug_handler]
async fn suite_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Json<SuiteRes>, ApiError> {
    let outline = state
        .service
        .outline(Some(&group_id))
        .map_err(error_response)?;
    suite_response(&outline).map(Json)
}

#[utoipa::path(
    post,
    path = "/runs",
    request_body = RunReq,
    responses(
        (status = 200, description = "Run finished", body = RunRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Unknown group", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Run a group and return its report.
///
/// Findings about the server under test are part of the report, never an HTTP error.
///
/// # Errors
/// Returns `404 Not Found` for an unknown group, `400 Bad Request` for invalid configuration
/// and `500 Internal Server Error` if the run could not be carried out.
#[axum::debug_handler]
async fn create_run(
    State(state): State<AppState>,
    Json(req): Json<RunReq>,
) -> Result<Json<RunRes>, ApiError> {
    let service = match req.server_url {
        Some(url) => state.service.for_server(Some(url)),
        None => state.service.as_ref().clone(),
    };
    let group_id = req
        .group_id
        .unwrap_or_else(|| ips_core::catalogue::SUITE_ID.to_string());
    let options = RunOptions {
        parallel_groups: req.parallel,
    };
    let inputs = req.inputs;

    let outcome = tokio::task::spawn_blocking(move || {
        service.run(&group_id, &inputs, options, CancellationFlag::new())
    })
    .await
    .map_err(|e| {
        tracing::error!("Run task failed: {:?}", e);
        internal_error()
    })?;

    let report = outcome.map_err(error_response)?;
    run_response(&report).map(Json)
}

fn suite_response(outline: &GroupOutline) -> Result<SuiteRes, ApiError> {
    let inputs = outline
        .input_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let outline = serde_json::to_value(outline).map_err(|e| {
        tracing::error!("Outline serialisation error: {:?}", e);
        internal_error()
    })?;
    Ok(SuiteRes { inputs, outline })
}

fn run_response(report: &SuiteReport) -> Result<RunRes, ApiError> {
    let totals = report.totals();
    let root = serde_json::to_value(&report.root).map_err(|e| {
        tracing::error!("Report serialisation error: {:?}", e);
        internal_error()
    })?;

    Ok(RunRes {
        run_id: report.run_id.to_string(),
        status: report.status().to_string(),
        started_at: report.started_at.to_rfc3339(),
        finished_at: report.finished_at.to_rfc3339(),
        totals: StatusTotalsRes {
            pass: totals.pass,
            fail: totals.fail,
            skip: totals.skip,
            error: totals.error,
            not_run: totals.not_run,
        },
        report: root,
    })
}

fn error_response(err: SuiteError) -> ApiError {
    let status = match &err {
        SuiteError::UnknownGroup(_) | SuiteError::UnknownCheck(_) => StatusCode::NOT_FOUND,
        SuiteError::InvalidInput(_) | SuiteError::Config(_) | SuiteError::Type(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => {
            tracing::error!("Suite error: {:?}", err);
            return internal_error();
        }
    };
    (
        status,
        Json(ErrorRes {
            error: err.to_string(),
        }),
    )
}

fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorRes {
            error: "Internal error".into(),
        }),
    )
}
