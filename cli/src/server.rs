use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use heft_core::db::Database;
use heft_core::models::{
    BackupData, ChartPoint, DailyAggregate, LabelFormat, Measurement, validate_backup,
    validate_weight,
};
use heft_core::service::TrackerService;

const BODY_LIMIT: usize = 50 * 1024 * 1024; // 50 MB

type SharedService = Arc<Mutex<TrackerService<Database>>>;

#[derive(Clone)]
struct AppState {
    svc: SharedService,
    api_key: Option<String>,
}

fn lock_svc(state: &AppState) -> std::sync::MutexGuard<'_, TrackerService<Database>> {
    state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateWeightRequest {
    weight: f64,
    /// Epoch milliseconds; defaults to now.
    timestamp: Option<i64>,
}

#[derive(Deserialize)]
struct ChartQuery {
    format: Option<String>,
}

#[derive(Deserialize)]
struct SetGoalRequest {
    goal: f64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                eprintln!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Weight handlers ---

async fn create_weight(
    State(state): State<AppState>,
    Json(req): Json<CreateWeightRequest>,
) -> Result<(StatusCode, Json<Measurement>), ApiError> {
    validate_weight(req.weight).map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let svc = lock_svc(&state);
    let entry = svc
        .log_weight(req.weight, req.timestamp)
        .context("failed to insert weight entry")?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_weights(
    State(state): State<AppState>,
) -> Result<Json<Vec<Measurement>>, ApiError> {
    let svc = lock_svc(&state);
    let entries = svc.measurements().context("database error")?;
    Ok(Json(entries))
}

async fn list_daily(
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyAggregate>>, ApiError> {
    let svc = lock_svc(&state);
    let aggregates = svc.daily_history(None).context("database error")?;
    Ok(Json(aggregates))
}

async fn delete_weight(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let svc = lock_svc(&state);
    if svc.delete_measurement(id).context("database error")? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Weight entry {id} not found")))
    }
}

// --- Chart / stats handlers ---

async fn get_chart(
    State(state): State<AppState>,
    Path(days): Path<u32>,
    Query(params): Query<ChartQuery>,
) -> Result<Json<Vec<ChartPoint>>, ApiError> {
    if days == 0 {
        return Err(ApiError::BadRequest(
            "days must be greater than 0".to_string(),
        ));
    }
    let format = params
        .format
        .as_deref()
        .map(str::parse::<LabelFormat>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let svc = lock_svc(&state);
    let points = svc.chart(days, format).context("database error")?;
    Ok(Json(points))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let svc = lock_svc(&state);
    let latest = svc.latest().context("database error")?;
    let change = svc.stats().context("database error")?;
    let goal = svc.goal().context("database error")?;
    Ok(Json(serde_json::json!({
        "latest": latest,
        "change": change,
        "goal": goal,
    })))
}

// --- Goal handlers ---

async fn get_goal(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let svc = lock_svc(&state);
    let goal = svc
        .goal()
        .context("database error")?
        .ok_or_else(|| ApiError::NotFound("No goal set".to_string()))?;
    Ok(Json(serde_json::json!({ "goal": goal })))
}

async fn set_goal(
    State(state): State<AppState>,
    Json(req): Json<SetGoalRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_weight(req.goal).map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let svc = lock_svc(&state);
    svc.set_goal(req.goal).context("failed to set goal")?;
    Ok(Json(serde_json::json!({ "goal": req.goal })))
}

async fn delete_goal(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let svc = lock_svc(&state);
    let cleared = svc.clear_goal().context("database error")?;
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

// --- Demo / reset handlers ---

async fn load_demo(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let svc = lock_svc(&state);
    if svc.has_demo_data().context("database error")? {
        return Err(ApiError::BadRequest(
            "Demo data already loaded. Clear it first to reload.".to_string(),
        ));
    }
    let summary = svc.load_demo_data().context("failed to load demo data")?;
    let value = serde_json::to_value(summary).context("failed to serialize summary")?;
    Ok(Json(value))
}

async fn clear_demo(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let svc = lock_svc(&state);
    let summary = svc.clear_demo_data().context("failed to clear demo data")?;
    let value = serde_json::to_value(summary).context("failed to serialize summary")?;
    Ok(Json(value))
}

async fn clear_all(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let svc = lock_svc(&state);
    let removed = svc.clear_all_data().context("failed to clear data")?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

// --- Export / Import handlers ---

async fn export_data(State(state): State<AppState>) -> Result<Json<BackupData>, ApiError> {
    let svc = lock_svc(&state);
    let empty = svc.measurements().context("database error")?.is_empty();
    if empty {
        return Err(ApiError::NotFound("No data to backup".to_string()));
    }
    let backup = svc.export_backup().context("failed to export data")?;
    Ok(Json(backup))
}

async fn import_data(
    State(state): State<AppState>,
    Json(backup): Json<BackupData>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_backup(&backup).map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let svc = lock_svc(&state);
    let restored = svc
        .import_backup(&backup)
        .context("failed to import data")?;
    Ok(Json(serde_json::json!({ "restored": restored })))
}

// --- Router builder ---

/// TLS configuration for the server.
pub struct TlsConfig {
    pub cert_path: std::path::PathBuf,
    pub key_path: std::path::PathBuf,
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/weights", post(create_weight).get(list_weights))
        .route("/api/weights/daily", get(list_daily))
        .route("/api/weights/{id}", delete(delete_weight))
        .route("/api/chart/{days}", get(get_chart))
        .route("/api/stats", get(get_stats))
        .route(
            "/api/goal",
            get(get_goal).put(set_goal).delete(delete_goal),
        )
        .route("/api/demo", post(load_demo).delete(clear_demo))
        .route("/api/data", delete(clear_all))
        .route("/api/export", get(export_data))
        .route("/api/import", post(import_data))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// Mask an API key for log output: first and last four characters. Keys too
/// short to mask usefully (the file is user-editable) are hidden entirely.
fn masked_key(key: &str) -> String {
    match (key.get(..4), key.get(key.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if key.len() >= 8 => format!("{head}...{tail}"),
        _ => "(hidden)".to_string(),
    }
}

pub async fn start_server(
    svc: TrackerService<Database>,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    tls: Option<TlsConfig>,
) -> anyhow::Result<()> {
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {} (see api_key file in data directory)",
            masked_key(key),
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    if let Some(tls_config) = tls {
        let fingerprint = crate::tls::ensure_cert(&tls_config.cert_path, &tls_config.key_path)?;

        let rustls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            &tls_config.cert_path,
            &tls_config.key_path,
        )
        .await
        .context("failed to load TLS certificate")?;

        let addr = format!("{bind}:{port}")
            .parse::<std::net::SocketAddr>()
            .context("invalid bind address")?;

        eprintln!("Listening on https://{bind}:{port}");
        eprintln!("Certificate fingerprint (SHA-256):");
        eprintln!("  {fingerprint}");

        axum_server::bind_rustls(addr, rustls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
        eprintln!("Listening on http://{bind}:{port}");
        axum::serve(listener, app).await?;
    }

    Ok(())
}
