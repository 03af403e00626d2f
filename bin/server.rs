// Country Ledger - Web Server
// REST routes over the reconciliation engine and the country store

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use country_ledger::logging::init_tracing;
use country_ledger::{AppConfig, CountryFilter, CountryService, QueryError, RefreshError};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<CountryService>,
}

/// Error body: `{ "error": ..., "details": ... }`
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, details: Option<serde_json::Value>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.to_string(),
                details,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::ExternalSourceUnavailable { endpoint, .. } => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "External data source unavailable",
                Some(json!(format!("Could not fetch data from {}", endpoint))),
            ),
            RefreshError::ValidationFailed { error, .. } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "Validation failed",
                Some(json!({ error.field(): error.reason() })),
            ),
            other => {
                error!(error = %other, "refresh failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::RecordNotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "Country not found", None)
            }
            QueryError::ArtifactNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "Summary image not found", None)
            }
            other => {
                error!(error = %other, "query failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// POST /countries/refresh - Run one reconciliation
async fn refresh(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let report = state.service.run_reconciliation().await?;

    Ok(Json(json!({
        "message": "Refresh successful",
        "last_refreshed_at": report.refreshed_at,
        "inserted": report.inserted,
        "updated": report.updated,
        "rejected": report.rejected,
        "summary": report.summary,
    })))
}

/// GET /countries - List countries (?region=&currency=&sort=gdp_desc)
async fn list_countries(
    State(state): State<AppState>,
    Query(filter): Query<CountryFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_by_filter(&filter)?))
}

/// GET /countries/:name - One country
async fn get_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_by_name(&name)?))
}

/// DELETE /countries/:name - Remove one country
async fn delete_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_by_name(&name)?;
    Ok(Json(json!({ "message": format!("Country '{}' deleted", name) })))
}

/// GET /countries/image - Last rendered summary
async fn summary_image(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let image = state.service.summary_image()?;
    Ok(([(header::CONTENT_TYPE, image.content_type)], image.bytes))
}

/// GET /status - Record count and last refresh
async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_status()?))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("COUNTRY_LEDGER_CONFIG").ok();
    let config = AppConfig::load(config_path.as_deref().map(std::path::Path::new))?
        .with_env_overrides();
    init_tracing(&config.logging)?;

    let state = AppState {
        service: Arc::new(CountryService::from_config(&config)?),
    };

    let app = Router::new()
        .route("/countries", get(list_countries))
        .route("/countries/refresh", post(refresh))
        .route("/countries/image", get(summary_image))
        .route("/countries/:name", get(get_country).delete(delete_country))
        .route("/status", get(status))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "country server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
