use crate::cache_validator::RunStore;
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::lookups::{LookupService, StaticLookups};
use crate::merger::DuplicateMerger;
use crate::models::*;
use crate::name_parser::NameParser;
use crate::pipeline::{CleaningPipeline, DeduplicationEngine};
use crate::scoring::QualityScorer;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

/// Maximum accepted request body (5 MB).
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Name standardization tables, loaded once at start-up.
    pub lookups: Arc<dyn LookupService>,
    /// Completed cleaning runs, checksum-validated on read.
    pub run_store: RunStore,
}

impl AppState {
    /// Builds the state from configuration, loading lookup tables from
    /// `LOOKUP_TABLES_PATH` when set.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let lookups = StaticLookups::load(config.lookup_tables_path.as_deref())?;
        Ok(Self::with_lookups(config, Arc::new(lookups)))
    }

    pub fn with_lookups(config: Config, lookups: Arc<dyn LookupService>) -> Self {
        let run_store = RunStore::new(
            Duration::from_secs(config.run_cache_ttl_secs),
            config.run_cache_capacity,
        );
        Self {
            config,
            lookups,
            run_store,
        }
    }

    fn check_batch_size(&self, len: usize) -> Result<(), AppError> {
        if len > self.config.max_records {
            return Err(AppError::BadRequest(format!(
                "Batch of {} records exceeds the limit of {}",
                len, self.config.max_records
            )));
        }
        Ok(())
    }
}

/// API routes, without the per-IP rate limiter the server adds on top.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/clean", post(clean_records))
        .route("/api/v1/runs/:run_id", get(get_run))
        .route("/api/v1/names/parse", post(parse_name))
        .route("/api/v1/records/score", post(score_records))
        .route("/api/v1/duplicates/detect", post(detect_duplicates))
        .route("/api/v1/duplicates/merge", post(merge_duplicates))
}

/// Complete application router minus rate limiting and tracing layers.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api_routes().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)))
        .with_state(state)
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "contact-cleaner",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/clean
///
/// Runs the full cleaning pipeline over a batch and stores the result so it
/// can be fetched again by run id.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - Records plus optional per-request deduplication settings.
///
/// # Returns
///
/// * `Result<Json<CleanResponse>, AppError>` - Cleaned records, candidates, audit trail and stats.
pub async fn clean_records(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CleanRequest>,
) -> Result<Json<CleanResponse>, AppError> {
    tracing::info!("POST /clean - {} records", payload.records.len());
    state.check_batch_size(payload.records.len())?;

    let settings = match &payload.settings {
        Some(over) => state.config.dedup.apply_override(over)?,
        None => state.config.dedup.clone(),
    };

    let lookups = state.lookups.clone();
    let records = payload.records;
    let run = tokio::task::spawn_blocking(move || {
        CleaningPipeline::new(lookups.as_ref(), settings)?.run(&records)
    })
    .await
    .map_err(|e| AppError::InternalError(format!("Cleaning task failed: {}", e)))?
    .context("cleaning run")?;

    let response = CleanResponse {
        run_id: Uuid::new_v4(),
        processed_at: chrono::Utc::now(),
        records: run.records,
        candidates: run.candidates,
        audit: run.audit,
        stats: run.stats,
    };

    state.run_store.put(&response).await?;
    tracing::info!(
        "Run {} stored: {} records out, {} merges",
        response.run_id,
        response.stats.output_records,
        response.stats.merger.merges
    );

    Ok(Json(response))
}

/// GET /api/v1/runs/:run_id
///
/// Retrieves a stored cleaning run.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `run_id` - The UUID returned by `POST /api/v1/clean`.
///
/// # Returns
///
/// * `Result<Json<CleanResponse>, AppError>` - The stored run, or 404 when unknown, expired, or corrupted.
pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<CleanResponse>, AppError> {
    tracing::info!("GET /runs/{}", run_id);

    state
        .run_store
        .get(&run_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Run {} not found", run_id)))
}

/// POST /api/v1/names/parse
///
/// Parses a single name. Never fails on the name itself; an unusable name
/// comes back empty with `parsing_source` `NONE`.
pub async fn parse_name(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ParseNameRequest>,
) -> Result<Json<ParsedName>, AppError> {
    tracing::info!("POST /names/parse");

    let parser = NameParser::new(state.lookups.as_ref());
    let parsed = parser.parse(
        payload.full_name.as_deref(),
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.middle_name.as_deref(),
        payload.prefix.as_deref(),
        payload.suffix.as_deref(),
    );

    let parsed = if payload.merge_compound {
        parser.merge_compound(parsed)
    } else {
        parsed
    };

    Ok(Json(parsed))
}

/// POST /api/v1/records/score
///
/// Annotates each record with `quality_score`, `quality_tier`,
/// `quality_components`, `quality_issues` and the name quality flags.
pub async fn score_records(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecordsRequest>,
) -> Result<Json<RecordsResponse>, AppError> {
    tracing::info!("POST /records/score - {} records", payload.records.len());
    state.check_batch_size(payload.records.len())?;

    Ok(Json(RecordsResponse {
        records: QualityScorer::score_records(&payload.records),
    }))
}

/// POST /api/v1/duplicates/detect
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - Records plus optional threshold overrides.
///
/// # Returns
///
/// * `Result<Json<DetectResponse>, AppError>` - Candidates in pair order, or 400 for thresholds outside [0, 1].
pub async fn detect_duplicates(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, AppError> {
    tracing::info!("POST /duplicates/detect - {} records", payload.records.len());
    state.check_batch_size(payload.records.len())?;

    let settings = match &payload.settings {
        Some(over) => state.config.dedup.apply_override(over)?,
        None => state.config.dedup.clone(),
    };
    let engine = DeduplicationEngine::new(settings)?;

    let records = payload.records;
    let detection = tokio::task::spawn_blocking(move || engine.detect(&records))
        .await
        .map_err(|e| AppError::InternalError(format!("Detection task failed: {}", e)))?;

    Ok(Json(DetectResponse {
        candidates: detection.candidates,
        stats: detection.stats,
    }))
}

/// POST /api/v1/duplicates/merge
///
/// Merges caller-supplied candidates. Candidates that point outside the
/// batch, repeat a pair, or carry a confidence outside [0, 1] are rejected
/// with 422.
pub async fn merge_duplicates(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, AppError> {
    tracing::info!(
        "POST /duplicates/merge - {} records, {} candidates",
        payload.records.len(),
        payload.candidates.len()
    );
    state.check_batch_size(payload.records.len())?;

    let policy = payload.policy.unwrap_or(state.config.dedup.merge_policy);
    let (records, candidates) = (payload.records, payload.candidates);
    let (outcome, stats) = tokio::task::spawn_blocking(move || {
        DuplicateMerger::new(policy).merge_groups(&records, &candidates)
    })
    .await
    .map_err(|e| AppError::InternalError(format!("Merge task failed: {}", e)))??;

    Ok(Json(MergeResponse {
        records: outcome.records,
        audit: outcome.audit,
        stats,
    }))
}
