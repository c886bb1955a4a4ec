//! Analysis endpoints.
//!
//! `GET /api/analysis/trends/:parameter`: trend over a window
//! `GET /api/analysis/anomalies`: most-recent-value anomalies
//! `GET /api/analysis/health-score`: weighted composite score
//! `GET /api/analysis/reference-ranges`: catalog table
//!
//! Each handler loads the user's full history from the store and recomputes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::analytics::{AnomalyFinding, HealthScore, RangeTableEntry, TrendOutcome};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::models::{Category, Stratum, Timeframe};

#[derive(Deserialize)]
pub struct TrendQuery {
    pub timeframe: Option<String>,
}

#[derive(Deserialize)]
pub struct ScoreQuery {
    pub stratum: Option<String>,
}

/// `GET /api/analysis/trends/:parameter?timeframe=1m|6m|1y`
pub async fn trends(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(parameter): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendOutcome>, ApiError> {
    let timeframe = Timeframe::parse_lenient(query.timeframe.as_deref());
    let observations = ctx.store.observations_for(&user.user_id)?;
    let outcome = ctx.engine.trend(&observations, &parameter, timeframe)?;
    Ok(Json(outcome))
}

/// `GET /api/analysis/anomalies`
///
/// Fitting runs on the blocking pool so request threads stay free.
pub async fn anomalies(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Vec<AnomalyFinding>>, ApiError> {
    let observations = ctx.store.observations_for(&user.user_id)?;
    let engine = Arc::clone(&ctx.engine);

    let findings = tokio::task::spawn_blocking(move || engine.anomalies(&observations))
        .await
        .map_err(|e| ApiError::Internal(format!("anomaly task failed: {e}")))??;

    Ok(Json(findings))
}

/// `GET /api/analysis/health-score?stratum=male|female`
pub async fn health_score(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<ScoreQuery>,
) -> Result<Json<HealthScore>, ApiError> {
    let stratum = query
        .stratum
        .as_deref()
        .map(str::parse::<Stratum>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let observations = ctx.store.observations_for(&user.user_id)?;
    let score = ctx.engine.health_score(&observations, stratum)?;
    Ok(Json(score))
}

/// `GET /api/analysis/reference-ranges`
pub async fn reference_ranges(
    State(ctx): State<ApiContext>,
) -> Json<BTreeMap<Category, BTreeMap<String, RangeTableEntry>>> {
    Json(ctx.engine.reference_ranges())
}
