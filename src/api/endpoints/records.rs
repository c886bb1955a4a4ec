//! Observation records endpoints.
//!
//! `POST /api/records`: append already-normalized observations
//! `GET /api/records`: the caller's stored observations
//!
//! Parsing uploaded files into observations happens before this layer.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::models::Observation;

#[derive(Deserialize)]
pub struct RecordsUpload {
    pub observations: Vec<Observation>,
}

#[derive(Serialize)]
pub struct RecordsStored {
    pub stored: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct RecordsResponse {
    pub observations: Vec<Observation>,
}

/// `POST /api/records`
pub async fn append(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(upload): Json<RecordsUpload>,
) -> Result<Json<RecordsStored>, ApiError> {
    if upload.observations.is_empty() {
        return Err(ApiError::BadRequest("no observations supplied".into()));
    }
    if let Some(blank) = upload
        .observations
        .iter()
        .position(|o| o.parameter_name.trim().is_empty())
    {
        return Err(ApiError::BadRequest(format!(
            "observation {blank} has an empty parameter name"
        )));
    }

    let stored = upload.observations.len();
    let total = ctx.store.append(&user.user_id, upload.observations)?;
    Ok(Json(RecordsStored { stored, total }))
}

/// `GET /api/records`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let mut observations = ctx.store.observations_for(&user.user_id)?;
    observations.sort_by_key(|o| o.collected_at);
    Ok(Json(RecordsResponse { observations }))
}
