use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::cache::occupancy_key;
use crate::entities::qr_scan_log;
use crate::error::{AppError, AppResult};
use crate::handlers::{bust_branch_caches, cafe_of_branch, publish};
use crate::policy::{self, Action, Resource};
use crate::services::admission::{self, AdmissionVerdict, ResourceKind};
use crate::services::checkin::{self, ScanOutcome};
use crate::services::occupancy;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Booking code or the full QR payload.
    pub code: String,
    pub cafe_id: Option<Uuid>,
}

/// Check a guest in at the door
pub async fn scan_qr(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ScanRequest>,
) -> AppResult<Json<ScanOutcome>> {
    let cafe_id = policy::cafe_scope(&claims, payload.cafe_id)?;

    let outcome = checkin::scan(&state.db, &payload.code, cafe_id, claims.sub, Utc::now()).await?;

    if !outcome.already_checked_in {
        bust_branch_caches(&state, outcome.booking.branch_id).await;
    }
    publish(&state, outcome.events.clone());

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ScanLogQuery {
    pub cafe_id: Option<Uuid>,
    pub limit: Option<u64>,
}

/// Recent scan attempts at the caller's café
pub async fn scan_logs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ScanLogQuery>,
) -> AppResult<Json<Vec<qr_scan_log::Model>>> {
    let cafe_id = policy::cafe_scope(&claims, query.cafe_id)?;
    let logs = checkin::list_scan_logs(&state.db, cafe_id, query.limit.unwrap_or(50)).await?;
    Ok(Json(logs))
}

/// Live occupancy of a branch
pub async fn branch_occupancy(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let cafe_id = cafe_of_branch(&state, branch_id).await?;
    policy::authorize(&claims, Resource::Cafe(cafe_id), Action::Read)?;

    let key = occupancy_key(branch_id);
    if let Some(cached) = state.cache.get(&key).await {
        return Ok(Json(cached));
    }

    let report = occupancy::branch_occupancy(&state.db, branch_id, Utc::now()).await?;
    let body = serde_json::to_value(&report)
        .map_err(|e| AppError::Internal(format!("Failed to encode occupancy: {}", e)))?;
    state
        .cache
        .set(
            &key,
            body.clone(),
            Duration::from_secs(state.config.occupancy_cache_ttl_secs),
        )
        .await;

    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct AdmissionQuery {
    pub cafe_id: Option<Uuid>,
}

/// Whether the café may create one more of a resource
pub async fn check_admission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(kind): Path<ResourceKind>,
    Query(query): Query<AdmissionQuery>,
) -> AppResult<Json<AdmissionVerdict>> {
    let cafe_id = policy::cafe_scope(&claims, query.cafe_id)?;
    Ok(Json(
        admission::check_admission(&state.db, cafe_id, kind, Utc::now()).await,
    ))
}
