use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::earnings::CleanerEarningsSummary;
use crate::error::AppError;
use crate::models::cleaner::{CleanerProfile, DayOfWeek, GeoPoint};
use crate::state::AppState;
use crate::stores::CleanerDirectory;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cleaners", post(create_cleaner).get(list_cleaners))
        .route("/cleaners/:id/availability", patch(update_availability))
        .route("/cleaners/:id/earnings", get(get_earnings))
        .route("/cleaners/:id/earnings/rebuild", post(rebuild_earnings))
}

#[derive(Deserialize)]
pub struct CreateCleanerRequest {
    pub name: String,
    pub work_location: GeoPoint,
    pub work_radius_km: f64,
    pub available_days: BTreeSet<DayOfWeek>,
    pub rating: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: Option<bool>,
    pub available_days: Option<BTreeSet<DayOfWeek>>,
}

async fn create_cleaner(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCleanerRequest>,
) -> Result<Json<CleanerProfile>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if !payload.work_radius_km.is_finite() || payload.work_radius_km <= 0.0 {
        return Err(AppError::BadRequest(
            "work radius must be > 0".to_string(),
        ));
    }

    let profile = CleanerProfile {
        user_id: Uuid::new_v4(),
        name: payload.name,
        work_location: payload.work_location,
        work_radius_km: payload.work_radius_km,
        available_days: payload.available_days,
        is_available: true,
        rating: payload.rating.map(|rating| rating.clamp(0.0, 5.0)),
        updated_at: Utc::now(),
    };

    state.store.upsert_cleaner(profile.clone());
    Ok(Json(profile))
}

async fn list_cleaners(State(state): State<Arc<AppState>>) -> Json<Vec<CleanerProfile>> {
    Json(state.store.all_cleaners())
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<CleanerProfile>, AppError> {
    let mut profile = state
        .store
        .cleaner(id)
        .ok_or_else(|| AppError::NotFound(format!("cleaner {id} not found")))?;

    if let Some(flag) = payload.is_available {
        profile.is_available = flag;
    }
    if let Some(days) = payload.available_days {
        profile.available_days = days;
    }
    profile.updated_at = Utc::now();

    state.store.upsert_cleaner(profile.clone());
    Ok(Json(profile))
}

async fn get_earnings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CleanerEarningsSummary>, AppError> {
    state
        .store
        .cleaner(id)
        .ok_or_else(|| AppError::NotFound(format!("cleaner {id} not found")))?;

    Ok(Json(state.earnings.summary(id, Utc::now())))
}

async fn rebuild_earnings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CleanerEarningsSummary>, AppError> {
    state
        .store
        .cleaner(id)
        .ok_or_else(|| AppError::NotFound(format!("cleaner {id} not found")))?;

    let summary = state.earnings.rebuild(id, Utc::now());
    state.metrics.earnings_rebuilds_total.inc();
    Ok(Json(summary))
}
