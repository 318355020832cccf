use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post, put};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{AuditEntry, AutoAssignOutcome, Candidate};
use crate::models::booking::{Address, Booking, BookingStatus, CleaningService};
use crate::models::cleaner::GeoPoint;
use crate::state::AppState;
use crate::stores::{AddressStore, AuditLog, BookingStore, ServiceCatalog};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/addresses", post(create_address))
        .route("/services", post(create_service))
        .route("/bookings", post(create_booking))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/status", patch(update_booking_status))
        .route("/bookings/:id/audit", get(get_audit))
        .route("/bookings/:id/candidates", get(get_candidates))
        .route("/bookings/:id/assignments/auto", post(auto_assign))
        .route("/bookings/:id/assignments", put(manual_assign))
}

#[derive(Deserialize)]
pub struct CreateAddressRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub base_duration_minutes: u32,
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    pub address_id: Uuid,
    pub service_id: Uuid,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub price: Decimal,
}

#[derive(Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Deserialize)]
pub struct ManualAssignRequest {
    pub cleaner_id: Uuid,
    pub actor: String,
}

async fn create_address(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAddressRequest>,
) -> Json<Address> {
    let address = Address {
        id: Uuid::new_v4(),
        location: payload.location,
    };
    state.store.insert_address(address.clone());
    Json(address)
}

async fn create_service(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateServiceRequest>,
) -> Result<Json<CleaningService>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let service = CleaningService {
        id: Uuid::new_v4(),
        name: payload.name,
        base_duration_minutes: payload.base_duration_minutes,
    };
    state.store.insert_service(service.clone());
    Ok(Json(service))
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    if payload.duration_minutes == 0 {
        return Err(AppError::BadRequest("duration must be > 0".to_string()));
    }
    if payload.price.is_sign_negative() {
        return Err(AppError::BadRequest("price cannot be negative".to_string()));
    }
    state
        .store
        .coordinates(payload.address_id)
        .ok_or_else(|| AppError::NotFound(format!("address {} not found", payload.address_id)))?;
    state
        .store
        .service(payload.service_id)
        .ok_or_else(|| AppError::NotFound(format!("service {} not found", payload.service_id)))?;

    let booking = Booking {
        id: Uuid::new_v4(),
        customer_id: payload.customer_id,
        address_id: payload.address_id,
        service_id: payload.service_id,
        cleaner_id: None,
        status: BookingStatus::Pending,
        scheduled_start: payload.scheduled_start,
        duration_minutes: payload.duration_minutes,
        price: payload.price,
        created_at: Utc::now(),
    };

    state.store.insert_booking(booking.clone());
    state.metrics.unassigned_bookings.inc();
    Ok(Json(booking))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .store
        .booking(id)
        .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;

    Ok(Json(booking))
}

async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.store.update_status(id, payload.status)?;
    Ok(Json(booking))
}

async fn get_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    state
        .store
        .booking(id)
        .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;

    Ok(Json(state.store.entries_for(id)))
}

async fn get_candidates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Candidate>>, AppError> {
    state.coordinator.find_candidates(id).map(Json)
}

async fn auto_assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AutoAssignOutcome>, AppError> {
    let start = Instant::now();
    let result = state.coordinator.auto_assign(id);
    let elapsed = start.elapsed().as_secs_f64();

    let outcome = match &result {
        Ok(AutoAssignOutcome::Assigned { .. }) => "success",
        Ok(AutoAssignOutcome::Rejected { .. }) => "rejected",
        Err(_) => "error",
    };
    state
        .metrics
        .assignment_latency_seconds
        .with_label_values(&[outcome])
        .observe(elapsed);
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();

    if matches!(result, Ok(AutoAssignOutcome::Assigned { .. })) {
        state.metrics.unassigned_bookings.dec();
    }

    result.map(Json)
}

async fn manual_assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ManualAssignRequest>,
) -> Result<Json<Booking>, AppError> {
    if payload.actor.trim().is_empty() {
        return Err(AppError::BadRequest("actor cannot be empty".to_string()));
    }

    let was_unassigned = state
        .store
        .booking(id)
        .is_some_and(|booking| booking.cleaner_id.is_none());

    let booking = state
        .coordinator
        .manual_assign(id, payload.cleaner_id, &payload.actor)?;

    state
        .metrics
        .assignments_total
        .with_label_values(&["manual"])
        .inc();
    if was_unassigned {
        state.metrics.unassigned_bookings.dec();
    }

    Ok(Json(booking))
}
