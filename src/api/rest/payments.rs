use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::payout;
use crate::error::AppError;
use crate::models::payment::{Payment, PaymentMethod, PayoutBreakdown};
use crate::state::AppState;
use crate::stores::{BookingStore, PaymentStore};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings/:id/payments", post(record_payment))
        .route("/payments/:id", get(get_payment))
        .route("/payments/:id/breakdown", get(get_breakdown))
        .route("/payments/:id/complete", post(complete_payment))
        .route("/payments/:id/fail", post(fail_payment))
        .route("/payments/:id/payout", post(mark_paid_to_provider))
}

#[derive(Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
}

async fn record_payment(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<Json<Payment>, AppError> {
    state
        .payments
        .record_payment(booking_id, payload.amount, payload.method)
        .map(Json)
}

async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let payment = state
        .store
        .payment(id)
        .ok_or_else(|| AppError::NotFound(format!("payment {id} not found")))?;

    Ok(Json(payment))
}

/// Replays the decomposition from the persisted fee, for audits and
/// backfills. Must agree with what completion wrote to the row.
async fn get_breakdown(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PayoutBreakdown>, AppError> {
    let payment = state
        .store
        .payment(id)
        .ok_or_else(|| AppError::NotFound(format!("payment {id} not found")))?;

    let (Some(fee), Some(rate)) = (payment.processor_fee, payment.commission_rate) else {
        return Err(AppError::Conflict(format!(
            "payment {id} has no recorded breakdown"
        )));
    };

    payout::calculate_payout_from_stored_fee(payment.amount, fee, rate).map(Json)
}

async fn complete_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.payments.complete_payment(id)?;

    state
        .metrics
        .payments_completed_total
        .with_label_values(&[payment.method.label()])
        .inc();

    if let Some(booking) = state.store.booking(payment.booking_id) {
        if let Some(cleaner_id) = booking.cleaner_id {
            state.earnings.invalidate(cleaner_id);
        }
    }

    Ok(Json(payment))
}

async fn fail_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    state.payments.fail_payment(id).map(Json)
}

async fn mark_paid_to_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.payments.mark_paid_to_provider(id, Utc::now())?;

    if let Some(booking) = state.store.booking(payment.booking_id) {
        if let Some(cleaner_id) = booking.cleaner_id {
            state.earnings.rebuild(cleaner_id, Utc::now());
            state.metrics.earnings_rebuilds_total.inc();
        }
    }

    Ok(Json(payment))
}
