use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::cleaner::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

/// One cleaning visit. `cleaner_id` is a single nullable reference and
/// assignment always overwrites it as a whole; the price is never
/// mutated once a payment exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub address_id: Uuid,
    pub service_id: Uuid,
    pub cleaner_id: Option<Uuid>,
    pub status: BookingStatus,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Geocoding happens upstream; the store only ever sees resolved
/// coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningService {
    pub id: Uuid,
    pub name: String,
    pub base_duration_minutes: u32,
}
