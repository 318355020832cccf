use chrono::{DateTime, Datelike, Duration, Utc};

use crate::error::AppError;
use crate::geo;
use crate::models::assignment::AvailabilityTier;
use crate::models::booking::Booking;
use crate::models::cleaner::{CleanerProfile, DayOfWeek, GeoPoint};

/// Half-open service window [start, end). A visit ending exactly when
/// another starts does not conflict with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn for_booking(booking: &Booking) -> Result<Self, AppError> {
        let end = booking
            .scheduled_start
            .checked_add_signed(Duration::minutes(i64::from(booking.duration_minutes)))
            .ok_or_else(|| AppError::BadRequest("booking window out of range".to_string()))?;

        Ok(Self {
            start: booking.scheduled_start,
            end,
        })
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Classifies one cleaner against one candidate window. Day mismatch or
/// a time conflict is Unavailable outright; a cleaner who could take the
/// job but sits outside their work radius (or whose distance cannot be
/// established) stays Limited so manual assignment can still reach them.
pub fn classify(
    profile: &CleanerProfile,
    window: &TimeWindow,
    address: &GeoPoint,
    existing: &[TimeWindow],
) -> (AvailabilityTier, Option<f64>) {
    let distance_km = geo::known_distance_km(address, &profile.work_location);

    let day = DayOfWeek::from(window.start.weekday());
    if !profile.available_days.contains(&day) {
        return (AvailabilityTier::Unavailable, distance_km);
    }

    if existing.iter().any(|busy| busy.overlaps(window)) {
        return (AvailabilityTier::Unavailable, distance_km);
    }

    match distance_km {
        Some(km) if km <= profile.work_radius_km => (AvailabilityTier::Available, distance_km),
        _ => (AvailabilityTier::Limited, distance_km),
    }
}
