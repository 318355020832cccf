use std::collections::BTreeSet;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// (0,0) and non-finite coordinates mean the address was never
    /// geocoded; such a point must not enter distance math as a real
    /// location.
    pub fn is_known(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && !(self.lat == 0.0 && self.lng == 0.0)
    }
}

/// Named days, independent of any locale's notion of week start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerProfile {
    pub user_id: Uuid,
    pub name: String,
    pub work_location: GeoPoint,
    pub work_radius_km: f64,
    pub available_days: BTreeSet<DayOfWeek>,
    pub is_available: bool,
    pub rating: Option<f64>,
    pub updated_at: DateTime<Utc>,
}
