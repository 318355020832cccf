use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Three-valued availability classification. Limited is deliberately
/// kept distinct from Unavailable: automatic assignment ignores it, but
/// an admin override may still pick a Limited cleaner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AvailabilityTier {
    Available,
    Limited,
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub cleaner_id: Uuid,
    pub tier: AvailabilityTier,
    pub distance_km: Option<f64>,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AutoAssignOutcome {
    Assigned { cleaner_id: Uuid },
    Rejected { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentEventKind {
    Assigned,
    Reassigned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub booking_id: Uuid,
    pub cleaner_id: Uuid,
    pub previous_cleaner: Option<Uuid>,
    pub kind: AssignmentEventKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub booking_id: Uuid,
    pub actor: String,
    pub note: String,
    pub at: DateTime<Utc>,
}
