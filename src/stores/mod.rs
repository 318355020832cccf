pub mod memory;
pub mod notify;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::AuditEntry;
use crate::models::booking::{Address, Booking, BookingStatus, CleaningService};
use crate::models::cleaner::{CleanerProfile, GeoPoint};
use crate::models::payment::{Payment, PaymentStatus, PayoutBreakdown};

/// Booking rows: reads plus the two writes this core owns, the
/// conditional cleaner assignment and status transitions.
pub trait BookingStore: Send + Sync {
    fn booking(&self, id: Uuid) -> Option<Booking>;

    fn insert_booking(&self, booking: Booking);

    /// Non-cancelled bookings held by one cleaner on one calendar day.
    fn cleaner_bookings_on(&self, cleaner_id: Uuid, day: NaiveDate) -> Vec<Booking>;

    fn bookings_for_cleaner(&self, cleaner_id: Uuid) -> Vec<Booking>;

    /// Conditional write: succeeds only while the row's cleaner is still
    /// `expected`. A concurrent writer surfaces as AssignmentConflict,
    /// never as a silent last-write-wins.
    fn assign_cleaner(
        &self,
        booking_id: Uuid,
        expected: Option<Uuid>,
        cleaner_id: Uuid,
    ) -> Result<Booking, AppError>;

    fn update_status(&self, booking_id: Uuid, status: BookingStatus) -> Result<Booking, AppError>;
}

pub trait AddressStore: Send + Sync {
    fn coordinates(&self, address_id: Uuid) -> Option<GeoPoint>;

    fn insert_address(&self, address: Address);
}

pub trait ServiceCatalog: Send + Sync {
    fn service(&self, id: Uuid) -> Option<CleaningService>;

    fn insert_service(&self, service: CleaningService);
}

pub trait CleanerDirectory: Send + Sync {
    fn cleaner(&self, user_id: Uuid) -> Option<CleanerProfile>;

    /// Profiles whose availability toggle is on.
    fn active_cleaners(&self) -> Vec<CleanerProfile>;

    fn upsert_cleaner(&self, profile: CleanerProfile);
}

pub trait PaymentStore: Send + Sync {
    fn payment(&self, id: Uuid) -> Option<Payment>;

    fn payment_for_booking(&self, booking_id: Uuid) -> Option<Payment>;

    /// Exactly one payment per booking; a second create is a Conflict.
    fn create_payment(&self, payment: Payment) -> Result<Payment, AppError>;

    /// Write-once: recording a breakdown over an existing one is a
    /// Conflict.
    fn record_breakdown(
        &self,
        payment_id: Uuid,
        breakdown: &PayoutBreakdown,
    ) -> Result<Payment, AppError>;

    fn update_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<Payment, AppError>;

    fn mark_paid_to_provider(
        &self,
        payment_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Payment, AppError>;
}

/// Best-effort downstream messaging. Failures are reported to the
/// caller for logging, never for rollback of a committed assignment.
pub trait NotificationGateway: Send + Sync {
    fn notify_assigned(&self, booking_id: Uuid, cleaner_id: Uuid) -> Result<(), AppError>;

    fn notify_reassigned(
        &self,
        booking_id: Uuid,
        cleaner_id: Uuid,
        previous_cleaner: Uuid,
    ) -> Result<(), AppError>;
}

pub trait AuditLog: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<(), AppError>;

    fn entries_for(&self, booking_id: Uuid) -> Vec<AuditEntry>;
}
