use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::AuditEntry;
use crate::models::booking::{Address, Booking, BookingStatus, CleaningService};
use crate::models::cleaner::{CleanerProfile, GeoPoint};
use crate::models::payment::{Payment, PaymentStatus, PayoutBreakdown};
use crate::stores::{
    AddressStore, AuditLog, BookingStore, CleanerDirectory, PaymentStore, ServiceCatalog,
};

/// DashMap-backed stand-in for the relational store. Shard locks make
/// the conditional writes genuine compare-and-set operations.
#[derive(Default)]
pub struct MemoryStore {
    bookings: DashMap<Uuid, Booking>,
    addresses: DashMap<Uuid, Address>,
    services: DashMap<Uuid, CleaningService>,
    cleaners: DashMap<Uuid, CleanerProfile>,
    payments: DashMap<Uuid, Payment>,
    payment_by_booking: DashMap<Uuid, Uuid>,
    audit: DashMap<Uuid, Vec<AuditEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cleaner_count(&self) -> usize {
        self.cleaners.len()
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    pub fn payment_count(&self) -> usize {
        self.payments.len()
    }

    pub fn all_cleaners(&self) -> Vec<CleanerProfile> {
        self.cleaners
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl BookingStore for MemoryStore {
    fn booking(&self, id: Uuid) -> Option<Booking> {
        self.bookings.get(&id).map(|entry| entry.value().clone())
    }

    fn insert_booking(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    fn cleaner_bookings_on(&self, cleaner_id: Uuid, day: NaiveDate) -> Vec<Booking> {
        self.bookings
            .iter()
            .filter(|entry| {
                let booking = entry.value();
                booking.cleaner_id == Some(cleaner_id)
                    && booking.status != BookingStatus::Cancelled
                    && booking.scheduled_start.date_naive() == day
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn bookings_for_cleaner(&self, cleaner_id: Uuid) -> Vec<Booking> {
        self.bookings
            .iter()
            .filter(|entry| entry.value().cleaner_id == Some(cleaner_id))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn assign_cleaner(
        &self,
        booking_id: Uuid,
        expected: Option<Uuid>,
        cleaner_id: Uuid,
    ) -> Result<Booking, AppError> {
        let mut booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        if booking.cleaner_id != expected {
            return Err(AppError::AssignmentConflict(format!(
                "booking {booking_id} changed since read"
            )));
        }

        booking.cleaner_id = Some(cleaner_id);
        Ok(booking.clone())
    }

    fn update_status(&self, booking_id: Uuid, status: BookingStatus) -> Result<Booking, AppError> {
        let mut booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        booking.status = status;
        Ok(booking.clone())
    }
}

impl AddressStore for MemoryStore {
    fn coordinates(&self, address_id: Uuid) -> Option<GeoPoint> {
        self.addresses
            .get(&address_id)
            .map(|entry| entry.value().location)
    }

    fn insert_address(&self, address: Address) {
        self.addresses.insert(address.id, address);
    }
}

impl ServiceCatalog for MemoryStore {
    fn service(&self, id: Uuid) -> Option<CleaningService> {
        self.services.get(&id).map(|entry| entry.value().clone())
    }

    fn insert_service(&self, service: CleaningService) {
        self.services.insert(service.id, service);
    }
}

impl CleanerDirectory for MemoryStore {
    fn cleaner(&self, user_id: Uuid) -> Option<CleanerProfile> {
        self.cleaners
            .get(&user_id)
            .map(|entry| entry.value().clone())
    }

    fn active_cleaners(&self) -> Vec<CleanerProfile> {
        self.cleaners
            .iter()
            .filter(|entry| entry.value().is_available)
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn upsert_cleaner(&self, profile: CleanerProfile) {
        self.cleaners.insert(profile.user_id, profile);
    }
}

impl PaymentStore for MemoryStore {
    fn payment(&self, id: Uuid) -> Option<Payment> {
        self.payments.get(&id).map(|entry| entry.value().clone())
    }

    fn payment_for_booking(&self, booking_id: Uuid) -> Option<Payment> {
        let payment_id = *self.payment_by_booking.get(&booking_id)?;
        self.payment(payment_id)
    }

    fn create_payment(&self, payment: Payment) -> Result<Payment, AppError> {
        match self.payment_by_booking.entry(payment.booking_id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "booking {} already has a payment",
                payment.booking_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(payment.id);
                self.payments.insert(payment.id, payment.clone());
                Ok(payment)
            }
        }
    }

    fn record_breakdown(
        &self,
        payment_id: Uuid,
        breakdown: &PayoutBreakdown,
    ) -> Result<Payment, AppError> {
        let mut payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id} not found")))?;

        if payment.processor_fee.is_some() {
            return Err(AppError::Conflict(format!(
                "payment {payment_id} already has a payout breakdown"
            )));
        }

        payment.processor_fee = Some(breakdown.processor_fee);
        payment.commission_rate = Some(breakdown.commission_rate);
        payment.commission_amount = Some(breakdown.commission_amount);
        payment.cleaner_payout = Some(breakdown.cleaner_payout);
        Ok(payment.clone())
    }

    fn update_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<Payment, AppError> {
        let mut payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id} not found")))?;

        payment.status = status;
        Ok(payment.clone())
    }

    fn mark_paid_to_provider(
        &self,
        payment_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        let mut payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id} not found")))?;

        if payment.paid_to_provider {
            return Err(AppError::Conflict(format!(
                "payment {payment_id} already paid to provider"
            )));
        }

        payment.paid_to_provider = true;
        payment.payout_date = Some(at);
        Ok(payment.clone())
    }
}

impl AuditLog for MemoryStore {
    fn append(&self, entry: AuditEntry) -> Result<(), AppError> {
        self.audit.entry(entry.booking_id).or_default().push(entry);
        Ok(())
    }

    fn entries_for(&self, booking_id: Uuid) -> Vec<AuditEntry> {
        self.audit
            .get(&booking_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}
