use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::availability::{self, TimeWindow};
use crate::engine::ranking;
use crate::error::AppError;
use crate::models::assignment::{AuditEntry, AutoAssignOutcome, AvailabilityTier, Candidate};
use crate::models::booking::Booking;
use crate::stores::{
    AddressStore, AuditLog, BookingStore, CleanerDirectory, NotificationGateway, ServiceCatalog,
};

/// Acting principal recorded for automatic assignments.
pub const SYSTEM_ACTOR: &str = "System (Auto)";

/// Conditional writes retry a few times against concurrent writers
/// before giving up with AssignmentConflict.
const ASSIGN_ATTEMPTS: usize = 3;

/// Orchestrates lookup, filtering, ranking and the conditional
/// assignment write. The only piece of the engine that touches the
/// stores; everything it delegates to is a pure function.
pub struct AssignmentCoordinator {
    bookings: Arc<dyn BookingStore>,
    addresses: Arc<dyn AddressStore>,
    services: Arc<dyn ServiceCatalog>,
    cleaners: Arc<dyn CleanerDirectory>,
    notifier: Arc<dyn NotificationGateway>,
    audit: Arc<dyn AuditLog>,
}

impl AssignmentCoordinator {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        addresses: Arc<dyn AddressStore>,
        services: Arc<dyn ServiceCatalog>,
        cleaners: Arc<dyn CleanerDirectory>,
        notifier: Arc<dyn NotificationGateway>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            bookings,
            addresses,
            services,
            cleaners,
            notifier,
            audit,
        }
    }

    /// Read-only candidate listing: every active cleaner classified and
    /// ranked. Limited candidates are included so an admin can still
    /// override outside the work radius.
    pub fn find_candidates(&self, booking_id: Uuid) -> Result<Vec<Candidate>, AppError> {
        let booking = self.booking(booking_id)?;
        self.candidates_for(&booking)
    }

    /// Automatic assignment only ever takes the top Available candidate;
    /// the write is conditional on the booking still being unassigned.
    pub fn auto_assign(&self, booking_id: Uuid) -> Result<AutoAssignOutcome, AppError> {
        for _attempt in 0..ASSIGN_ATTEMPTS {
            let booking = self.booking(booking_id)?;
            if booking.cleaner_id.is_some() {
                return Err(AppError::AssignmentConflict(format!(
                    "booking {booking_id} is already assigned"
                )));
            }

            let candidates = self.candidates_for(&booking)?;
            let Some(top) = candidates
                .iter()
                .find(|candidate| candidate.tier == AvailabilityTier::Available)
            else {
                info!(booking_id = %booking_id, "auto-assign rejected: no available cleaners");
                return Ok(AutoAssignOutcome::Rejected {
                    reason: "no available cleaners".to_string(),
                });
            };

            match self.bookings.assign_cleaner(booking_id, None, top.cleaner_id) {
                Ok(_) => {
                    self.record_audit(
                        booking_id,
                        SYSTEM_ACTOR,
                        format!("auto-assigned cleaner {}", top.cleaner_id),
                    );
                    self.dispatch_notification(booking_id, top.cleaner_id, None);
                    info!(
                        booking_id = %booking_id,
                        cleaner_id = %top.cleaner_id,
                        "booking auto-assigned"
                    );
                    return Ok(AutoAssignOutcome::Assigned {
                        cleaner_id: top.cleaner_id,
                    });
                }
                Err(AppError::AssignmentConflict(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(AppError::AssignmentConflict(format!(
            "booking {booking_id} assignment contended"
        )))
    }

    /// Admin override, permitted for any tier. The previous cleaner
    /// decides whether the customer hears "assigned" or "reassigned",
    /// and goes into the audit entry alongside the acting admin.
    pub fn manual_assign(
        &self,
        booking_id: Uuid,
        cleaner_id: Uuid,
        actor: &str,
    ) -> Result<Booking, AppError> {
        self.cleaners
            .cleaner(cleaner_id)
            .ok_or_else(|| AppError::NotFound(format!("cleaner {cleaner_id} not found")))?;

        for _attempt in 0..ASSIGN_ATTEMPTS {
            let booking = self.booking(booking_id)?;
            let previous = booking.cleaner_id;
            if previous == Some(cleaner_id) {
                return Ok(booking);
            }

            match self.bookings.assign_cleaner(booking_id, previous, cleaner_id) {
                Ok(updated) => {
                    let note = match previous {
                        Some(prev) => {
                            format!("reassigned from cleaner {prev} to cleaner {cleaner_id}")
                        }
                        None => format!("assigned cleaner {cleaner_id}"),
                    };
                    self.record_audit(booking_id, actor, note);
                    self.dispatch_notification(booking_id, cleaner_id, previous);
                    info!(
                        booking_id = %booking_id,
                        cleaner_id = %cleaner_id,
                        actor,
                        "booking manually assigned"
                    );
                    return Ok(updated);
                }
                Err(AppError::AssignmentConflict(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(AppError::AssignmentConflict(format!(
            "booking {booking_id} assignment contended"
        )))
    }

    fn booking(&self, booking_id: Uuid) -> Result<Booking, AppError> {
        self.bookings
            .booking(booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))
    }

    fn candidates_for(&self, booking: &Booking) -> Result<Vec<Candidate>, AppError> {
        let address = self
            .addresses
            .coordinates(booking.address_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("address {} not found", booking.address_id))
            })?;
        self.services.service(booking.service_id).ok_or_else(|| {
            AppError::NotFound(format!("service {} not found", booking.service_id))
        })?;

        let window = TimeWindow::for_booking(booking)?;
        let day = booking.scheduled_start.date_naive();

        let mut candidates = Vec::new();
        for profile in self.cleaners.active_cleaners() {
            let existing: Vec<TimeWindow> = self
                .bookings
                .cleaner_bookings_on(profile.user_id, day)
                .iter()
                .filter(|other| other.id != booking.id)
                .filter_map(|other| TimeWindow::for_booking(other).ok())
                .collect();

            let (tier, distance_km) =
                availability::classify(&profile, &window, &address, &existing);

            candidates.push(Candidate {
                cleaner_id: profile.user_id,
                tier,
                distance_km,
                rating: profile.rating.unwrap_or(0.0),
            });
        }

        ranking::rank(&mut candidates);
        Ok(candidates)
    }

    fn record_audit(&self, booking_id: Uuid, actor: &str, note: String) {
        let entry = AuditEntry {
            booking_id,
            actor: actor.to_string(),
            note,
            at: Utc::now(),
        };
        if let Err(err) = self.audit.append(entry) {
            warn!(booking_id = %booking_id, error = %err, "audit append failed");
        }
    }

    fn dispatch_notification(&self, booking_id: Uuid, cleaner_id: Uuid, previous: Option<Uuid>) {
        let result = match previous {
            Some(prev) => self.notifier.notify_reassigned(booking_id, cleaner_id, prev),
            None => self.notifier.notify_assigned(booking_id, cleaner_id),
        };
        if let Err(err) = result {
            warn!(booking_id = %booking_id, error = %err, "assignment notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::{AssignmentCoordinator, SYSTEM_ACTOR};
    use crate::error::AppError;
    use crate::models::assignment::{AutoAssignOutcome, AvailabilityTier};
    use crate::models::booking::{Address, Booking, BookingStatus, CleaningService};
    use crate::models::cleaner::{CleanerProfile, DayOfWeek, GeoPoint};
    use crate::stores::memory::MemoryStore;
    use crate::stores::{AddressStore, AuditLog, BookingStore, NotificationGateway, ServiceCatalog};
    use crate::stores::CleanerDirectory;

    struct CountingNotifier {
        assigned: AtomicUsize,
        reassigned: AtomicUsize,
        fail: bool,
    }

    impl CountingNotifier {
        fn new(fail: bool) -> Self {
            Self {
                assigned: AtomicUsize::new(0),
                reassigned: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl NotificationGateway for CountingNotifier {
        fn notify_assigned(&self, _booking_id: Uuid, _cleaner_id: Uuid) -> Result<(), AppError> {
            self.assigned.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Internal("gateway down".to_string()));
            }
            Ok(())
        }

        fn notify_reassigned(
            &self,
            _booking_id: Uuid,
            _cleaner_id: Uuid,
            _previous_cleaner: Uuid,
        ) -> Result<(), AppError> {
            self.reassigned.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Internal("gateway down".to_string()));
            }
            Ok(())
        }
    }

    fn coordinator(
        store: &Arc<MemoryStore>,
        notifier: &Arc<CountingNotifier>,
    ) -> AssignmentCoordinator {
        AssignmentCoordinator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            notifier.clone(),
            store.clone(),
        )
    }

    // 2025-06-02 is a Monday.
    fn monday_at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap()
    }

    fn seed_booking(store: &MemoryStore, start: DateTime<Utc>, duration_minutes: u32) -> Booking {
        let address = Address {
            id: Uuid::new_v4(),
            location: GeoPoint {
                lat: -33.9249,
                lng: 18.4241,
            },
        };
        let service = CleaningService {
            id: Uuid::new_v4(),
            name: "standard clean".to_string(),
            base_duration_minutes: 120,
        };
        store.insert_address(address.clone());
        store.insert_service(service.clone());

        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            address_id: address.id,
            service_id: service.id,
            cleaner_id: None,
            status: BookingStatus::Pending,
            scheduled_start: start,
            duration_minutes,
            price: dec!(500.00),
            created_at: Utc::now(),
        };
        store.insert_booking(booking.clone());
        booking
    }

    fn seed_cleaner(
        store: &MemoryStore,
        id_seed: u128,
        lat: f64,
        lng: f64,
        radius_km: f64,
        rating: Option<f64>,
    ) -> CleanerProfile {
        let profile = CleanerProfile {
            user_id: Uuid::from_u128(id_seed),
            name: format!("cleaner-{id_seed}"),
            work_location: GeoPoint { lat, lng },
            work_radius_km: radius_km,
            available_days: BTreeSet::from([
                DayOfWeek::Monday,
                DayOfWeek::Tuesday,
                DayOfWeek::Wednesday,
                DayOfWeek::Thursday,
                DayOfWeek::Friday,
            ]),
            is_available: true,
            rating,
            updated_at: Utc::now(),
        };
        store.upsert_cleaner(profile.clone());
        profile
    }

    #[test]
    fn auto_assign_picks_the_nearest_available_cleaner() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::new(false));
        let coordinator = coordinator(&store, &notifier);

        let near = seed_cleaner(&store, 1, -33.9300, 18.4200, 15.0, Some(4.0));
        seed_cleaner(&store, 2, -33.8000, 18.6000, 50.0, Some(5.0));
        let booking = seed_booking(&store, monday_at(9), 120);

        let outcome = coordinator.auto_assign(booking.id).unwrap();
        match outcome {
            AutoAssignOutcome::Assigned { cleaner_id } => assert_eq!(cleaner_id, near.user_id),
            AutoAssignOutcome::Rejected { reason } => panic!("unexpected rejection: {reason}"),
        }

        let stored = store.booking(booking.id).unwrap();
        assert_eq!(stored.cleaner_id, Some(near.user_id));
        assert_eq!(notifier.assigned.load(Ordering::SeqCst), 1);

        let audit = store.entries_for(booking.id);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].actor, SYSTEM_ACTOR);
    }

    #[test]
    fn auto_assign_rejects_when_every_candidate_is_limited() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::new(false));
        let coordinator = coordinator(&store, &notifier);

        // Johannesburg cleaner, Cape Town booking: far outside radius.
        seed_cleaner(&store, 1, -26.2041, 28.0473, 30.0, Some(4.9));
        let booking = seed_booking(&store, monday_at(9), 120);

        let outcome = coordinator.auto_assign(booking.id).unwrap();
        assert!(matches!(outcome, AutoAssignOutcome::Rejected { .. }));
        assert_eq!(store.booking(booking.id).unwrap().cleaner_id, None);
        assert_eq!(notifier.assigned.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn auto_assign_skips_a_cleaner_with_a_conflicting_visit() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::new(false));
        let coordinator = coordinator(&store, &notifier);

        let busy = seed_cleaner(&store, 1, -33.9300, 18.4200, 15.0, Some(5.0));
        let mut other = seed_booking(&store, monday_at(10), 120);
        other.cleaner_id = Some(busy.user_id);
        store.insert_booking(other);

        let booking = seed_booking(&store, monday_at(11), 60);
        let outcome = coordinator.auto_assign(booking.id).unwrap();
        assert!(matches!(outcome, AutoAssignOutcome::Rejected { .. }));
    }

    #[test]
    fn adjacent_visit_does_not_block_assignment() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::new(false));
        let coordinator = coordinator(&store, &notifier);

        let cleaner = seed_cleaner(&store, 1, -33.9300, 18.4200, 15.0, Some(5.0));
        let mut other = seed_booking(&store, monday_at(9), 180);
        other.cleaner_id = Some(cleaner.user_id);
        store.insert_booking(other);

        // Starts exactly when the existing visit ends.
        let booking = seed_booking(&store, monday_at(12), 60);
        let outcome = coordinator.auto_assign(booking.id).unwrap();
        assert!(matches!(outcome, AutoAssignOutcome::Assigned { .. }));
    }

    #[test]
    fn find_candidates_fails_when_the_address_is_missing() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::new(false));
        let coordinator = coordinator(&store, &notifier);

        let mut booking = seed_booking(&store, monday_at(9), 120);
        booking.address_id = Uuid::new_v4();
        store.insert_booking(booking.clone());

        let err = coordinator.find_candidates(booking.id).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn manual_assign_reaches_a_limited_cleaner_and_records_the_actor() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::new(false));
        let coordinator = coordinator(&store, &notifier);

        let far = seed_cleaner(&store, 1, -26.2041, 28.0473, 30.0, Some(4.0));
        let booking = seed_booking(&store, monday_at(9), 120);

        let candidates = coordinator.find_candidates(booking.id).unwrap();
        assert_eq!(candidates[0].tier, AvailabilityTier::Limited);

        let updated = coordinator
            .manual_assign(booking.id, far.user_id, "ops@example.com")
            .unwrap();
        assert_eq!(updated.cleaner_id, Some(far.user_id));

        let audit = store.entries_for(booking.id);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].actor, "ops@example.com");
        assert_eq!(notifier.assigned.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.reassigned.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reassignment_records_the_previous_cleaner() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::new(false));
        let coordinator = coordinator(&store, &notifier);

        let first = seed_cleaner(&store, 1, -33.9300, 18.4200, 15.0, Some(4.0));
        let second = seed_cleaner(&store, 2, -33.9200, 18.4300, 15.0, Some(4.5));
        let booking = seed_booking(&store, monday_at(9), 120);

        coordinator
            .manual_assign(booking.id, first.user_id, "ops@example.com")
            .unwrap();
        coordinator
            .manual_assign(booking.id, second.user_id, "ops@example.com")
            .unwrap();

        let stored = store.booking(booking.id).unwrap();
        assert_eq!(stored.cleaner_id, Some(second.user_id));

        let audit = store.entries_for(booking.id);
        assert_eq!(audit.len(), 2);
        assert!(audit[1].note.contains(&first.user_id.to_string()));
        assert_eq!(notifier.reassigned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notification_failure_does_not_unwind_the_assignment() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::new(true));
        let coordinator = coordinator(&store, &notifier);

        let cleaner = seed_cleaner(&store, 1, -33.9300, 18.4200, 15.0, Some(4.0));
        let booking = seed_booking(&store, monday_at(9), 120);

        let outcome = coordinator.auto_assign(booking.id).unwrap();
        assert!(matches!(outcome, AutoAssignOutcome::Assigned { .. }));
        assert_eq!(store.booking(booking.id).unwrap().cleaner_id, Some(cleaner.user_id));
    }

    #[test]
    fn concurrent_auto_assign_yields_exactly_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::new(false));
        let coordinator = Arc::new(coordinator(&store, &notifier));

        seed_cleaner(&store, 1, -33.9300, 18.4200, 15.0, Some(4.0));
        let booking = seed_booking(&store, monday_at(9), 120);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let coordinator = coordinator.clone();
                let booking_id = booking.id;
                thread::spawn(move || coordinator.auto_assign(booking_id))
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let wins = results
            .iter()
            .filter(|result| matches!(result, Ok(AutoAssignOutcome::Assigned { .. })))
            .count();
        let conflicts = results
            .iter()
            .filter(|result| matches!(result, Err(AppError::AssignmentConflict(_))))
            .count();

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 1);
        assert!(store.booking(booking.id).unwrap().cleaner_id.is_some());
        assert_eq!(notifier.assigned.load(Ordering::SeqCst), 1);
    }
}
