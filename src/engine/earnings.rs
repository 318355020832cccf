use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::booking::BookingStatus;
use crate::models::payment::PaymentStatus;
use crate::stores::{BookingStore, PaymentStore};

/// Per-cleaner earnings rollup. A cache over Booking+Payment rows,
/// never a source of truth: `rebuild` recomputes it from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanerEarningsSummary {
    pub cleaner_id: Uuid,
    pub completed_bookings: u64,
    pub lifetime_gross: Decimal,
    pub lifetime_commission: Decimal,
    pub lifetime_payout: Decimal,
    pub pending_payout: Decimal,
    pub current_month_payout: Decimal,
    pub previous_month_payout: Decimal,
    pub year_to_date_payout: Decimal,
    pub last_payout_amount: Option<Decimal>,
    pub last_payout_date: Option<DateTime<Utc>>,
}

impl CleanerEarningsSummary {
    fn empty(cleaner_id: Uuid) -> Self {
        Self {
            cleaner_id,
            completed_bookings: 0,
            lifetime_gross: Decimal::ZERO,
            lifetime_commission: Decimal::ZERO,
            lifetime_payout: Decimal::ZERO,
            pending_payout: Decimal::ZERO,
            current_month_payout: Decimal::ZERO,
            previous_month_payout: Decimal::ZERO,
            year_to_date_payout: Decimal::ZERO,
            last_payout_amount: None,
            last_payout_date: None,
        }
    }
}

pub struct EarningsAggregator {
    bookings: Arc<dyn BookingStore>,
    payments: Arc<dyn PaymentStore>,
    cache: DashMap<Uuid, CleanerEarningsSummary>,
}

impl EarningsAggregator {
    pub fn new(bookings: Arc<dyn BookingStore>, payments: Arc<dyn PaymentStore>) -> Self {
        Self {
            bookings,
            payments,
            cache: DashMap::new(),
        }
    }

    /// Cached view, rebuilding on a cold cache.
    pub fn summary(&self, cleaner_id: Uuid, as_of: DateTime<Utc>) -> CleanerEarningsSummary {
        if let Some(cached) = self.cache.get(&cleaner_id) {
            return cached.clone();
        }
        self.rebuild(cleaner_id, as_of)
    }

    /// Full recomputation from the stores. Idempotent: with no new
    /// payments, repeated rebuilds produce identical summaries. Only
    /// Completed bookings with a Completed, decomposed payment count.
    pub fn rebuild(&self, cleaner_id: Uuid, as_of: DateTime<Utc>) -> CleanerEarningsSummary {
        let mut summary = CleanerEarningsSummary::empty(cleaner_id);

        let mut bookings = self.bookings.bookings_for_cleaner(cleaner_id);
        bookings.sort_by_key(|booking| (booking.scheduled_start, booking.id));

        for booking in &bookings {
            if booking.status != BookingStatus::Completed {
                continue;
            }
            let Some(payment) = self.payments.payment_for_booking(booking.id) else {
                continue;
            };
            if payment.status != PaymentStatus::Completed {
                continue;
            }
            let (Some(commission), Some(payout_amount)) =
                (payment.commission_amount, payment.cleaner_payout)
            else {
                continue;
            };

            summary.completed_bookings += 1;
            summary.lifetime_gross += payment.amount;
            summary.lifetime_commission += commission;
            summary.lifetime_payout += payout_amount;

            if !payment.paid_to_provider {
                summary.pending_payout += payout_amount;
            }

            let start = booking.scheduled_start;
            if start.year() == as_of.year() {
                summary.year_to_date_payout += payout_amount;
                if start.month() == as_of.month() {
                    summary.current_month_payout += payout_amount;
                }
            }
            if month_key(start) == previous_month_key(as_of) {
                summary.previous_month_payout += payout_amount;
            }

            if payment.paid_to_provider {
                if let Some(date) = payment.payout_date {
                    if summary.last_payout_date.is_none_or(|last| date > last) {
                        summary.last_payout_date = Some(date);
                        summary.last_payout_amount = Some(payout_amount);
                    }
                }
            }
        }

        debug!(
            cleaner_id = %cleaner_id,
            completed_bookings = summary.completed_bookings,
            "earnings summary rebuilt"
        );
        self.cache.insert(cleaner_id, summary.clone());
        summary
    }

    pub fn invalidate(&self, cleaner_id: Uuid) {
        self.cache.remove(&cleaner_id);
    }
}

fn month_key(at: DateTime<Utc>) -> (i32, u32) {
    (at.year(), at.month())
}

fn previous_month_key(at: DateTime<Utc>) -> (i32, u32) {
    if at.month() == 1 {
        (at.year() - 1, 12)
    } else {
        (at.year(), at.month() - 1)
    }
}
