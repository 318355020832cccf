use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use uuid::Uuid;

use crate::engine::payout;
use crate::error::AppError;
use crate::models::booking::BookingStatus;
use crate::models::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::stores::{BookingStore, PaymentStore};

/// Accepted drift between a charged amount and the booking price.
const AMOUNT_TOLERANCE: Decimal = dec!(0.01);

/// Owns the payment lifecycle around the pure payout math: one payment
/// per booking, breakdown persisted exactly once, booking confirmed on
/// completion.
pub struct PaymentService {
    bookings: Arc<dyn BookingStore>,
    payments: Arc<dyn PaymentStore>,
    commission_rate: Decimal,
}

impl PaymentService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        payments: Arc<dyn PaymentStore>,
        commission_rate: Decimal,
    ) -> Self {
        Self {
            bookings,
            payments,
            commission_rate,
        }
    }

    /// Creates the single Pending payment for a booking. A charge that
    /// drifts from the booking price by more than one cent is refused
    /// outright rather than silently accepted.
    pub fn record_payment(
        &self,
        booking_id: Uuid,
        amount: Decimal,
        method: PaymentMethod,
    ) -> Result<Payment, AppError> {
        let booking = self
            .bookings
            .booking(booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        if amount.is_sign_negative() {
            return Err(AppError::InvalidPaymentAmount(
                "amount cannot be negative".to_string(),
            ));
        }
        if (amount - booking.price).abs() > AMOUNT_TOLERANCE {
            return Err(AppError::InvalidPaymentAmount(format!(
                "amount {amount} does not match booking price {}",
                booking.price
            )));
        }

        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id,
            amount,
            status: PaymentStatus::Pending,
            method,
            processor_fee: None,
            commission_rate: None,
            commission_amount: None,
            cleaner_payout: None,
            paid_to_provider: false,
            payout_date: None,
            created_at: Utc::now(),
        };

        self.payments.create_payment(payment)
    }

    /// Decomposes the completed charge and confirms the booking. The
    /// breakdown write is conditional, so racing completions cannot
    /// record two decompositions.
    pub fn complete_payment(&self, payment_id: Uuid) -> Result<Payment, AppError> {
        let payment = self
            .payments
            .payment(payment_id)
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id} not found")))?;

        if payment.status != PaymentStatus::Pending {
            return Err(AppError::Conflict(format!(
                "payment {payment_id} is not pending"
            )));
        }

        let breakdown =
            payout::calculate_payout(payment.amount, payment.method, self.commission_rate)?;
        self.payments.record_breakdown(payment_id, &breakdown)?;
        let updated = self
            .payments
            .update_status(payment_id, PaymentStatus::Completed)?;
        self.bookings
            .update_status(payment.booking_id, BookingStatus::Confirmed)?;

        info!(
            payment_id = %payment_id,
            booking_id = %payment.booking_id,
            cleaner_payout = %breakdown.cleaner_payout,
            "payment completed"
        );
        Ok(updated)
    }

    pub fn fail_payment(&self, payment_id: Uuid) -> Result<Payment, AppError> {
        let payment = self
            .payments
            .payment(payment_id)
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id} not found")))?;

        if payment.status != PaymentStatus::Pending {
            return Err(AppError::Conflict(format!(
                "payment {payment_id} is not pending"
            )));
        }

        self.payments.update_status(payment_id, PaymentStatus::Failed)
    }

    /// Marks the cleaner's share as paid out. Write-once at the store.
    pub fn mark_paid_to_provider(
        &self,
        payment_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        let payment = self
            .payments
            .payment(payment_id)
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id} not found")))?;

        if payment.status != PaymentStatus::Completed {
            return Err(AppError::Conflict(format!(
                "payment {payment_id} is not completed"
            )));
        }

        self.payments.mark_paid_to_provider(payment_id, at)
    }
}
