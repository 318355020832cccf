use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Eft,
    Mobicred,
    Snapscan,
    Zapper,
    Other,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Eft => "eft",
            PaymentMethod::Mobicred => "mobicred",
            PaymentMethod::Snapscan => "snapscan",
            PaymentMethod::Zapper => "zapper",
            PaymentMethod::Other => "other",
        }
    }
}

/// The single payment row for a booking. Breakdown fields are written
/// exactly once when the payment completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub processor_fee: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
    pub commission_amount: Option<Decimal>,
    pub cleaner_payout: Option<Decimal>,
    pub paid_to_provider: bool,
    pub payout_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Four-value decomposition of one gross payment amount. Derived, never
/// persisted as its own row. Every intermediate is rounded to cents as
/// it is produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutBreakdown {
    pub booking_amount: Decimal,
    pub processor_fee: Decimal,
    pub net_after_fees: Decimal,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub cleaner_payout: Decimal,
}
