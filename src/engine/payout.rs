use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::warn;

use crate::error::AppError;
use crate::models::payment::{PaymentMethod, PayoutBreakdown};

pub const DEFAULT_COMMISSION_RATE: Decimal = dec!(0.15);

const CARD_RATE: Decimal = dec!(0.035);
const CARD_FLAT: Decimal = dec!(2.00);
const EFT_RATE: Decimal = dec!(0.02);
const EFT_FLOOR: Decimal = dec!(2.00);
const MOBICRED_RATE: Decimal = dec!(0.025);
const MOBICRED_FLAT: Decimal = dec!(1.50);
const WALLET_RATE: Decimal = dec!(0.025);

/// Downstream commission math must reproduce a human auditor's
/// rounded-intermediate arithmetic, so every value is snapped to cents
/// the moment it is produced.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Payment-processor fee for one charge, rounded to cents. Methods
/// without a schedule of their own fall back to the card schedule, the
/// most expensive one.
pub fn processor_fee(amount: Decimal, method: PaymentMethod) -> Decimal {
    let fee = match method {
        PaymentMethod::CreditCard | PaymentMethod::DebitCard => amount * CARD_RATE + CARD_FLAT,
        PaymentMethod::Eft => (amount * EFT_RATE).max(EFT_FLOOR),
        PaymentMethod::Mobicred => amount * MOBICRED_RATE + MOBICRED_FLAT,
        PaymentMethod::Snapscan | PaymentMethod::Zapper => amount * WALLET_RATE,
        PaymentMethod::Other => {
            warn!(
                method = method.label(),
                "unmapped payment method, falling back to card fee schedule"
            );
            amount * CARD_RATE + CARD_FLAT
        }
    };

    round_money(fee)
}

pub fn calculate_payout(
    booking_amount: Decimal,
    method: PaymentMethod,
    commission_rate: Decimal,
) -> Result<PayoutBreakdown, AppError> {
    validate_amount(booking_amount)?;
    let fee = processor_fee(booking_amount, method);
    breakdown_from_fee(booking_amount, fee, commission_rate)
}

/// Reproduces the decomposition from a fee that was already persisted,
/// for audits and backfills. Must agree with `calculate_payout` when
/// handed a fee that `calculate_payout` produced.
pub fn calculate_payout_from_stored_fee(
    booking_amount: Decimal,
    stored_fee: Decimal,
    commission_rate: Decimal,
) -> Result<PayoutBreakdown, AppError> {
    validate_amount(booking_amount)?;
    if stored_fee.is_sign_negative() {
        return Err(AppError::BadRequest(
            "processor fee cannot be negative".to_string(),
        ));
    }

    breakdown_from_fee(booking_amount, round_money(stored_fee), commission_rate)
}

/// Fixed order: fee first, commission on the net amount, each step
/// rounded before the next. Commission taken on the gross amount, or a
/// single rounding at the end, drifts from the audited totals by cents.
fn breakdown_from_fee(
    booking_amount: Decimal,
    processor_fee: Decimal,
    commission_rate: Decimal,
) -> Result<PayoutBreakdown, AppError> {
    if commission_rate.is_sign_negative() || commission_rate > Decimal::ONE {
        return Err(AppError::BadRequest(
            "commission rate must be within [0, 1]".to_string(),
        ));
    }

    let net_after_fees = round_money(booking_amount - processor_fee);
    let commission_amount = round_money(net_after_fees * commission_rate);
    let cleaner_payout = round_money(net_after_fees - commission_amount);

    Ok(PayoutBreakdown {
        booking_amount: round_money(booking_amount),
        processor_fee,
        net_after_fees,
        commission_rate,
        commission_amount,
        cleaner_payout,
    })
}

fn validate_amount(amount: Decimal) -> Result<(), AppError> {
    if amount.is_sign_negative() {
        return Err(AppError::InvalidPaymentAmount(
            "amount cannot be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::{
        calculate_payout, calculate_payout_from_stored_fee, processor_fee, DEFAULT_COMMISSION_RATE,
    };
    use crate::models::payment::PaymentMethod;

    #[test]
    fn credit_card_payout_matches_reference_figures() {
        let breakdown =
            calculate_payout(dec!(500.00), PaymentMethod::CreditCard, DEFAULT_COMMISSION_RATE)
                .unwrap();

        assert_eq!(breakdown.processor_fee, dec!(19.50));
        assert_eq!(breakdown.net_after_fees, dec!(480.50));
        assert_eq!(breakdown.commission_amount, dec!(72.08));
        assert_eq!(breakdown.cleaner_payout, dec!(408.42));
    }

    #[test]
    fn eft_fee_floor_applies_to_small_amounts() {
        let breakdown =
            calculate_payout(dec!(100.00), PaymentMethod::Eft, DEFAULT_COMMISSION_RATE).unwrap();

        assert_eq!(breakdown.processor_fee, dec!(2.00));
        assert_eq!(breakdown.net_after_fees, dec!(98.00));
        assert_eq!(breakdown.commission_amount, dec!(14.70));
        assert_eq!(breakdown.cleaner_payout, dec!(83.30));
    }

    #[test]
    fn eft_percentage_wins_above_the_floor() {
        assert_eq!(processor_fee(dec!(250.00), PaymentMethod::Eft), dec!(5.00));
    }

    #[test]
    fn mobicred_and_wallet_schedules() {
        assert_eq!(
            processor_fee(dec!(200.00), PaymentMethod::Mobicred),
            dec!(6.50)
        );
        assert_eq!(
            processor_fee(dec!(200.00), PaymentMethod::Snapscan),
            dec!(5.00)
        );
        assert_eq!(
            processor_fee(dec!(200.00), PaymentMethod::Zapper),
            dec!(5.00)
        );
    }

    #[test]
    fn unmapped_method_falls_back_to_card_schedule() {
        assert_eq!(
            processor_fee(dec!(500.00), PaymentMethod::Other),
            processor_fee(dec!(500.00), PaymentMethod::CreditCard)
        );
    }

    #[test]
    fn stored_fee_reproduces_the_original_breakdown() {
        let original =
            calculate_payout(dec!(347.99), PaymentMethod::Mobicred, DEFAULT_COMMISSION_RATE)
                .unwrap();
        let replayed = calculate_payout_from_stored_fee(
            dec!(347.99),
            original.processor_fee,
            DEFAULT_COMMISSION_RATE,
        )
        .unwrap();

        assert_eq!(original, replayed);
    }

    #[test]
    fn commission_is_taken_on_the_net_amount() {
        // 500.00 gross * 0.15 would be 75.00; on the 480.50 net it is 72.08.
        let breakdown =
            calculate_payout(dec!(500.00), PaymentMethod::CreditCard, DEFAULT_COMMISSION_RATE)
                .unwrap();
        assert_ne!(breakdown.commission_amount, dec!(75.00));
        assert_eq!(breakdown.commission_amount, dec!(72.08));
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(
            calculate_payout(dec!(-1.00), PaymentMethod::CreditCard, DEFAULT_COMMISSION_RATE)
                .is_err()
        );
        assert!(calculate_payout_from_stored_fee(
            dec!(100.00),
            dec!(-2.00),
            DEFAULT_COMMISSION_RATE
        )
        .is_err());
    }

    #[test]
    fn out_of_range_commission_rate_is_rejected() {
        assert!(calculate_payout(dec!(100.00), PaymentMethod::Eft, dec!(1.01)).is_err());
        assert!(calculate_payout(dec!(100.00), PaymentMethod::Eft, dec!(-0.10)).is_err());
    }

    #[test]
    fn zero_commission_leaves_the_net_to_the_cleaner() {
        let breakdown =
            calculate_payout(dec!(120.00), PaymentMethod::Snapscan, dec!(0)).unwrap();

        assert_eq!(breakdown.processor_fee, dec!(3.00));
        assert_eq!(breakdown.commission_amount, dec!(0.00));
        assert_eq!(breakdown.cleaner_payout, dec!(117.00));
    }
}
