use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::engine::Payment;

const DAYS_PER_MONTH: Decimal = dec!(30);

/// charges owed on a missed payment at a reference date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrearsResult {
    pub days_late: i64,
    pub late_fee: Money,
    pub late_interest: Money,
    pub total_due: Money,
}

/// computes the extra charges on a missed payment.
///
/// Late interest accrues on the missed amount pro rata over 30-day months;
/// the late fee is a one-shot percent applied once on top of the amount plus
/// late interest. A reference date at or before the due date yields zero
/// charges.
pub fn compute_arrears(
    missed: &Payment,
    reference_date: NaiveDate,
    late_fee: Rate,
    monthly_late_interest: Rate,
) -> ArrearsResult {
    let amount = (missed.amortization + missed.paid_interest).as_decimal();
    let days_late = (reference_date - missed.date).num_days().max(0);

    if days_late == 0 {
        return ArrearsResult {
            days_late: 0,
            late_fee: Money::ZERO,
            late_interest: Money::ZERO,
            total_due: Money::from_decimal(amount),
        };
    }

    let pro_rata = Decimal::from(days_late) / DAYS_PER_MONTH;
    let late_interest = amount * monthly_late_interest.fraction() * pro_rata;
    let late_fee_value = (amount + late_interest) * late_fee.fraction();

    let late_interest = Money::from_decimal(late_interest).quantize();
    let late_fee_value = Money::from_decimal(late_fee_value).quantize();

    ArrearsResult {
        days_late,
        late_fee: late_fee_value,
        late_interest,
        total_due: (Money::from_decimal(amount) + late_interest + late_fee_value).quantize(),
    }
}
