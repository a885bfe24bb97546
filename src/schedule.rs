use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decimal::{Money, Rate};
use crate::errors::{FincoreError, Result};

// Tolerance for the sum of amortization ratios: ten decimal places.
const RATIO_TOLERANCE: Decimal = dec!(0.0000000001);

/// one planned entry of an amortization schedule.
///
/// Establishes what fraction of the original principal is amortized at a
/// given date, and whether the interest accrued so far is settled there or
/// carried forward. The first entry of every schedule is the accrual anchor:
/// ratio zero, no interest settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amortization {
    pub date: NaiveDate,
    pub ratio: Decimal,
    pub amortizes_interest: bool,
}

impl Amortization {
    /// the accrual anchor that starts a schedule
    pub fn anchor(date: NaiveDate) -> Self {
        Self {
            date,
            ratio: Decimal::ZERO,
            amortizes_interest: false,
        }
    }

    /// a regular entry that amortizes principal and settles interest
    pub fn new(date: NaiveDate, ratio: Decimal) -> Self {
        Self {
            date,
            ratio,
            amortizes_interest: true,
        }
    }
}

/// an unplanned event inserted into a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraordinaryEvent {
    pub date: NaiveDate,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// a partial prepayment of a gross amount, interest settled first
    Prepayment { amount: Money },
    /// settles the whole outstanding balance and truncates the schedule
    EarlySettlement,
}

impl ExtraordinaryEvent {
    pub fn prepayment(date: NaiveDate, amount: Money) -> Self {
        Self {
            date,
            kind: EventKind::Prepayment { amount },
        }
    }

    pub fn early_settlement(date: NaiveDate) -> Self {
        Self {
            date,
            kind: EventKind::EarlySettlement,
        }
    }
}

/// validate a schedule and return its normalized copy.
///
/// A residual in the ratio sum within tolerance is absorbed into the last
/// entry, so the normalized ratios add up to exactly one.
pub fn validate_schedule(amortizations: &[Amortization]) -> Result<Vec<Amortization>> {
    if amortizations.len() < 2 {
        return Err(FincoreError::InvalidSchedule {
            message: "at least two entries are required: the accrual anchor, and the end of the schedule".into(),
        });
    }

    let first = &amortizations[0];

    if !first.ratio.is_zero() || first.amortizes_interest {
        return Err(FincoreError::InvalidSchedule {
            message: "the first entry is the accrual anchor: ratio zero, no interest settlement".into(),
        });
    }

    if let Some(last) = amortizations.last() {
        if !last.amortizes_interest {
            return Err(FincoreError::InvalidSchedule {
                message: "the last entry must settle the outstanding interest".into(),
            });
        }
    }

    let mut sum = Decimal::ZERO;

    for (i, entry) in amortizations.iter().enumerate() {
        if i > 0 && entry.date <= amortizations[i - 1].date {
            return Err(FincoreError::InvalidSchedule {
                message: format!("entry {} does not succeed the previous date {}", i, amortizations[i - 1].date),
            });
        }

        if entry.ratio.is_sign_negative() || entry.ratio > Decimal::ONE {
            return Err(FincoreError::InvalidSchedule {
                message: format!("entry {} has amortization ratio {} outside [0, 1]", i, entry.ratio),
            });
        }

        sum += entry.ratio;
    }

    let residual = Decimal::ONE - sum;

    if residual.abs() > RATIO_TOLERANCE {
        return Err(FincoreError::InvalidSchedule {
            message: format!("the amortization ratios add up to {sum}, not 1"),
        });
    }

    let mut normalized = amortizations.to_vec();

    if let Some(last) = normalized.last_mut() {
        last.ratio += residual;
    }

    debug!(entries = normalized.len(), "schedule validated");

    Ok(normalized)
}

/// builds the two-entry schedule of a bullet loan
pub fn bullet_schedule(zero_date: NaiveDate, maturity: NaiveDate) -> Result<Vec<Amortization>> {
    if maturity <= zero_date {
        return Err(FincoreError::InvalidSchedule {
            message: format!("maturity {maturity} must succeed the zero date {zero_date}"),
        });
    }

    Ok(vec![
        Amortization::anchor(zero_date),
        Amortization::new(maturity, Decimal::ONE),
    ])
}

/// monthly interest settlements with the principal amortized at maturity
pub fn american_schedule(zero_date: NaiveDate, term_months: u32) -> Result<Vec<Amortization>> {
    let mut schedule = vec![Amortization::anchor(zero_date)];

    for i in 1..=checked_term(term_months)? {
        let due = add_months(zero_date, i)?;
        let ratio = if i == term_months { Decimal::ONE } else { Decimal::ZERO };

        schedule.push(Amortization::new(due, ratio));
    }

    Ok(schedule)
}

/// constant-installment (price) amortization ratios over a monthly term.
///
/// Each ratio is the principal share of a fixed installment under the
/// monthly factor of the given rate; the ratios grow over the term and add
/// up to one.
pub fn price_schedule(apy: Rate, zero_date: NaiveDate, term_months: u32) -> Result<Vec<Amortization>> {
    let term = checked_term(term_months)?;

    if apy.is_negative() {
        return Err(FincoreError::InvalidAmount {
            message: format!("negative rate {apy}"),
        });
    }

    let factor = (Decimal::ONE + apy.fraction()).powd(Decimal::ONE / dec!(12));
    let mut schedule = vec![Amortization::anchor(zero_date)];

    if factor == Decimal::ONE {
        for i in 1..=term {
            schedule.push(Amortization::new(add_months(zero_date, i)?, Decimal::ONE / Decimal::from(term)));
        }

        return Ok(schedule);
    }

    // fixed installment per unit of principal
    let installment = (factor - Decimal::ONE) / (Decimal::ONE - factor.powi(-(term as i64)));
    let mut balance = Decimal::ONE;

    for i in 1..=term {
        // the last entry closes whatever is left of the unit balance
        let ratio = if i == term {
            balance
        } else {
            installment - balance * (factor - Decimal::ONE)
        };

        balance -= ratio;

        schedule.push(Amortization::new(add_months(zero_date, i)?, ratio));
    }

    Ok(schedule)
}

fn checked_term(term_months: u32) -> Result<u32> {
    if term_months == 0 {
        return Err(FincoreError::InvalidSchedule {
            message: "the term must be at least one month".into(),
        });
    }

    Ok(term_months)
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| FincoreError::InvalidSchedule {
            message: format!("date {date} plus {months} months is out of range"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_requires_two_entries() {
        let err = validate_schedule(&[Amortization::anchor(date(2022, 3, 9))]).unwrap_err();
        assert!(matches!(err, FincoreError::InvalidSchedule { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_anchor() {
        let schedule = vec![
            Amortization::new(date(2022, 3, 9), Decimal::ZERO),
            Amortization::new(date(2022, 5, 9), Decimal::ONE),
        ];

        assert!(validate_schedule(&schedule).is_err());
    }

    #[test]
    fn test_validate_rejects_terminal_without_interest_settlement() {
        let schedule = vec![
            Amortization::anchor(date(2022, 3, 9)),
            Amortization {
                date: date(2022, 5, 9),
                ratio: Decimal::ONE,
                amortizes_interest: false,
            },
        ];

        assert!(validate_schedule(&schedule).is_err());
    }

    #[test]
    fn test_validate_rejects_unordered_dates() {
        let schedule = vec![
            Amortization::anchor(date(2022, 3, 9)),
            Amortization::new(date(2022, 5, 9), dec!(0.5)),
            Amortization::new(date(2022, 4, 9), dec!(0.5)),
        ];

        assert!(validate_schedule(&schedule).is_err());
    }

    #[test]
    fn test_validate_rejects_short_ratio_sum() {
        let schedule = vec![
            Amortization::anchor(date(2022, 3, 9)),
            Amortization::new(date(2022, 4, 9), dec!(0.4)),
            Amortization::new(date(2022, 5, 9), dec!(0.5)),
        ];

        let err = validate_schedule(&schedule).unwrap_err();
        assert!(matches!(err, FincoreError::InvalidSchedule { .. }));
    }

    #[test]
    fn test_validate_absorbs_residual_into_last_entry() {
        let third = Decimal::ONE / dec!(3);
        let schedule = vec![
            Amortization::anchor(date(2022, 3, 9)),
            Amortization::new(date(2022, 4, 9), third),
            Amortization::new(date(2022, 5, 9), third),
            Amortization::new(date(2022, 6, 9), third),
        ];

        let normalized = validate_schedule(&schedule).unwrap();
        let sum: Decimal = normalized.iter().map(|a| a.ratio).sum();
        assert_eq!(sum, Decimal::ONE);
    }

    #[test]
    fn test_bullet_schedule() {
        let schedule = bullet_schedule(date(2022, 3, 9), date(2022, 5, 9)).unwrap();

        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].ratio, Decimal::ZERO);
        assert!(!schedule[0].amortizes_interest);
        assert_eq!(schedule[1].ratio, Decimal::ONE);
        assert!(validate_schedule(&schedule).is_ok());
    }

    #[test]
    fn test_american_schedule() {
        let schedule = american_schedule(date(2022, 1, 15), 12).unwrap();

        assert_eq!(schedule.len(), 13);
        assert_eq!(schedule[1].date, date(2022, 2, 15));
        assert_eq!(schedule[12].date, date(2023, 1, 15));

        for entry in &schedule[1..12] {
            assert_eq!(entry.ratio, Decimal::ZERO);
            assert!(entry.amortizes_interest);
        }

        assert_eq!(schedule[12].ratio, Decimal::ONE);
    }

    #[test]
    fn test_price_schedule_ratios() {
        let schedule = price_schedule(Rate::from_percent(dec!(12)), date(2022, 1, 1), 24).unwrap();

        assert_eq!(schedule.len(), 25);

        // ratios grow over the term and close the principal
        for pair in schedule[1..].windows(2) {
            assert!(pair[1].ratio > pair[0].ratio);
        }

        assert!(validate_schedule(&schedule).is_ok());
    }

    #[test]
    fn test_price_schedule_zero_rate_is_flat() {
        let schedule = price_schedule(Rate::ZERO, date(2022, 1, 1), 4).unwrap();
        let normalized = validate_schedule(&schedule).unwrap();
        let sum: Decimal = normalized.iter().map(|a| a.ratio).sum();

        assert_eq!(sum, Decimal::ONE);
        assert_eq!(normalized[1].ratio, dec!(0.25));
    }

    #[test]
    fn test_zero_term_rejected() {
        assert!(american_schedule(date(2022, 1, 1), 0).is_err());
        assert!(bullet_schedule(date(2022, 1, 1), date(2022, 1, 1)).is_err());
    }
}
