pub mod daily;
pub mod payments;
pub(crate) mod timeline;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::calendar::BusinessCalendar;
use crate::decimal::{Money, Rate};
use crate::errors::{FincoreError, Result};
use crate::interest::factors::{cdi_period_factor, factor_30_360, interest_factor};
use crate::interest::Regime;
use crate::schedule::{validate_schedule, Amortization, ExtraordinaryEvent};
use timeline::TimelineEntry;

pub use daily::{DailyReturn, DailyReturnStream};
pub use payments::{Payment, PaymentStream, TaxPolicy};

/// options shared by the payment and daily-return builders
pub struct BuildOptions<'a> {
    pub regime: Regime<'a>,
    pub tax: TaxPolicy,
    pub events: Vec<ExtraordinaryEvent>,
    /// calendar for business-day judgments; the built-in brazilian calendar
    /// when absent
    pub calendar: Option<&'a BusinessCalendar>,
}

impl<'a> Default for BuildOptions<'a> {
    fn default() -> Self {
        Self {
            regime: Regime::Prefixed30360,
            tax: TaxPolicy::Exempt,
            events: Vec::new(),
            calendar: None,
        }
    }
}

/// generates the payment schedule of a loan.
///
/// Validation happens here, before the first pull; the returned stream is a
/// lazy, pull-driven sequence of payments. Mid-iteration failures terminate
/// the stream with the error as its final item.
pub fn build_payments<'a>(
    principal: Money,
    apy: Rate,
    amortizations: &[Amortization],
    options: BuildOptions<'a>,
) -> Result<PaymentStream<'a>> {
    let setup = EngineSetup::prepare(principal, apy, amortizations, options)?;

    Ok(PaymentStream::new(setup))
}

/// generates the daily accrual table of a loan.
///
/// Emits one record per calendar day from the accrual anchor to the day
/// before the last payment, dense in calendar days: under the CDI regime,
/// non-business days carry zero accrual.
pub fn build_daily_returns<'a>(
    principal: Money,
    apy: Rate,
    amortizations: &[Amortization],
    options: BuildOptions<'a>,
) -> Result<DailyReturnStream<'a>> {
    let setup = EngineSetup::prepare(principal, apy, amortizations, options)?;

    Ok(DailyReturnStream::new(setup))
}

/// validated inputs shared by both generators
#[derive(Debug)]
pub(crate) struct EngineSetup<'a> {
    pub principal: Decimal,
    pub apy: Rate,
    pub regime: Regime<'a>,
    pub tax: TaxPolicy,
    pub calendar: BusinessCalendar,
    pub timeline: Vec<TimelineEntry>,
    /// scheduled dates of the validated schedule, before truncation
    pub boundaries: Vec<NaiveDate>,
    pub zero_date: NaiveDate,
}

impl<'a> EngineSetup<'a> {
    fn prepare(
        principal: Money,
        apy: Rate,
        amortizations: &[Amortization],
        options: BuildOptions<'a>,
    ) -> Result<Self> {
        if principal.is_negative() {
            return Err(FincoreError::InvalidAmount {
                message: format!("negative principal {principal}"),
            });
        }

        if apy.is_negative() {
            return Err(FincoreError::InvalidAmount {
                message: format!("negative rate {apy}"),
            });
        }

        if let Regime::Cdi252 { percent_of_cdi, .. } = options.regime {
            if percent_of_cdi.is_sign_negative() {
                return Err(FincoreError::InvalidAmount {
                    message: format!("negative percent of CDI {percent_of_cdi}"),
                });
            }
        }

        let schedule = validate_schedule(amortizations)?;
        let calendar = options.calendar.cloned().unwrap_or_else(BusinessCalendar::brazil);

        // CDI accrues per business day, so payment dates must be business days
        if options.regime.is_cdi() {
            for entry in &schedule[1..] {
                if !calendar.is_business_day(entry.date) {
                    return Err(FincoreError::InvalidSchedule {
                        message: format!("{} is not a business day under the CDI calendar", entry.date),
                    });
                }
            }
        }

        let timeline = timeline::build(&schedule, &options.events)?;
        let boundaries = schedule.iter().map(|entry| entry.date).collect();
        let zero_date = schedule[0].date;

        debug!(entries = timeline.len(), %zero_date, "engine prepared");

        Ok(Self {
            principal: principal.as_decimal(),
            apy,
            regime: options.regime,
            tax: options.tax,
            calendar,
            timeline,
            boundaries,
            zero_date,
        })
    }

    /// interest factor over the period (from, to] under the configured regime
    pub(crate) fn period_factor(&self, from: NaiveDate, to: NaiveDate) -> Result<Decimal> {
        match self.regime {
            Regime::Prefixed30360 => Ok(factor_30_360(self.apy, from, to)),
            Regime::Cdi252 { backend, percent_of_cdi } => {
                let cdi = cdi_period_factor(backend, &self.calendar, from, to, percent_of_cdi)?;
                let spread = interest_factor(self.apy, Decimal::from(cdi.business_days) / dec!(252));

                Ok(spread * cdi.factor)
            }
        }
    }
}

/// the registers the generators carry across iterations.
///
/// The economic balance is principal plus accrued interest minus what was
/// amortized and settled; accrual compounds on unsettled interest, which
/// keeps total interest invariant under period splits.
#[derive(Debug)]
pub(crate) struct Registers {
    principal: Decimal,
    accrued: Decimal,
    settled: Decimal,
    amortized: Decimal,
    ratio_current: Decimal,
    ratio_regular: Decimal,
    period_interest: Decimal,
}

impl Registers {
    pub fn new(principal: Decimal) -> Self {
        Self {
            principal,
            accrued: Decimal::ZERO,
            settled: Decimal::ZERO,
            amortized: Decimal::ZERO,
            ratio_current: Decimal::ZERO,
            ratio_regular: Decimal::ZERO,
            period_interest: Decimal::ZERO,
        }
    }

    /// outstanding debt: principal plus unsettled interest
    pub fn balance(&self) -> Decimal {
        self.principal + self.accrued - self.amortized - self.settled
    }

    /// interest accrued but not yet settled
    pub fn outstanding_interest(&self) -> Decimal {
        self.accrued - self.settled
    }

    /// total interest accrued since the anchor
    pub fn accrued_total(&self) -> Decimal {
        self.accrued
    }

    /// apply a period factor to the balance and register the gain
    pub fn accrue(&mut self, factor: Decimal) -> Decimal {
        let gain = self.balance() * (factor - Decimal::ONE);

        self.accrued += gain;
        self.period_interest += gain;

        gain
    }

    /// interest accrued since the last emission, resetting the register
    pub fn take_period_interest(&mut self) -> Decimal {
        std::mem::take(&mut self.period_interest)
    }

    /// apply a scheduled amortization ratio; returns the amortized value.
    ///
    /// The ratio is re-based after prepayments so the remaining scheduled
    /// ratios still close the remaining principal: the adjustment is the
    /// remaining total ratio over the remaining scheduled ratio.
    pub fn apply_scheduled(&mut self, ratio: Decimal) -> Decimal {
        let remaining_regular = Decimal::ONE - self.ratio_regular;

        let mut adjusted = if remaining_regular > Decimal::ZERO {
            ratio * (Decimal::ONE - self.ratio_current) / remaining_regular
        } else {
            Decimal::ZERO
        };

        if self.ratio_current + adjusted > Decimal::ONE {
            adjusted = Decimal::ONE - self.ratio_current;
        }

        self.ratio_regular = (self.ratio_regular + ratio).min(Decimal::ONE);
        self.ratio_current += adjusted;

        let amount = adjusted * self.principal;
        self.amortized += amount;

        amount
    }

    /// settle every unsettled cent of interest; returns the settled value
    pub fn settle_outstanding(&mut self) -> Decimal {
        let due = self.outstanding_interest();
        self.settled += due;

        due
    }

    /// apply a gross prepayment: interest first, principal second.
    ///
    /// Returns (interest settled, principal amortized). The gross value is
    /// capped at the balance; the caller checks for excess beforehand.
    pub fn apply_prepayment(&mut self, amount: Decimal) -> (Decimal, Decimal) {
        let gross = amount.min(self.balance());
        let interest = gross.min(self.outstanding_interest());
        let principal_part = gross - interest;

        self.settled += interest;
        self.amortized += principal_part;

        if !self.principal.is_zero() {
            self.ratio_current += principal_part / self.principal;
        }

        (interest, principal_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{CdiDailyRate, IndexBackend};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> Vec<Amortization> {
        vec![
            Amortization::anchor(date(2022, 3, 9)),
            Amortization::new(date(2022, 5, 9), Decimal::ONE),
        ]
    }

    struct ConstantBackend;

    impl IndexBackend for ConstantBackend {
        fn rate_on(&self, date: NaiveDate) -> Result<CdiDailyRate> {
            Ok(CdiDailyRate {
                date,
                rate: Rate::from_percent(dec!(13.65)),
                business_day: true,
            })
        }
    }

    #[test]
    fn test_negative_inputs_rejected() {
        let err = build_payments(Money::from_major(-1), Rate::ZERO, &schedule(), BuildOptions::default()).unwrap_err();
        assert!(matches!(err, FincoreError::InvalidAmount { .. }));

        let err = build_payments(
            Money::from_major(1000),
            Rate::from_percent(dec!(-5)),
            &schedule(),
            BuildOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FincoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_negative_percent_of_cdi_rejected() {
        let backend = ConstantBackend;
        let calendar = BusinessCalendar::new([]);
        let options = BuildOptions {
            regime: Regime::Cdi252 {
                backend: &backend,
                percent_of_cdi: dec!(-1),
            },
            calendar: Some(&calendar),
            ..BuildOptions::default()
        };

        let schedule = vec![
            Amortization::anchor(date(2022, 10, 3)),
            Amortization::new(date(2022, 11, 1), Decimal::ONE),
        ];

        let err = build_payments(Money::from_major(1000), Rate::ZERO, &schedule, options).unwrap_err();
        assert!(matches!(err, FincoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_cdi_requires_business_day_schedule() {
        let backend = ConstantBackend;
        let calendar = BusinessCalendar::new([]);
        let options = BuildOptions {
            regime: Regime::cdi(&backend),
            calendar: Some(&calendar),
            ..BuildOptions::default()
        };

        // 2022-10-08 is a saturday
        let schedule = vec![
            Amortization::anchor(date(2022, 10, 3)),
            Amortization::new(date(2022, 10, 8), Decimal::ONE),
        ];

        let err = build_payments(Money::from_major(1000), Rate::ZERO, &schedule, options).unwrap_err();
        assert!(matches!(err, FincoreError::InvalidSchedule { .. }));
    }

    #[test]
    fn test_prefixed_accepts_any_dates() {
        // 2022-04-09 is a saturday; fine under 30/360
        let schedule = vec![
            Amortization::anchor(date(2022, 3, 9)),
            Amortization::new(date(2022, 4, 9), Decimal::ONE),
        ];

        assert!(build_payments(Money::from_major(1000), Rate::ZERO, &schedule, BuildOptions::default()).is_ok());
    }

    #[test]
    fn test_registers_accrue_and_settle() {
        let mut regs = Registers::new(dec!(100000));

        let gain = regs.accrue(dec!(1.01));
        assert_eq!(gain, dec!(1000.00));
        assert_eq!(regs.balance(), dec!(101000.00));

        // compounding: the next accrual includes the unsettled interest
        let gain = regs.accrue(dec!(1.01));
        assert_eq!(gain, dec!(1010.0000));

        let settled = regs.settle_outstanding();
        assert_eq!(settled, dec!(2010.0000));
        assert_eq!(regs.balance(), dec!(100000.0000));
    }

    #[test]
    fn test_registers_scheduled_rebase_after_prepayment() {
        let mut regs = Registers::new(dec!(100000));

        // a 10% prepayment with no accrued interest
        let (interest, principal_part) = regs.apply_prepayment(dec!(10000));
        assert_eq!(interest, Decimal::ZERO);
        assert_eq!(principal_part, dec!(10000));

        // two scheduled halves re-base over the remaining principal
        let first = regs.apply_scheduled(dec!(0.5));
        let second = regs.apply_scheduled(dec!(0.5));

        assert_eq!(first, dec!(45000.0));
        assert_eq!(second.round_dp(10), dec!(45000.0));
        assert_eq!(regs.balance().round_dp(10), Decimal::ZERO);
    }

    #[test]
    fn test_registers_prepayment_pays_interest_first() {
        let mut regs = Registers::new(dec!(1000));

        regs.accrue(dec!(1.10)); // 100 of interest
        let (interest, principal_part) = regs.apply_prepayment(dec!(150));

        assert_eq!(interest, dec!(100.0));
        assert_eq!(principal_part, dec!(50.0));
        assert_eq!(regs.balance(), dec!(950.0));
    }
}
