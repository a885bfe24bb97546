use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::timeline::EntryKind;
use super::{EngineSetup, Registers};
use crate::decimal::Money;
use crate::errors::{FincoreError, Result};
use crate::interest::factors::{cdi_daily_factor, interest_factor};
use crate::interest::Regime;

/// one day of the accrual table.
///
/// `interest_today` is the difference between consecutive quantized
/// cumulatives, so the daily values over any period add up to that period's
/// interest within one cent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub interest_today: Money,
    pub interest_cumulative: Money,
    pub balance: Money,
    pub is_business_day: bool,
    pub is_amortization_date: bool,
}

/// lazy accrual table: one record per calendar day from the anchor to the
/// day before the last payment
pub struct DailyReturnStream<'a> {
    setup: EngineSetup<'a>,
    regs: Registers,
    current: NaiveDate,
    end: NaiveDate,
    index: usize,
    period: usize,
    period_factor: Option<Decimal>,
    emitted_cumulative: Decimal,
    done: bool,
}

impl<'a> DailyReturnStream<'a> {
    pub(crate) fn new(setup: EngineSetup<'a>) -> Self {
        let regs = Registers::new(setup.principal);
        let current = setup.zero_date;
        let end = setup.timeline.last().map(|entry| entry.date).unwrap_or(current);
        let done = setup.principal.is_zero();

        Self {
            setup,
            regs,
            current,
            end,
            index: 1,
            period: 0,
            period_factor: None,
            emitted_cumulative: Decimal::ZERO,
            done,
        }
    }

    fn step(&mut self) -> Result<Option<DailyReturn>> {
        let date = self.current;
        let mut amortized_today = false;

        // entries due today apply at the start of the day
        while self.index < self.setup.timeline.len() && self.setup.timeline[self.index].date == date {
            let kind = self.setup.timeline[self.index].kind.clone();

            match kind {
                EntryKind::Scheduled { ratio, amortizes_interest } => {
                    self.regs.apply_scheduled(ratio);

                    if amortizes_interest {
                        self.regs.settle_outstanding();
                    }
                }
                EntryKind::Prepayment { amount } => {
                    let available = quantize(self.regs.balance());

                    if amount > available {
                        return Err(FincoreError::PrepaymentExceedsBalance {
                            excess: Money::from_decimal(amount - available),
                        });
                    }

                    self.regs.apply_prepayment(amount);
                }
                EntryKind::Settlement => {
                    let balance = self.regs.balance();
                    self.regs.apply_prepayment(balance);
                }
            }

            amortized_today = true;
            self.index += 1;
        }

        // a closed balance ends the table without a record for the day
        if quantize(self.regs.balance()).is_zero() {
            self.done = true;

            return Ok(None);
        }

        let factor = self.daily_factor(date)?;
        self.regs.accrue(factor);

        let cumulative = quantize(self.regs.accrued_total());
        let today = cumulative - self.emitted_cumulative;
        self.emitted_cumulative = cumulative;

        let record = DailyReturn {
            date,
            interest_today: Money::from_decimal(today),
            interest_cumulative: Money::from_decimal(cumulative),
            balance: Money::from_decimal(quantize(self.regs.balance())),
            is_business_day: self.setup.calendar.is_business_day(date),
            is_amortization_date: amortized_today,
        };

        self.current += Duration::days(1);

        Ok(Some(record))
    }

    fn daily_factor(&mut self, date: NaiveDate) -> Result<Decimal> {
        match self.setup.regime {
            Regime::Prefixed30360 => {
                // advance to the scheduled period containing this day
                while self.period + 2 < self.setup.boundaries.len() && date >= self.setup.boundaries[self.period + 1] {
                    self.period += 1;
                    self.period_factor = None;
                }

                if let Some(factor) = self.period_factor {
                    return Ok(factor);
                }

                let from = self.setup.boundaries[self.period];
                let to = self.setup.boundaries[self.period + 1];

                // the period's 30/360 exponent, spread evenly over its actual
                // days, so the dailies compose to the payment-period factor
                let exponent = Decimal::from(crate::calendar::days_30_360(from, to))
                    / (dec!(360) * Decimal::from((to - from).num_days()));
                let factor = interest_factor(self.setup.apy, exponent);

                self.period_factor = Some(factor);

                Ok(factor)
            }
            Regime::Cdi252 { backend, percent_of_cdi } => {
                if !self.setup.calendar.is_business_day(date) {
                    return Ok(Decimal::ONE);
                }

                let index = backend.rate_on(date)?;
                let spread = interest_factor(self.setup.apy, Decimal::ONE / dec!(252));

                Ok(spread * cdi_daily_factor(index.rate, percent_of_cdi))
            }
        }
    }
}

impl<'a> Iterator for DailyReturnStream<'a> {
    type Item = Result<DailyReturn>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.current >= self.end {
            return None;
        }

        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

fn quantize(value: Decimal) -> Decimal {
    Money::from_decimal(value).quantize().as_decimal()
}
