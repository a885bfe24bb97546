use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::timeline::EntryKind;
use super::{EngineSetup, Registers};
use crate::decimal::{Money, Rate};
use crate::errors::{FincoreError, Result};

// Revenue tax brackets for fixed-income investments: (days over, days up to, rate).
const REVENUE_TAX_BRACKETS: [(i64, i64, Decimal); 4] = [
    (0, 180, dec!(0.225)),
    (180, 360, dec!(0.2)),
    (360, 720, dec!(0.175)),
    (720, i64::MAX, dec!(0.15)),
];

/// revenue tax policy applied to settled interest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TaxPolicy {
    /// no tax withheld
    Exempt,
    /// flat rate on settled interest
    Flat(Rate),
    /// the brazilian regressive fixed-income table, keyed on days between
    /// the schedule anchor and the payment date
    Regressive,
}

impl TaxPolicy {
    fn rate_for(&self, zero_date: NaiveDate, date: NaiveDate) -> Decimal {
        match self {
            TaxPolicy::Exempt => Decimal::ZERO,
            TaxPolicy::Flat(rate) => rate.fraction(),
            TaxPolicy::Regressive => {
                let days = (date - zero_date).num_days();

                REVENUE_TAX_BRACKETS
                    .iter()
                    .find(|(over, up_to, _)| *over < days && days <= *up_to)
                    .map(|(_, _, rate)| *rate)
                    .unwrap_or(Decimal::ZERO)
            }
        }
    }
}

/// one emitted payment of a schedule.
///
/// `raw_interest` is the interest accrued in the period ending at this
/// payment; `paid_interest` is what was actually settled with it. Every
/// monetary field is quantized to the cent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub date: NaiveDate,
    pub raw_interest: Money,
    pub paid_interest: Money,
    pub amortization: Money,
    pub tax: Money,
    pub net: Money,
    pub balance_after: Money,
}

/// lazy payment sequence: one entry per timeline entry past the anchor
#[derive(Debug)]
pub struct PaymentStream<'a> {
    setup: EngineSetup<'a>,
    regs: Registers,
    index: usize,
    emitted_amortization: Decimal,
    done: bool,
}

impl<'a> PaymentStream<'a> {
    pub(crate) fn new(setup: EngineSetup<'a>) -> Self {
        let regs = Registers::new(setup.principal);
        let done = setup.principal.is_zero();

        Self {
            setup,
            regs,
            index: 1,
            emitted_amortization: Decimal::ZERO,
            done,
        }
    }

    fn step(&mut self) -> Result<Payment> {
        let previous = self.setup.timeline[self.index - 1].date;
        let entry = self.setup.timeline[self.index].clone();

        let factor = self.setup.period_factor(previous, entry.date)?;
        self.regs.accrue(factor);

        let (paid_interest, amortized) = match entry.kind {
            EntryKind::Scheduled { ratio, amortizes_interest } => {
                let amount = self.regs.apply_scheduled(ratio);
                let paid = if amortizes_interest {
                    self.regs.settle_outstanding()
                } else {
                    Decimal::ZERO
                };

                (paid, amount)
            }
            EntryKind::Prepayment { amount } => {
                let available = quantize(self.regs.balance());

                if amount > available {
                    return Err(FincoreError::PrepaymentExceedsBalance {
                        excess: Money::from_decimal(amount - available),
                    });
                }

                self.regs.apply_prepayment(amount)
            }
            EntryKind::Settlement => {
                let balance = self.regs.balance();
                self.regs.apply_prepayment(balance)
            }
        };

        let raw_interest = self.regs.take_period_interest();
        let balance_after = quantize(self.regs.balance());
        let terminal = self.index == self.setup.timeline.len() - 1;

        if terminal && !balance_after.is_zero() {
            return Err(FincoreError::ReconciliationError {
                residual: Money::from_decimal(balance_after),
            });
        }

        // a closing entry absorbs every rounding residual into its
        // amortization, so the emitted amortizations add up to the principal
        let closes = terminal || balance_after.is_zero();
        let amortization = if closes {
            quantize(self.setup.principal) - self.emitted_amortization
        } else {
            quantize(amortized)
        };

        self.emitted_amortization += amortization;

        let paid = quantize(paid_interest);
        let tax = quantize(paid_interest * self.setup.tax.rate_for(self.setup.zero_date, entry.date));

        let payment = Payment {
            date: entry.date,
            raw_interest: Money::from_decimal(quantize(raw_interest)),
            paid_interest: Money::from_decimal(paid),
            amortization: Money::from_decimal(amortization),
            tax: Money::from_decimal(tax),
            net: Money::from_decimal(amortization + paid - tax),
            balance_after: Money::from_decimal(balance_after),
        };

        self.index += 1;
        self.done = closes;

        Ok(payment)
    }
}

impl<'a> Iterator for PaymentStream<'a> {
    type Item = Result<Payment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.index >= self.setup.timeline.len() {
            return None;
        }

        match self.step() {
            Ok(payment) => Some(Ok(payment)),
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
