use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use tracing::debug;

use crate::calendar::{days_30_360, BusinessCalendar};
use crate::decimal::Rate;
use crate::errors::Result;
use crate::index::IndexBackend;

const DAYS_360: Decimal = dec!(360);
const DAYS_252: Decimal = dec!(252);

/// interest factor (1 + rate)^period for a percent rate
pub fn interest_factor(rate: Rate, period: Decimal) -> Decimal {
    (Decimal::ONE + rate.fraction()).powd(period)
}

/// period factor under the 30/360 convention over (from, to].
///
/// A calendar month composes to the monthly factor (1+apy/100)^(1/12), and
/// partial periods interpolate on the 30/360 day count.
pub fn factor_30_360(apy: Rate, from: NaiveDate, to: NaiveDate) -> Decimal {
    interest_factor(apy, Decimal::from(days_30_360(from, to)) / DAYS_360)
}

/// daily CDI factor (1 + (r/100)·p)^(1/252) for an annual percent rate r and
/// a percent-of-CDI multiplier p
pub fn cdi_daily_factor(rate: Rate, percent_of_cdi: Decimal) -> Decimal {
    (Decimal::ONE + rate.fraction() * percent_of_cdi).powd(Decimal::ONE / DAYS_252)
}

/// composed CDI factor over a half-open interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdiPeriodFactor {
    pub factor: Decimal,
    pub business_days: u32,
}

/// compose the CDI factor over the business days in [from, to).
///
/// Non-business days contribute no accrual; every business day requires a
/// backend lookup.
pub fn cdi_period_factor(
    backend: &dyn IndexBackend,
    calendar: &BusinessCalendar,
    from: NaiveDate,
    to: NaiveDate,
    percent_of_cdi: Decimal,
) -> Result<CdiPeriodFactor> {
    let mut factor = Decimal::ONE;
    let mut business_days = 0;
    let mut day = from;

    while day < to {
        if calendar.is_business_day(day) {
            let index = backend.rate_on(day)?;

            factor *= cdi_daily_factor(index.rate, percent_of_cdi);
            business_days += 1;
        }

        day += Duration::days(1);
    }

    debug!(%from, %to, business_days, %factor, "composed cdi factor");

    Ok(CdiPeriodFactor { factor, business_days })
}
