use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::calendar::BusinessCalendar;
use crate::decimal::Rate;
use crate::errors::{FincoreError, Result};

/// one day of the CDI benchmark: the annualized rate in percent, and whether
/// the rate was published on that date
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CdiDailyRate {
    pub date: NaiveDate,
    pub rate: Rate,
    pub business_day: bool,
}

/// capability that supplies the CDI rate for a given date
pub trait IndexBackend {
    fn rate_on(&self, date: NaiveDate) -> Result<CdiDailyRate>;
}

// Annualized CDI rates by effective date, in hundredths of a percent.
// Each entry is a change point; the rate holds until the next one, and the
// latest entry projects forward.
const CDI_REGISTRY: &[(i32, u32, u32, i64)] = &[
    (2017, 12, 29, 689),
    (2018, 2, 8, 664),
    (2018, 3, 22, 639),
    (2018, 10, 1, 640),
    (2019, 8, 1, 590),
    (2019, 9, 19, 540),
    (2019, 10, 31, 490),
    (2019, 12, 12, 440),
    (2020, 2, 6, 415),
    (2020, 3, 19, 365),
    (2020, 5, 7, 290),
    (2020, 6, 18, 215),
    (2020, 8, 6, 190),
    (2021, 3, 18, 265),
    (2021, 5, 6, 340),
    (2021, 6, 17, 415),
    (2021, 8, 5, 515),
    (2021, 9, 23, 615),
    (2021, 10, 28, 765),
    (2021, 12, 9, 915),
    (2022, 2, 3, 1065),
    (2022, 3, 17, 1165),
    (2022, 5, 5, 1265),
    (2022, 6, 17, 1315),
    (2022, 8, 4, 1365),
];

/// backend seeded from the compiled-in CDI registry.
///
/// Covers the period since the end of 2017. Dates past the last published
/// change point reuse the latest rate; dates before the registry begins are
/// unknown. Non-publication days are the weekends and holidays of the
/// built-in brazilian calendar.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    calendar: BusinessCalendar,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            calendar: BusinessCalendar::brazil(),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBackend for InMemoryBackend {
    fn rate_on(&self, date: NaiveDate) -> Result<CdiDailyRate> {
        let (y, m, d, first) = CDI_REGISTRY[0];
        let registry_start = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MAX);

        if date < registry_start {
            return Err(FincoreError::MissingIndexData { date });
        }

        let mut cents = first;
        for &(y, m, d, value) in CDI_REGISTRY {
            match NaiveDate::from_ymd_opt(y, m, d) {
                Some(effective) if effective <= date => cents = value,
                _ => break,
            }
        }

        let rate = Rate::from_percent(Decimal::new(cents, 2));
        debug!(%date, %rate, "cdi rate lookup");

        Ok(CdiDailyRate {
            date,
            rate,
            business_day: self.calendar.is_business_day(date),
        })
    }
}
