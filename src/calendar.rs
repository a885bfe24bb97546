use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashSet;

/// brazilian national holidays observed by the interbank market, 2018-2023
const BRAZIL_HOLIDAYS: &[(i32, u32, u32)] = &[
    (2018, 1, 1),   (2018, 2, 12),  (2018, 2, 13),  (2018, 3, 30),
    (2018, 5, 1),   (2018, 5, 31),  (2018, 9, 7),   (2018, 10, 12),
    (2018, 11, 2),  (2018, 11, 15), (2018, 12, 25), (2019, 1, 1),
    (2019, 3, 4),   (2019, 3, 5),   (2019, 4, 19),  (2019, 5, 1),
    (2019, 6, 20),  (2019, 11, 15), (2019, 12, 25), (2020, 1, 1),
    (2020, 2, 24),  (2020, 2, 25),  (2020, 4, 10),  (2020, 4, 21),
    (2020, 5, 1),   (2020, 6, 11),  (2020, 9, 7),   (2020, 10, 12),
    (2020, 11, 2),  (2020, 12, 25), (2021, 1, 1),   (2021, 2, 15),
    (2021, 2, 16),  (2021, 4, 2),   (2021, 4, 21),  (2021, 6, 3),
    (2021, 9, 7),   (2021, 10, 12), (2021, 11, 2),  (2021, 11, 15),
    (2022, 2, 28),  (2022, 3, 1),   (2022, 4, 15),  (2022, 4, 21),
    (2022, 6, 16),  (2022, 9, 7),   (2022, 10, 12), (2022, 11, 2),
    (2022, 11, 15), (2023, 2, 20),  (2023, 2, 21),  (2023, 4, 7),
    (2023, 4, 21),  (2023, 5, 1),   (2023, 6, 8),
];

/// business-day calendar: weekends plus a fixed holiday list.
///
/// The calendar is the single source of truth for every business-day
/// judgment the engine makes.
#[derive(Debug, Clone, Default)]
pub struct BusinessCalendar {
    holidays: HashSet<NaiveDate>,
}

impl BusinessCalendar {
    /// create a calendar from an explicit holiday list
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// the built-in brazilian calendar, backed by the compiled-in table
    pub fn brazil() -> Self {
        Self::new(
            BRAZIL_HOLIDAYS
                .iter()
                .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        )
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// first business day at or after the given date
    pub fn next_business_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        while !self.is_business_day(day) {
            day += Duration::days(1);
        }
        day
    }

    /// last business day at or before the given date
    pub fn previous_business_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        while !self.is_business_day(day) {
            day -= Duration::days(1);
        }
        day
    }

    /// number of business days in the half-open interval [from, to)
    pub fn business_days_between(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        let mut count = 0;
        let mut day = from;
        while day < to {
            if self.is_business_day(day) {
                count += 1;
            }
            day += Duration::days(1);
        }
        count
    }
}

/// 30/360 U.S. (NASD) day count between two dates.
///
/// Day-of-month is capped at 30; the end day is only capped when the
/// adjusted start day is 30.
pub fn days_30_360(start: NaiveDate, end: NaiveDate) -> i64 {
    let y1 = start.year() as i64;
    let y2 = end.year() as i64;
    let m1 = start.month() as i64;
    let m2 = end.month() as i64;
    let d1 = (start.day() as i64).min(30);
    let d2 = if d1 == 30 { (end.day() as i64).min(30) } else { end.day() as i64 };

    let days = 360 * (y2 - y1) + 30 * (m2 - m1) + (d2 - d1);
    days.max(0)
}
