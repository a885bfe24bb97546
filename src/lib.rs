//! Deterministic cash-flow schedules and daily accrual tables for
//! fixed-income credit operations.
//!
//! Supports fixed-rate loans on a 30/360 day count and CDI-indexed loans on
//! ACT/252 business days, with irregular calendars, prepayments, early
//! settlement, and arrears helpers. Both generators are lazy, pull-driven
//! sequences over a merged schedule/event timeline.

pub mod calendar;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod index;
pub mod interest;
pub mod schedule;

// re-export key types
pub use calendar::{days_30_360, BusinessCalendar};
pub use decimal::{Money, Rate};
pub use engine::{
    build_daily_returns, build_payments, BuildOptions, DailyReturn, DailyReturnStream, Payment,
    PaymentStream, TaxPolicy,
};
pub use errors::{FincoreError, Result};
pub use index::{CdiDailyRate, IndexBackend, InMemoryBackend};
pub use interest::{compute_arrears, ArrearsResult, Regime};
pub use schedule::{
    american_schedule, bullet_schedule, price_schedule, validate_schedule, Amortization, EventKind,
    ExtraordinaryEvent,
};

// re-export external dependencies that users will need
pub use chrono;
pub use rust_decimal::Decimal;
