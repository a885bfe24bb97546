pub mod arrears;
pub mod factors;

use rust_decimal::Decimal;

use crate::index::IndexBackend;

pub use arrears::{compute_arrears, ArrearsResult};
pub use factors::{cdi_daily_factor, cdi_period_factor, factor_30_360, interest_factor, CdiPeriodFactor};

/// day-count and rate-composition regime of a loan
#[derive(Clone, Copy)]
pub enum Regime<'a> {
    /// fixed rate, 30/360 day count
    Prefixed30360,
    /// floating rate over the CDI, ACT/252 business days
    Cdi252 {
        backend: &'a dyn IndexBackend,
        percent_of_cdi: Decimal,
    },
}

impl<'a> std::fmt::Debug for Regime<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Regime::Prefixed30360 => f.debug_struct("Prefixed30360").finish(),
            Regime::Cdi252 { percent_of_cdi, .. } => f
                .debug_struct("Cdi252")
                .field("backend", &"<dyn IndexBackend>")
                .field("percent_of_cdi", percent_of_cdi)
                .finish(),
        }
    }
}

impl<'a> Regime<'a> {
    /// CDI regime at 100% of the index
    pub fn cdi(backend: &'a dyn IndexBackend) -> Self {
        Regime::Cdi252 {
            backend,
            percent_of_cdi: Decimal::ONE,
        }
    }

    pub fn is_cdi(&self) -> bool {
        matches!(self, Regime::Cdi252 { .. })
    }
}
