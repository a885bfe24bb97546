use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum FincoreError {
    #[error("invalid schedule: {message}")]
    InvalidSchedule {
        message: String,
    },

    #[error("invalid amount: {message}")]
    InvalidAmount {
        message: String,
    },

    #[error("no index data available for {date}")]
    MissingIndexData {
        date: NaiveDate,
    },

    #[error("prepayment exceeds outstanding balance by {excess}")]
    PrepaymentExceedsBalance {
        excess: Money,
    },

    #[error("terminal balance failed to close to zero: residual {residual}")]
    ReconciliationError {
        residual: Money,
    },
}

pub type Result<T> = std::result::Result<T, FincoreError>;
