use std::fmt;

use thiserror::Error;

use crate::decimal::{Money, Rate};

/// kind of record a lookup was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Investment,
    Payment,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Investment => write!(f, "investment"),
            RecordKind::Payment => write!(f, "payment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        message: String,
    },

    #[error("store operation failed: {message}")]
    StoreFailure {
        message: String,
    },

    #[error("{kind} not found: {id}")]
    RecordNotFound {
        kind: RecordKind,
        id: i64,
    },

    #[error("malformed import: {message}")]
    MalformedImport {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid income ratio: {ratio}")]
    InvalidIncomeRatio {
        ratio: Rate,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("investment already closed: {id}")]
    InvestmentClosed {
        id: i64,
    },

    #[error("arithmetic overflow: {message}")]
    ArithmeticOverflow {
        message: String,
    },

    #[error("serialization error: {message}")]
    Serialization {
        message: String,
    },
}

impl LedgerError {
    /// errors that end the session rather than a single action
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::StoreUnavailable { .. })
    }

    pub(crate) fn investment_not_found(id: i64) -> Self {
        LedgerError::RecordNotFound {
            kind: RecordKind::Investment,
            id,
        }
    }

    pub(crate) fn payment_not_found(id: i64) -> Self {
        LedgerError::RecordNotFound {
            kind: RecordKind::Payment,
            id,
        }
    }

    pub(crate) fn overflow(message: impl Into<String>) -> Self {
        LedgerError::ArithmeticOverflow {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        LedgerError::MalformedImport {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::StoreFailure {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
