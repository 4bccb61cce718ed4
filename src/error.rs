//! Errors raised by the extraction pipeline and the ledger store.
//!
//! Per-document problems ([`ParseError`], [`Rejection`]) are counted and
//! logged by the caller; they never abort a batch. [`LedgerError`] is
//! structural and aborts the (bank, currency, year) unit it happened in.
use crate::movement::Bank;
use thiserror::Error;

/// Why a document did not produce a statement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("no extractor recognises this document")]
    UndetectedFormat,
    #[error("{bank}: unparsable date \"{text}\"")]
    MalformedDate { bank: Bank, text: String },
}

/// Why the validity filter dropped a statement.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("zero or missing amount")]
    ZeroOrMissingAmount,
    #[error("statement has no movements")]
    MissingCoreFields,
}

/// Ledger store errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("section \"{month}\" not found in ledger")]
    SectionNotFound { month: String },
    #[error("invalid month {0}, must be between 1 and 12")]
    InvalidMonth(u32),
    /// Another writer holds the store; retry once it is closed.
    #[error("ledger store is busy: {0}")]
    Busy(String),
    #[error("corrupt ledger store: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Store(rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl LedgerError {
    /// Busy stores are left for the operator to retry, not treated as corruption.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Busy(_))
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                LedgerError::Busy(err.to_string())
            }
            other => LedgerError::Store(other),
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
