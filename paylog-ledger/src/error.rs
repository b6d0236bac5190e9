use thiserror::Error;

use paylog_core::{EmployeeId, LedgerId, MoneyError};

use crate::entry::EntryStatus;
use crate::validate::ValidationError;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error type surfaced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The caller supplied a draft that violates a posting rule.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("ledger entry {0} not found")]
    EntryNotFound(LedgerId),
    #[error("employee {0} not found")]
    EmployeeNotFound(EmployeeId),
    /// The entry exists but its status does not allow the requested change.
    #[error("entry {id} is {status}, transition not allowed")]
    InvalidTransition { id: LedgerId, status: EntryStatus },
    /// Write contention outlasted the bounded retries; the call may be retried.
    #[error("write conflict for employee {employee}, retries exhausted")]
    Conflict { employee: EmployeeId },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<MoneyError> for LedgerError {
    fn from(value: MoneyError) -> Self {
        Self::Serialization(value.to_string())
    }
}
