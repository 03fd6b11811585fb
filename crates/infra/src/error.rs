//! Infrastructure-facing error model for ledger operations.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `LedgerError` as follows:
//!
//! | SQLx Error | Kind | LedgerError |
//! |------------|------|-------------|
//! | Database | unique violation | `Domain(Conflict)` |
//! | Database | foreign key violation | `Domain(ReferentialIntegrity)` |
//! | Database | check / not-null violation | `Domain(Validation)` |
//! | Database | other | `StoreUnavailable` |
//! | PoolClosed, Io, PoolTimedOut, other | n/a | `StoreUnavailable` |

use sqlx::error::ErrorKind;
use thiserror::Error;

use warehouse_core::DomainError;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A deterministic business failure; the store is untouched.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Connection or IO failure talking to the store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LedgerError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(e) => Some(e),
            LedgerError::StoreUnavailable(_) => None,
        }
    }
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{} in {}", db_err.message(), operation);
            match db_err.kind() {
                ErrorKind::UniqueViolation => DomainError::conflict(msg).into(),
                ErrorKind::ForeignKeyViolation => DomainError::referential_integrity(msg).into(),
                ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    DomainError::validation(msg).into()
                }
                _ => LedgerError::unavailable(format!("database error: {msg}")),
            }
        }
        sqlx::Error::PoolClosed => {
            LedgerError::unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            LedgerError::unavailable(format!("timed out acquiring a connection in {operation}"))
        }
        other => LedgerError::unavailable(format!("{operation}: {other}")),
    }
}
