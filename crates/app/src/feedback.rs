//! What the presentation layer gets back for every user action.

use serde::Serialize;

use warehouse_core::DomainError;
use warehouse_infra::LedgerError;

use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Feedback {
    /// Action succeeded.
    Ack(String),
    /// Listing or dashboard snapshot.
    Table(Table),
    /// Action refused or failed; message is meant for the end user.
    Error(String),
}

impl Feedback {
    pub fn ack(msg: impl Into<String>) -> Self {
        Self::Ack(msg.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Feedback::Error(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Feedback::Ack(msg) | Feedback::Error(msg) => Some(msg),
            Feedback::Table(_) => None,
        }
    }
}

impl From<LedgerError> for Feedback {
    fn from(err: LedgerError) -> Self {
        Feedback::Error(user_message(&err))
    }
}

/// Turn a ledger error into text an end user can act on.
pub fn user_message(err: &LedgerError) -> String {
    match err {
        LedgerError::Domain(DomainError::Validation(msg)) => format!("Please correct the form: {msg}."),
        LedgerError::Domain(DomainError::ReferentialIntegrity(msg)) => {
            format!("Cannot delete: {msg}.")
        }
        LedgerError::Domain(DomainError::PreconditionFailed(msg)) => {
            format!("Cannot complete the operation: {msg}.")
        }
        LedgerError::Domain(DomainError::NotFound) => {
            "The selected record no longer exists; refresh and try again.".to_string()
        }
        LedgerError::Domain(DomainError::Conflict(msg)) => format!("Already exists: {msg}."),
        LedgerError::StoreUnavailable(msg) => {
            format!("The database is unavailable, nothing was saved ({msg}).")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referential_integrity_message_keeps_guidance() {
        let err: LedgerError = DomainError::referential_integrity(
            "category \"Tools\" is still assigned to 2 product(s); delete or move those products first",
        )
        .into();
        let msg = user_message(&err);
        assert!(msg.starts_with("Cannot delete"));
        assert!(msg.contains("delete or move those products first"));
    }

    #[test]
    fn store_failures_are_reported_not_hidden() {
        let feedback = Feedback::from(LedgerError::unavailable("connection refused"));
        assert!(feedback.is_error());
        assert!(feedback.message().unwrap().contains("connection refused"));
    }

    #[test]
    fn ack_has_message() {
        assert_eq!(Feedback::ack("Added: Tools").message(), Some("Added: Tools"));
    }
}
