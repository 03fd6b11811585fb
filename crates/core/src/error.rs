//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// preconditions, referential integrity, conflicts). Store availability belongs
/// to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. empty name, malformed number).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A delete was refused because other records still reference the target.
    #[error("referential integrity: {0}")]
    ReferentialIntegrity(String),

    /// An operation's precondition does not hold against current state
    /// (e.g. issuing more than is on hand, unknown category on receive).
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// A requested record was not found.
    #[error("not found")]
    NotFound,

    /// A uniqueness rule was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn referential_integrity(msg: impl Into<String>) -> Self {
        Self::ReferentialIntegrity(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Trim a required text field, rejecting blank input.
pub fn required_text(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank input becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims() {
        assert_eq!(required_text("name", "  Tools ").unwrap(), "Tools");
    }

    #[test]
    fn required_text_rejects_blank() {
        let err = required_text("name", " \t ").unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(optional_text(None), None);
        assert_eq!(optional_text(Some(" hand tools ")), Some("hand tools".to_string()));
    }
}
