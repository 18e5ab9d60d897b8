// ⚠️ Error taxonomy for the matching engine and the match ledger

use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Query or record rejected before any work was done
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// The register could not be enumerated; no partial result set is produced
    #[error("register unavailable: {0}")]
    RegisterUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The ledger could not be read or written
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(#[source] rusqlite::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MatchError {
    pub fn validation(field: &str, message: impl Into<String>, context: &str) -> Self {
        MatchError::Validation(vec![ValidationError::new(field, message, context)])
    }

    pub fn register(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        MatchError::RegisterUnavailable(Box::new(err))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, MatchError::Validation(_))
    }

    /// Validation errors carried by this error (empty for other variants)
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            MatchError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<Vec<ValidationError>> for MatchError {
    fn from(errors: Vec<ValidationError>) -> Self {
        MatchError::Validation(errors)
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_joins_all_errors() {
        let err = MatchError::Validation(vec![
            ValidationError::new("facility", "Required field is empty", "MatchRecord"),
            ValidationError::new("record_no", "Required field is empty", "MatchRecord"),
        ]);

        let text = err.to_string();
        assert!(text.contains("[MatchRecord] facility"));
        assert!(text.contains("[MatchRecord] record_no"));
        assert!(err.is_validation());
        assert_eq!(err.validation_errors().len(), 2);
    }

    #[test]
    fn test_ledger_error_is_not_validation() {
        let err = MatchError::LedgerUnavailable(rusqlite::Error::InvalidQuery);
        assert!(!err.is_validation());
        assert!(err.validation_errors().is_empty());
    }
}
