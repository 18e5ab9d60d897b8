// 📐 Validation - shared error shape and required-field checks

use serde::{Deserialize, Serialize};

// ============================================================================
// VALIDATION ERROR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>, context: &str) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

// ============================================================================
// COLLECTOR
// ============================================================================

/// Accumulates every problem in one pass so callers see all of them at once
#[derive(Debug)]
pub struct Validator {
    context: &'static str,
    errors: Vec<ValidationError>,
}

impl Validator {
    pub fn new(context: &'static str) -> Self {
        Validator {
            context,
            errors: Vec::new(),
        }
    }

    /// Blank (empty or whitespace-only) counts as missing
    pub fn require(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "Required field is empty");
        }
        self
    }

    pub fn require_unit_range(&mut self, field: &str, value: f64) -> &mut Self {
        if !(0.0..=1.0).contains(&value) {
            self.fail(field, format!("Must be between 0.0 and 1.0, got {}", value));
        }
        self
    }

    pub fn require_positive(&mut self, field: &str, value: i64) -> &mut Self {
        if value < 1 {
            self.fail(field, format!("Must be 1 or greater, got {}", value));
        }
        self
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors
            .push(ValidationError::new(field, message, self.context));
        self
    }

    pub fn finish(self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
