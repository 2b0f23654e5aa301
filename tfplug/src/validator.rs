//! Attribute validators run during `ValidateDataResourceConfig`

use crate::types::{AttributePath, Diagnostic, Dynamic};

/// Validator performs validation on known attribute values
/// Implement this for custom validation logic
pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;

    /// Only called with known, non-null values
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "any string length".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(s) = value.as_string() else {
            return;
        };
        let len = s.chars().count();

        if let Some(min) = self.min {
            if len < min {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid Attribute Value Length",
                        format!("{}, got: {}", self.description(), len),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
        if let Some(max) = self.max {
            if len > max {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid Attribute Value Length",
                        format!("{}, got: {}", self.description(), len),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_length_validator_rejects_empty_string() {
        let validator = StringLengthValidator::at_least(1);
        let mut diagnostics = Vec::new();

        validator.validate(
            &Dynamic::from(""),
            &AttributePath::new("id"),
            &mut diagnostics,
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some(AttributePath::new("id")));
        assert!(diagnostics[0].detail.contains("at least 1"));
    }

    #[test]
    fn string_length_validator_accepts_valid_length() {
        let validator = StringLengthValidator {
            min: Some(1),
            max: Some(11),
        };
        let mut diagnostics = Vec::new();

        validator.validate(
            &Dynamic::from("C024BE91L"),
            &AttributePath::new("id"),
            &mut diagnostics,
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn string_length_validator_ignores_non_strings() {
        let validator = StringLengthValidator::at_least(3);
        let mut diagnostics = Vec::new();

        validator.validate(
            &Dynamic::Bool(true),
            &AttributePath::new("id"),
            &mut diagnostics,
        );

        assert!(diagnostics.is_empty());
    }
}
