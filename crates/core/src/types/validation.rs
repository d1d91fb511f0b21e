//! Structured validation failures.
//!
//! Validation collects every failing field instead of stopping at the first
//! one, so clients can highlight all problems at once.

use core::fmt;

use serde::Serialize;

/// What is wrong with a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", content = "reason", rename_all = "snake_case")]
pub enum FieldIssue {
    /// The field is absent or blank.
    Missing,
    /// The field is present but unusable.
    Invalid(String),
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as the client sent it (e.g. `email`, `items[1].price`).
    pub field: String,
    /// The problem.
    #[serde(flatten)]
    pub issue: FieldIssue,
}

/// One or more failing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    /// Start an empty error collector.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Single missing-field error.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.push_missing(field);
        err
    }

    /// Single invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.push_invalid(field, reason);
        err
    }

    /// Record a missing field.
    pub fn push_missing(&mut self, field: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            issue: FieldIssue::Missing,
        });
    }

    /// Record an invalid field.
    pub fn push_invalid(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            issue: FieldIssue::Invalid(reason.into()),
        });
    }

    /// Merge another collector into this one.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Whether no errors were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// All recorded errors in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Names of every failing field.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    /// Names of fields that were missing.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.issue == FieldIssue::Missing)
            .map(|e| e.field.as_str())
            .collect()
    }

    /// `Ok(value)` if nothing was recorded, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing = self.missing_fields();
        let invalid: Vec<String> = self
            .errors
            .iter()
            .filter_map(|e| match &e.issue {
                FieldIssue::Invalid(reason) => Some(format!("{} ({reason})", e.field)),
                FieldIssue::Missing => None,
            })
            .collect();

        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("missing required fields: {}", missing.join(", ")));
        }
        if !invalid.is_empty() {
            parts.push(format!("invalid fields: {}", invalid.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_issues() {
        let mut err = ValidationError::new();
        err.push_missing("email");
        err.push_missing("items");
        err.push_invalid("items[0].qty", "must be at least 1");

        assert_eq!(
            err.to_string(),
            "missing required fields: email, items; invalid fields: items[0].qty (must be at least 1)"
        );
        assert_eq!(err.fields(), vec!["email", "items", "items[0].qty"]);
        assert_eq!(err.missing_fields(), vec!["email", "items"]);
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationError::new().into_result(5), Ok(5));
        assert!(ValidationError::missing("x").into_result(5).is_err());
    }

    #[test]
    fn test_serialize_shape() {
        let err = ValidationError::invalid("email", "email must contain exactly one @ symbol");
        let json = serde_json::to_value(&err).unwrap_or_default();
        assert_eq!(json["errors"][0]["field"], "email");
        assert_eq!(json["errors"][0]["issue"], "invalid");
    }
}
