//! Validation report types for structured error reporting.

use serde::Serialize;
use std::fmt;

/// The result of validating a dataset.
///
/// Contains all issues found during validation, categorized by severity.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    /// All issues found during validation.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Returns the number of errors in the report.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Returns the number of warnings in the report.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Errors, plus warnings when `strict` is set.
    pub fn blocking_count(&self, strict: bool) -> usize {
        if strict {
            self.issues.len()
        } else {
            self.error_count()
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single validation issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// The record the issue is attached to.
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of a validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Suspicious but does not break any invariant.
    Warning,
    /// Breaks a relational invariant; the snapshot is inconsistent.
    Error,
}

/// A stable code identifying the type of validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    // ID uniqueness issues
    DuplicateImageId,
    DuplicateAnnotationId,
    DuplicateCategoryId,

    // Reference issues
    /// An annotation's `image_id` has no matching image.
    MissingImageRef,
    /// An annotation's `category_id` has no matching category.
    MissingCategoryRef,

    // Image issues
    /// Zero width or height.
    InvalidImageDimensions,
    EmptyFileName,
    /// Two images point at the same file; one would overwrite the other on export.
    DuplicateFileName,

    // Category issues
    EmptyCategoryName,
    DuplicateCategoryName,

    // Bounding box issues
    /// NaN or infinite box values.
    BBoxNotFinite,
    /// Negative width or height.
    NegativeBBoxSize,
}

/// Context about where a validation issue occurred.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    Image { id: u64 },
    Annotation { id: u64 },
    Category { id: u64 },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Image { id } => write!(f, "image {}", id),
            IssueContext::Annotation { id } => write!(f, "annotation {}", id),
            IssueContext::Category { id } => write!(f, "category {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_count_respects_strict() {
        let mut report = ValidationReport::new();
        report.add(ValidationIssue::warning(
            IssueCode::EmptyFileName,
            "Empty filename",
            IssueContext::Image { id: 1 },
        ));

        assert!(report.is_ok());
        assert_eq!(report.blocking_count(false), 0);
        assert_eq!(report.blocking_count(true), 1);
    }

    #[test]
    fn display_lists_every_issue() {
        let mut report = ValidationReport::new();
        report.add(ValidationIssue::error(
            IssueCode::MissingImageRef,
            "References non-existent image 9",
            IssueContext::Annotation { id: 4 },
        ));

        let text = report.to_string();
        assert!(text.contains("1 error(s) and 0 warning(s)"));
        assert!(text.contains("[ERROR] MissingImageRef in annotation 4"));
    }
}
