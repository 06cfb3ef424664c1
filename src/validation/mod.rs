//! Dataset integrity checks.
//!
//! This module checks the relational invariants every snapshot must satisfy:
//! - Structural integrity (unique IDs, every foreign key resolves)
//! - Data quality (non-empty names, positive dimensions, one file per image)
//! - Box sanity (finite, non-negative width and height)
//!
//! Transforms are built so that the structural checks always pass on their
//! output; the test suites run [`validate_dataset`] after every filter,
//! split and merge.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::error::CurateError;
use crate::ir::{AnnotationId, CategoryId, Dataset, ImageId};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates a dataset and returns a report of all issues found.
pub fn validate_dataset(dataset: &Dataset, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let image_ids: HashSet<ImageId> = dataset.image_ids();
    let category_ids: HashSet<CategoryId> = dataset.categories().iter().map(|c| c.id).collect();

    validate_images(dataset, &mut report);
    validate_categories(dataset, &mut report);
    validate_annotations(dataset, &image_ids, &category_ids, &mut report);

    report
}

/// Returns the first annotation whose `image_id` has no matching image.
///
/// This is the one invariant a transform must never break; callers that
/// accept outside input use it to refuse inconsistent snapshots early.
pub fn check_referential_integrity(dataset: &Dataset) -> Result<(), CurateError> {
    let image_ids = dataset.image_ids();
    match dataset
        .annotations()
        .iter()
        .find(|ann| !image_ids.contains(&ann.image_id))
    {
        Some(ann) => Err(CurateError::ReferentialGap {
            annotation: ann.id,
            image: ann.image_id,
        }),
        None => Ok(()),
    }
}

fn validate_images(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();
    let mut seen_files: HashMap<&str, ImageId> = HashMap::new();

    for (idx, image) in dataset.images().iter().enumerate() {
        let id = image.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!(
                    "Invalid dimensions {}x{} (must be positive)",
                    image.width, image.height
                ),
                IssueContext::Image { id },
            ));
        }

        if image.file_name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "Empty filename",
                IssueContext::Image { id },
            ));
        } else if let Some(first_id) = seen_files.get(image.file_name.as_str()) {
            // Two records pointing at one file would overwrite each other on export.
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateFileName,
                format!(
                    "File name '{}' is also used by image {}",
                    image.file_name, first_id
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_files.insert(&image.file_name, image.id);
        }
    }
}

fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<CategoryId, usize> = HashMap::new();
    let mut seen_names: HashMap<&str, CategoryId> = HashMap::new();

    for (idx, category) in dataset.categories().iter().enumerate() {
        let id = category.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&category.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!(
                    "Duplicate category ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_ids.insert(category.id, idx);
        }

        if category.name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyCategoryName,
                "Empty category name",
                IssueContext::Category { id },
            ));
        } else if let Some(first_id) = seen_names.get(category.name.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateCategoryName,
                format!(
                    "Duplicate category name '{}' (also used by category {})",
                    category.name, first_id
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_names.insert(&category.name, category.id);
        }
    }
}

fn validate_annotations(
    dataset: &Dataset,
    image_ids: &HashSet<ImageId>,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashMap<AnnotationId, usize> = HashMap::new();

    for (idx, annotation) in dataset.annotations().iter().enumerate() {
        let id = annotation.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&annotation.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!(
                    "Duplicate annotation ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Annotation { id },
            ));
        } else {
            seen_ids.insert(annotation.id, idx);
        }

        if !image_ids.contains(&annotation.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("References non-existent image {}", annotation.image_id),
                IssueContext::Annotation { id },
            ));
        }

        // Left behind by a prefer-first merge; the record is still usable.
        if !category_ids.contains(&annotation.category_id) {
            report.add(ValidationIssue::warning(
                IssueCode::MissingCategoryRef,
                format!(
                    "References non-existent category {}",
                    annotation.category_id
                ),
                IssueContext::Annotation { id },
            ));
        }

        if let Some([x, y, w, h]) = annotation.bbox {
            if ![x, y, w, h].iter().all(|v| v.is_finite()) {
                report.add(ValidationIssue::warning(
                    IssueCode::BBoxNotFinite,
                    format!("Bounding box [{}, {}, {}, {}] is not finite", x, y, w, h),
                    IssueContext::Annotation { id },
                ));
            } else if w < 0.0 || h < 0.0 {
                report.add(ValidationIssue::warning(
                    IssueCode::NegativeBBoxSize,
                    format!("Bounding box has negative size {}x{}", w, h),
                    IssueContext::Annotation { id },
                ));
            }
        }
    }
}
