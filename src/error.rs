use std::path::PathBuf;
use thiserror::Error;

use crate::export::CopyFailure;
use crate::ir::{AnnotationId, CategoryId, ImageId};
use crate::validation::ValidationReport;

/// The main error type for cococurate operations.
#[derive(Debug, Error)]
pub enum CurateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Required input not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("COCO document {path} does not match the expected schema: {source}")]
    SchemaMismatch {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse recipe {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Annotation {annotation} references image {image}, which is not in the dataset")]
    ReferentialGap {
        annotation: AnnotationId,
        image: ImageId,
    },

    #[error("Image id {id} appears more than once")]
    DuplicateImageId { id: ImageId },

    #[error("Category {id} is not defined in the dataset")]
    UnknownCategory { id: CategoryId },

    #[error("Invalid filter parameters: {message}")]
    InvalidFilterParams { message: String },

    #[error("Invalid split parameters: {message}")]
    InvalidSplitParams { message: String },

    #[error("Category definitions differ between merge inputs: {message}")]
    CategoryMismatch { message: String },

    #[error("{} file name(s) are used by more than one image (first: {})", file_names.len(), file_names.first().map(String::as_str).unwrap_or(""))]
    FileNameCollision { file_names: Vec<String> },

    #[error("Export finished with {} missing or unreadable image file(s)", failures.len())]
    ExportIncomplete { failures: Vec<CopyFailure> },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}
