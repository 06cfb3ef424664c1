//! COCO JSON reader and writer.
//!
//! The expected input is a CVAT-style COCO export: a dataset root holding
//! `annotations/instances_default.json` and an `images/` directory with one
//! file per image record.
//!
//! All five top-level keys (`licenses`, `info`, `categories`, `images`,
//! `annotations`) are required. A document missing one of them, or whose
//! records lack a required field, is rejected with
//! [`CurateError::SchemaMismatch`]; malformed JSON is
//! [`CurateError::CocoJsonParse`].
//!
//! # Output Order
//!
//! The writer keeps records in snapshot order. Split and merge both establish
//! a meaningful order (shuffled order, merge order), so nothing is re-sorted.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{Annotation, Category, Dataset, DatasetMeta, Image};
use crate::error::CurateError;

/// Directory holding the COCO documents inside a dataset root.
pub const ANNOTATIONS_DIR: &str = "annotations";
/// Directory holding the image files inside a dataset root.
pub const IMAGES_DIR: &str = "images";
/// Name of the instances document inside [`ANNOTATIONS_DIR`].
pub const INSTANCES_FILE: &str = "instances_default.json";

// ============================================================================
// COCO Schema Types (internal to this module)
// ============================================================================

#[derive(Debug, Deserialize)]
struct CocoDocument {
    licenses: Vec<Value>,
    info: Value,
    categories: Vec<Category>,
    images: Vec<Image>,
    annotations: Vec<Annotation>,
}

#[derive(Serialize)]
struct CocoDocumentRef<'a> {
    licenses: &'a [Value],
    info: &'a Value,
    categories: &'a [Category],
    images: &'a [Image],
    annotations: &'a [Annotation],
}

impl<'a> From<&'a Dataset> for CocoDocumentRef<'a> {
    fn from(dataset: &'a Dataset) -> Self {
        Self {
            licenses: dataset.licenses(),
            info: dataset.info(),
            categories: dataset.categories(),
            images: dataset.images(),
            annotations: dataset.annotations(),
        }
    }
}

impl From<CocoDocument> for Dataset {
    fn from(doc: CocoDocument) -> Self {
        let meta = DatasetMeta {
            info: doc.info,
            licenses: doc.licenses,
            categories: doc.categories,
        };
        Dataset::from_shared(Arc::new(meta), doc.images, doc.annotations)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Path of the instances document for a dataset root.
pub fn instances_path(root: &Path) -> PathBuf {
    root.join(ANNOTATIONS_DIR).join(INSTANCES_FILE)
}

/// Path of the image directory for a dataset root.
pub fn images_dir(root: &Path) -> PathBuf {
    root.join(IMAGES_DIR)
}

/// Loads a dataset from its root directory.
///
/// # Errors
/// [`CurateError::SourceMissing`] if the root or its instances document does
/// not exist; otherwise the errors of [`read_coco_json`].
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use cococurate::ir::io_coco_json::load_dataset_dir;
///
/// let dataset = load_dataset_dir(Path::new("./cvat_export"))?;
/// # Ok::<(), cococurate::CurateError>(())
/// ```
pub fn load_dataset_dir(root: &Path) -> Result<Dataset, CurateError> {
    if !root.is_dir() {
        return Err(CurateError::SourceMissing {
            path: root.to_path_buf(),
        });
    }
    read_coco_json(&instances_path(root))
}

/// Reads a dataset from a COCO JSON file.
pub fn read_coco_json(path: &Path) -> Result<Dataset, CurateError> {
    if !path.is_file() {
        return Err(CurateError::SourceMissing {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(CurateError::Io)?;
    let reader = BufReader::new(file);

    let doc: CocoDocument =
        serde_json::from_reader(reader).map_err(|source| classify_parse_error(path, source))?;

    debug!(
        "Loaded {}: {} categories, {} images, {} annotations",
        path.display(),
        doc.categories.len(),
        doc.images.len(),
        doc.annotations.len()
    );

    Ok(doc.into())
}

/// Writes a dataset to a COCO JSON file, creating parent directories.
pub fn write_coco_json(path: &Path, dataset: &Dataset) -> Result<(), CurateError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path).map_err(CurateError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, &CocoDocumentRef::from(dataset)).map_err(|source| {
        CurateError::CocoJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Reads a dataset from a COCO JSON string.
///
/// Useful for testing without file I/O.
pub fn from_coco_str(json: &str) -> Result<Dataset, serde_json::Error> {
    let doc: CocoDocument = serde_json::from_str(json)?;
    Ok(doc.into())
}

/// Reads a dataset from a COCO JSON byte slice.
///
/// Useful for fuzzing and processing raw bytes without UTF-8 validation overhead.
pub fn from_coco_slice(bytes: &[u8]) -> Result<Dataset, serde_json::Error> {
    let doc: CocoDocument = serde_json::from_slice(bytes)?;
    Ok(doc.into())
}

/// Writes a dataset to a pretty-printed COCO JSON string.
pub fn to_coco_string(dataset: &Dataset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&CocoDocumentRef::from(dataset))
}

/// Missing keys and mistyped fields are schema problems; everything else
/// (syntax, truncation, I/O) is a parse failure.
fn classify_parse_error(path: &Path, source: serde_json::Error) -> CurateError {
    match source.classify() {
        serde_json::error::Category::Data => CurateError::SchemaMismatch {
            path: path.to_path_buf(),
            source,
        },
        _ => CurateError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CategoryId, ImageId};

    fn sample_coco_json() -> &'static str {
        r#"{
            "licenses": [{"name": "", "id": 0, "url": ""}],
            "info": {"contributor": "", "date_created": "", "description": "", "url": "", "version": "", "year": ""},
            "categories": [
                {"id": 1, "name": "led", "supercategory": ""},
                {"id": 2, "name": "ethernet_port", "supercategory": ""}
            ],
            "images": [
                {"id": 1, "width": 640, "height": 480, "file_name": "frame_000.png", "license": 0, "flickr_url": "", "coco_url": "", "date_captured": 0}
            ],
            "annotations": [
                {
                    "id": 1,
                    "image_id": 1,
                    "category_id": 2,
                    "segmentation": [],
                    "area": 5400.0,
                    "bbox": [10.0, 20.0, 90.0, 60.0],
                    "iscrowd": 0,
                    "attributes": {"occluded": false}
                }
            ]
        }"#
    }

    #[test]
    fn test_parse_cvat_export() {
        let dataset = from_coco_str(sample_coco_json()).expect("parse failed");

        assert_eq!(dataset.licenses().len(), 1);
        assert_eq!(dataset.categories().len(), 2);
        assert_eq!(dataset.categories()[1].id, CategoryId(2));
        assert_eq!(dataset.images()[0].id, ImageId(1));
        assert_eq!(dataset.images()[0].file_name, "frame_000.png");

        let ann = &dataset.annotations()[0];
        assert_eq!(ann.bbox, Some([10.0, 20.0, 90.0, 60.0]));
        assert_eq!(ann.extra.get("iscrowd"), Some(&serde_json::json!(0)));
        assert!(ann.extra.contains_key("attributes"));
    }

    #[test]
    fn test_roundtrip_is_lossless() {
        let original = from_coco_str(sample_coco_json()).expect("parse failed");
        let json = to_coco_string(&original).expect("serialize failed");
        let restored = from_coco_str(&json).expect("reparse failed");

        assert_eq!(original, restored);
    }

    #[test]
    fn test_top_level_key_order_is_stable() {
        let dataset = from_coco_str(sample_coco_json()).expect("parse failed");
        let json = to_coco_string(&dataset).expect("serialize failed");

        let positions: Vec<usize> = ["licenses", "info", "categories", "images", "annotations"]
            .iter()
            .map(|key| json.find(&format!("\"{key}\"")).expect("key present"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_missing_top_level_key_is_data_error() {
        let json = r#"{"licenses": [], "info": {}, "categories": [], "images": []}"#;
        let err = from_coco_str(json).unwrap_err();
        assert_eq!(err.classify(), serde_json::error::Category::Data);
    }

    #[test]
    fn test_missing_record_field_is_data_error() {
        let json = r#"{
            "licenses": [], "info": {}, "categories": [],
            "images": [{"id": 1, "width": 1, "height": 1}],
            "annotations": []
        }"#;
        let err = from_coco_str(json).unwrap_err();
        assert_eq!(err.classify(), serde_json::error::Category::Data);
    }

    #[test]
    fn test_read_classifies_errors() {
        let dir = tempfile::tempdir().expect("tempdir");

        let missing = dir.path().join("nope.json");
        assert!(matches!(
            read_coco_json(&missing),
            Err(CurateError::SourceMissing { .. })
        ));

        let schema = dir.path().join("schema.json");
        std::fs::write(&schema, r#"{"images": []}"#).unwrap();
        assert!(matches!(
            read_coco_json(&schema),
            Err(CurateError::SchemaMismatch { .. })
        ));

        let syntax = dir.path().join("syntax.json");
        std::fs::write(&syntax, r#"{"images": [}"#).unwrap();
        assert!(matches!(
            read_coco_json(&syntax),
            Err(CurateError::CocoJsonParse { .. })
        ));
    }

    #[test]
    fn test_load_dataset_dir_requires_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_dataset_dir(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, CurateError::SourceMissing { .. }));

        // Root exists but has no annotations/ directory.
        let err = load_dataset_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CurateError::SourceMissing { path } if path.ends_with(INSTANCES_FILE)));
    }

    #[test]
    fn test_write_then_load_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dataset = from_coco_str(sample_coco_json()).expect("parse failed");

        write_coco_json(&instances_path(dir.path()), &dataset).expect("write");
        let loaded = load_dataset_dir(dir.path()).expect("load");

        assert_eq!(loaded, dataset);
    }
}
