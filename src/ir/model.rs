//! Core dataset model.
//!
//! A [`Dataset`] is an immutable snapshot: static metadata (licenses, info,
//! categories) behind a shared [`Arc`], plus the two linked record sets,
//! images and annotations. Transforms never mutate a snapshot; they build a
//! new one with [`Dataset::with_records`], which shares the metadata block
//! with its parent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use super::ids::{AnnotationId, CategoryId, ImageId};

/// Metadata shared by every view derived from the same loaded dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetMeta {
    /// The COCO `info` block, kept verbatim.
    pub info: Value,

    /// The COCO `licenses` list, kept verbatim.
    pub licenses: Vec<Value>,

    /// Category definitions, in document order.
    pub categories: Vec<Category>,
}

impl Default for DatasetMeta {
    fn default() -> Self {
        Self {
            info: Value::Object(Map::new()),
            licenses: Vec::new(),
            categories: Vec::new(),
        }
    }
}

impl DatasetMeta {
    /// Metadata with the given categories and empty info/licenses.
    pub fn with_categories(categories: Vec<Category>) -> Self {
        Self {
            categories,
            ..Default::default()
        }
    }

    /// Looks up a category by id.
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|cat| cat.id == id)
    }
}

/// A consistent snapshot of a COCO dataset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    meta: Arc<DatasetMeta>,
    images: Vec<Image>,
    annotations: Vec<Annotation>,
}

impl Dataset {
    /// Creates a snapshot owning fresh metadata.
    pub fn new(meta: DatasetMeta, images: Vec<Image>, annotations: Vec<Annotation>) -> Self {
        Self::from_shared(Arc::new(meta), images, annotations)
    }

    /// Creates a snapshot around an existing shared metadata block.
    pub fn from_shared(
        meta: Arc<DatasetMeta>,
        images: Vec<Image>,
        annotations: Vec<Annotation>,
    ) -> Self {
        Self {
            meta,
            images,
            annotations,
        }
    }

    pub fn meta(&self) -> &Arc<DatasetMeta> {
        &self.meta
    }

    pub fn info(&self) -> &Value {
        &self.meta.info
    }

    pub fn licenses(&self) -> &[Value] {
        &self.meta.licenses
    }

    pub fn categories(&self) -> &[Category] {
        &self.meta.categories
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Returns a new snapshot with the same metadata and the given records.
    ///
    /// `self` is left untouched; the metadata block is shared, not copied.
    pub fn with_records(&self, images: Vec<Image>, annotations: Vec<Annotation>) -> Self {
        Self::from_shared(Arc::clone(&self.meta), images, annotations)
    }

    /// Returns a new snapshot with replaced metadata and cloned records.
    pub fn with_meta(&self, meta: DatasetMeta) -> Self {
        Self::new(meta, self.images.clone(), self.annotations.clone())
    }

    /// Consumes the snapshot, returning its record sets.
    pub fn into_records(self) -> (Vec<Image>, Vec<Annotation>) {
        (self.images, self.annotations)
    }

    /// Set of all image ids in this snapshot.
    pub fn image_ids(&self) -> HashSet<ImageId> {
        self.images.iter().map(|image| image.id).collect()
    }

    /// True when the snapshot holds no images and no annotations.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.annotations.is_empty()
    }
}

/// An image record.
///
/// Only the fields the transforms need are typed; everything else in the
/// source record (`license`, `date_captured`, `coco_url`, ...) is carried in
/// `extra` and written back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,

    /// File name relative to the dataset's `images/` directory.
    pub file_name: String,

    pub width: u32,

    pub height: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Image {
    /// Creates a new image with the given properties.
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
            extra: Map::new(),
        }
    }

    /// Attaches an untyped field that is carried through unchanged.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A category (class label).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    /// Name of the category (e.g., "person", "ethernet_port").
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    /// Creates a new category with the given properties.
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: None,
            extra: Map::new(),
        }
    }

    /// Sets the supercategory.
    pub fn with_supercategory(mut self, supercategory: impl Into<String>) -> Self {
        self.supercategory = Some(supercategory.into());
        self
    }
}

/// An annotation record: one labelled region on one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,

    /// Foreign key into the image record set.
    pub image_id: ImageId,

    /// Foreign key into the category table.
    pub category_id: CategoryId,

    /// COCO box `[x, y, width, height]` in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    /// Polygons or RLE, kept verbatim.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub segmentation: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Annotation {
    /// Creates a new annotation with a bounding box.
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: [f64; 4],
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox: Some(bbox),
            segmentation: Value::Null,
            extra: Map::new(),
        }
    }

    /// Sets the segmentation payload.
    pub fn with_segmentation(mut self, segmentation: Value) -> Self {
        self.segmentation = segmentation;
        self
    }

    /// Attaches an untyped field that is carried through unchanged.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Dataset {
        Dataset::new(
            DatasetMeta::with_categories(vec![Category::new(1u64, "person")]),
            vec![Image::new(1u64, "image001.jpg", 640, 480)],
            vec![Annotation::new(1u64, 1u64, 1u64, [10.0, 20.0, 90.0, 60.0])],
        )
    }

    #[test]
    fn test_with_records_shares_metadata() {
        let dataset = sample();
        let view = dataset.with_records(Vec::new(), Vec::new());

        assert!(Arc::ptr_eq(dataset.meta(), view.meta()));
        assert!(view.is_empty());
        // The parent snapshot keeps its records.
        assert_eq!(dataset.images().len(), 1);
        assert_eq!(dataset.annotations().len(), 1);
    }

    #[test]
    fn test_with_meta_detaches_metadata() {
        let dataset = sample();
        let relabelled = dataset.with_meta(DatasetMeta::with_categories(vec![Category::new(
            1u64, "human",
        )]));

        assert!(!Arc::ptr_eq(dataset.meta(), relabelled.meta()));
        assert_eq!(dataset.categories()[0].name, "person");
        assert_eq!(relabelled.categories()[0].name, "human");
        assert_eq!(relabelled.images(), dataset.images());
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let raw = json!({
            "id": 3,
            "file_name": "frame.png",
            "width": 10,
            "height": 20,
            "license": 0,
            "coco_url": ""
        });
        let image: Image = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(image.extra.get("license"), Some(&json!(0)));

        let back = serde_json::to_value(&image).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_annotation_builder_pattern() {
        let ann = Annotation::new(1u64, 2u64, 3u64, [0.0, 0.0, 5.0, 5.0])
            .with_segmentation(json!([[0.0, 0.0, 5.0, 0.0, 5.0, 5.0]]))
            .with_extra("iscrowd", 0)
            .with_extra("area", 25.0);

        assert_eq!(ann.image_id, ImageId(2));
        assert_eq!(ann.extra.len(), 2);
        assert!(ann.segmentation.is_array());
    }
}
