//! In-memory representation of a COCO dataset.
//!
//! The model mirrors the COCO instances document closely: a metadata block
//! (`info`, `licenses`, `categories`) plus two linked record sets, images and
//! annotations, joined by `annotation.image_id`.
//!
//! # Design Principles
//!
//! 1. **Snapshots**: a [`Dataset`] is never mutated by a transform. Filter,
//!    split and merge take `&Dataset` and return a new one.
//!
//! 2. **Typed keys**: [`ImageId`], [`AnnotationId`] and [`CategoryId`] are
//!    distinct newtypes so foreign keys cannot be crossed.
//!
//! 3. **Passthrough**: fields the transforms do not need are carried
//!    verbatim, so a curated subset is still a valid CVAT/COCO export.
//!
//! # Example
//!
//! ```
//! use cococurate::ir::{Annotation, Category, Dataset, DatasetMeta, Image};
//!
//! let dataset = Dataset::new(
//!     DatasetMeta::with_categories(vec![Category::new(1u64, "person")]),
//!     vec![Image::new(1u64, "image.jpg", 640, 480)],
//!     vec![Annotation::new(1u64, 1u64, 1u64, [10.0, 20.0, 90.0, 180.0])],
//! );
//! assert_eq!(dataset.images().len(), 1);
//! ```

mod ids;
pub mod io_coco_json;
mod model;
pub mod remap;

pub use ids::{AnnotationId, CategoryId, ImageId};
pub use model::{Annotation, Category, Dataset, DatasetMeta, Image};
pub use remap::IdRemap;
