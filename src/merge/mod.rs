//! Merging two independently annotated datasets.
//!
//! Two CVAT exports of different image batches both number their images and
//! annotations from 1, so their id spaces collide. Merging renumbers every
//! image and every annotation into one contiguous id space (first input
//! first, in record order) and rewrites `annotation.image_id` through the
//! same table, so no foreign key changes its target.
//!
//! Category tables are handled by an explicit [`CategoryPolicy`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::{info, warn};

use crate::error::CurateError;
use crate::validation::check_referential_integrity;
use crate::ir::{
    Annotation, AnnotationId, Category, CategoryId, Dataset, DatasetMeta, IdRemap, Image, ImageId,
};

/// How to combine the category tables of the two inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CategoryPolicy {
    /// Both inputs must define the same `(id, name)` pairs in the same order.
    #[default]
    Strict,
    /// Match the second input's categories to the first by name; names the
    /// first input lacks are appended with fresh ids.
    Reconcile,
    /// Take the first input's table as-is and keep the second input's
    /// category ids unchanged.
    PreferFirst,
}

/// Which merge input a record came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MergeInput {
    First,
    Second,
}

/// Where a merged image came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSource {
    pub input: MergeInput,
    pub original_id: ImageId,
    /// File name inside the input's `images/` directory.
    pub original_file_name: String,
}

/// A merged dataset plus the provenance of each of its images.
///
/// `sources[i]` describes `dataset.images()[i]`.
#[derive(Clone, Debug)]
pub struct Merged {
    pub dataset: Dataset,
    pub sources: Vec<ImageSource>,
}

impl Merged {
    /// Renames every image to `<prefix>-<id>.<ext>`, keeping the extension.
    ///
    /// Provenance keeps the original names, so files can still be copied
    /// from the inputs.
    pub fn rename_files(&self, prefix: &str) -> Merged {
        let images = self
            .dataset
            .images()
            .iter()
            .map(|image| {
                let file_name = match Path::new(&image.file_name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                {
                    Some(ext) => format!("{}-{}.{}", prefix, image.id, ext),
                    None => format!("{}-{}", prefix, image.id),
                };
                Image {
                    file_name,
                    ..image.clone()
                }
            })
            .collect();

        Merged {
            dataset: self
                .dataset
                .with_records(images, self.dataset.annotations().to_vec()),
            sources: self.sources.clone(),
        }
    }

    /// File names used by more than one merged image, sorted.
    pub fn file_name_collisions(&self) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for image in self.dataset.images() {
            *counts.entry(image.file_name.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

/// Merge two datasets into one with a single contiguous id space.
///
/// Images of `a` become `1..=|a.images|`, images of `b` follow; annotations
/// are renumbered the same way. Info and licenses come from `a`; the
/// category table is decided by `policy`.
///
/// # Errors
/// - [`CurateError::CategoryMismatch`] under [`CategoryPolicy::Strict`] when
///   the tables differ.
/// - [`CurateError::DuplicateImageId`] if an input repeats an image id.
/// - [`CurateError::ReferentialGap`] if an input annotation points at an
///   image that input does not contain.
pub fn merge_datasets(
    a: &Dataset,
    b: &Dataset,
    policy: CategoryPolicy,
) -> Result<Merged, CurateError> {
    check_referential_integrity(a)?;
    check_referential_integrity(b)?;
    let (categories, category_map) = combine_categories(a.categories(), b.categories(), policy)?;

    let mut next_annotation = 1u64;
    let first = remap_input(a, MergeInput::First, 1, &mut next_annotation, &HashMap::new())?;
    let second = remap_input(
        b,
        MergeInput::Second,
        a.images().len() as u64 + 1,
        &mut next_annotation,
        &category_map,
    )?;

    let mut images = first.images;
    images.extend(second.images);
    let mut annotations = first.annotations;
    annotations.extend(second.annotations);
    let mut sources = first.sources;
    sources.extend(second.sources);

    info!(
        "Merged {} + {} images, {} + {} annotations",
        a.images().len(),
        b.images().len(),
        a.annotations().len(),
        b.annotations().len()
    );

    let meta = DatasetMeta {
        info: a.info().clone(),
        licenses: a.licenses().to_vec(),
        categories,
    };

    let merged = Merged {
        dataset: Dataset::new(meta, images, annotations),
        sources,
    };

    let collisions = merged.file_name_collisions();
    if !collisions.is_empty() {
        warn!(
            "{} file name(s) occur in both inputs; rename before exporting",
            collisions.len()
        );
    }

    Ok(merged)
}

struct RemappedInput {
    images: Vec<Image>,
    annotations: Vec<Annotation>,
    sources: Vec<ImageSource>,
}

fn remap_input(
    dataset: &Dataset,
    input: MergeInput,
    first_image_id: u64,
    next_annotation: &mut u64,
    category_map: &HashMap<CategoryId, CategoryId>,
) -> Result<RemappedInput, CurateError> {
    let image_map = IdRemap::sequential(first_image_id, dataset.images().iter().map(|i| i.id))
        .map_err(|id| CurateError::DuplicateImageId { id })?;

    let mut images = Vec::with_capacity(dataset.images().len());
    let mut sources = Vec::with_capacity(dataset.images().len());
    for image in dataset.images() {
        let new_id = image_map
            .get(image.id)
            .ok_or(CurateError::DuplicateImageId { id: image.id })?;
        sources.push(ImageSource {
            input,
            original_id: image.id,
            original_file_name: image.file_name.clone(),
        });
        images.push(Image {
            id: new_id,
            ..image.clone()
        });
    }

    let mut annotations = Vec::with_capacity(dataset.annotations().len());
    for ann in dataset.annotations() {
        let image_id = image_map
            .get(ann.image_id)
            .ok_or(CurateError::ReferentialGap {
                annotation: ann.id,
                image: ann.image_id,
            })?;
        let category_id = category_map
            .get(&ann.category_id)
            .copied()
            .unwrap_or(ann.category_id);

        annotations.push(Annotation {
            id: AnnotationId::new(*next_annotation),
            image_id,
            category_id,
            ..ann.clone()
        });
        *next_annotation += 1;
    }

    Ok(RemappedInput {
        images,
        annotations,
        sources,
    })
}

/// Builds the merged category table and the id rewrite for the second input.
fn combine_categories(
    a: &[Category],
    b: &[Category],
    policy: CategoryPolicy,
) -> Result<(Vec<Category>, HashMap<CategoryId, CategoryId>), CurateError> {
    match policy {
        CategoryPolicy::PreferFirst => Ok((a.to_vec(), HashMap::new())),
        CategoryPolicy::Strict => {
            let left = id_name_pairs(a);
            let right = id_name_pairs(b);
            if left == right {
                return Ok((a.to_vec(), HashMap::new()));
            }

            let first_difference = left
                .iter()
                .zip(right.iter())
                .find(|(l, r)| l != r)
                .map(|((lid, lname), (rid, rname))| {
                    format!(
                        "category {} '{}' vs category {} '{}'",
                        lid, lname, rid, rname
                    )
                })
                .unwrap_or_else(|| {
                    format!("{} vs {} categories", left.len(), right.len())
                });
            Err(CurateError::CategoryMismatch {
                message: first_difference,
            })
        }
        CategoryPolicy::Reconcile => {
            let mut categories = a.to_vec();
            let mut mapping = HashMap::new();
            let mut last_id = a.iter().map(|c| c.id.as_u64()).max().unwrap_or(0);

            for category in b {
                let existing = categories
                    .iter()
                    .find(|c| c.name == category.name)
                    .map(|c| c.id);
                let target = match existing {
                    Some(id) => id,
                    None => {
                        let fresh = last_id.checked_add(1).ok_or_else(|| {
                            CurateError::CategoryMismatch {
                                message: format!(
                                    "no category id left after {} for '{}'",
                                    last_id, category.name
                                ),
                            }
                        })?;
                        last_id = fresh;
                        let id = CategoryId::new(fresh);
                        categories.push(Category {
                            id,
                            ..category.clone()
                        });
                        id
                    }
                };
                mapping.insert(category.id, target);
            }

            Ok((categories, mapping))
        }
    }
}

fn id_name_pairs(categories: &[Category]) -> Vec<(CategoryId, &str)> {
    categories
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect()
}
