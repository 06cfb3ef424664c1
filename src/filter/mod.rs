//! Category filtering and outlier removal.
//!
//! Filtering keeps the annotations of a chosen category subset, drops every
//! image that is an annotation-density outlier for one of those categories,
//! and drops images left without any annotation. The metadata block is
//! shared with the input untouched.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::{debug, info};

use crate::error::CurateError;
use crate::ir::{Annotation, CategoryId, Dataset, DatasetMeta, ImageId};

/// Category kept when none is requested.
pub const DEFAULT_CATEGORY: u64 = 2;

/// Per-image, per-category annotation count above which an image is dropped.
pub const DEFAULT_MAX_ANNOTATIONS_PER_IMAGE: usize = 30;

/// Filtering options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterOptions {
    pub keep: BTreeSet<CategoryId>,
    pub max_annotations_per_image: usize,
}

impl FilterOptions {
    pub fn new<I, C>(keep: I, max_annotations_per_image: usize) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CategoryId>,
    {
        Self {
            keep: keep.into_iter().map(Into::into).collect(),
            max_annotations_per_image,
        }
    }
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self::new([DEFAULT_CATEGORY], DEFAULT_MAX_ANNOTATIONS_PER_IMAGE)
    }
}

/// An image dropped because one kept category is too dense on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outlier {
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub count: usize,
}

/// Resolves user-supplied category selectors against the dataset.
///
/// Each selector is either a numeric id or a category name. Selectors that
/// match nothing are an error, so a typo cannot silently empty the dataset.
pub fn resolve_categories(
    dataset: &Dataset,
    selectors: &[String],
) -> Result<BTreeSet<CategoryId>, CurateError> {
    let mut resolved = BTreeSet::new();

    for selector in selectors.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let by_id = selector
            .parse::<u64>()
            .ok()
            .map(CategoryId::new)
            .filter(|id| dataset.meta().category(*id).is_some());

        let id = match by_id {
            Some(id) => id,
            None => dataset
                .categories()
                .iter()
                .find(|cat| cat.name == selector)
                .map(|cat| cat.id)
                .ok_or_else(|| CurateError::InvalidFilterParams {
                    message: format!("category '{}' is not defined in the dataset", selector),
                })?,
        };
        resolved.insert(id);
    }

    Ok(resolved)
}

/// Validate filter options against a dataset before running.
pub fn validate_filter_options(dataset: &Dataset, opts: &FilterOptions) -> Result<(), CurateError> {
    if opts.keep.is_empty() {
        return Err(CurateError::InvalidFilterParams {
            message: "select at least one category".to_string(),
        });
    }

    if let Some(unknown) = opts
        .keep
        .iter()
        .find(|id| dataset.meta().category(**id).is_none())
    {
        return Err(CurateError::UnknownCategory { id: *unknown });
    }

    Ok(())
}

/// Counts annotations per `(image_id, category_id)` in one pass.
pub fn count_by_image_and_category<'a>(
    annotations: impl IntoIterator<Item = &'a Annotation>,
) -> HashMap<(ImageId, CategoryId), usize> {
    let mut counts = HashMap::new();
    for ann in annotations {
        *counts.entry((ann.image_id, ann.category_id)).or_insert(0) += 1;
    }
    counts
}

/// Lists every `(image, kept category)` pair whose count exceeds the maximum.
///
/// Sorted by image id, then category id.
pub fn find_outliers(dataset: &Dataset, opts: &FilterOptions) -> Vec<Outlier> {
    let counts = count_by_image_and_category(
        dataset
            .annotations()
            .iter()
            .filter(|ann| opts.keep.contains(&ann.category_id)),
    );

    let mut outliers: Vec<Outlier> = counts
        .into_iter()
        .filter(|(_, count)| *count > opts.max_annotations_per_image)
        .map(|((image_id, category_id), count)| Outlier {
            image_id,
            category_id,
            count,
        })
        .collect();
    outliers.sort_by_key(|o| (o.image_id, o.category_id));
    outliers
}

/// Filter a dataset down to the kept categories, dropping outlier images.
///
/// Images without any surviving annotation are dropped as well. Selecting a
/// category that has no annotations yields an empty dataset.
pub fn filter_categories(dataset: &Dataset, opts: &FilterOptions) -> Result<Dataset, CurateError> {
    validate_filter_options(dataset, opts)?;

    let outliers: HashSet<ImageId> = find_outliers(dataset, opts)
        .into_iter()
        .map(|o| o.image_id)
        .collect();

    let annotations: Vec<Annotation> = dataset
        .annotations()
        .iter()
        .filter(|ann| opts.keep.contains(&ann.category_id))
        .filter(|ann| !outliers.contains(&ann.image_id))
        .cloned()
        .collect();

    let keep_image_ids: HashSet<ImageId> = annotations.iter().map(|ann| ann.image_id).collect();

    let images: Vec<_> = dataset
        .images()
        .iter()
        .filter(|image| keep_image_ids.contains(&image.id))
        .cloned()
        .collect();

    // Annotations pointing at images absent from the input are not rescued.
    let annotations = if images.len() == keep_image_ids.len() {
        annotations
    } else {
        let present: HashSet<ImageId> = images.iter().map(|image| image.id).collect();
        annotations
            .into_iter()
            .filter(|ann| present.contains(&ann.image_id))
            .collect()
    };

    debug!("Outlier images dropped: {}", outliers.len());
    info!(
        "Filtered to categories {:?}: {} -> {} images, {} -> {} annotations",
        opts.keep,
        dataset.images().len(),
        images.len(),
        dataset.annotations().len(),
        annotations.len()
    );

    Ok(dataset.with_records(images, annotations))
}

/// Rewrites annotation categories through `mapping` (old id to new id).
///
/// Ids not present in `mapping` are left alone. Every target id must be a
/// defined category; the category table itself is not changed.
pub fn relabel_categories(
    dataset: &Dataset,
    mapping: &BTreeMap<CategoryId, CategoryId>,
) -> Result<Dataset, CurateError> {
    if let Some(target) = mapping
        .values()
        .find(|id| dataset.meta().category(**id).is_none())
    {
        return Err(CurateError::UnknownCategory { id: *target });
    }

    let mut changed = 0usize;
    let annotations: Vec<Annotation> = dataset
        .annotations()
        .iter()
        .map(|ann| match mapping.get(&ann.category_id) {
            Some(target) if *target != ann.category_id => {
                changed += 1;
                Annotation {
                    category_id: *target,
                    ..ann.clone()
                }
            }
            _ => ann.clone(),
        })
        .collect();

    info!("Relabelled {} annotation(s)", changed);
    Ok(dataset.with_records(dataset.images().to_vec(), annotations))
}

/// Parses `old=new` relabel pairs.
pub fn parse_relabel_pairs(
    pairs: &[String],
) -> Result<BTreeMap<CategoryId, CategoryId>, CurateError> {
    let mut mapping = BTreeMap::new();
    for pair in pairs {
        let parsed = pair
            .split_once('=')
            .and_then(|(from, to)| Some((from.trim().parse().ok()?, to.trim().parse().ok()?)));
        match parsed {
            Some((from, to)) => {
                mapping.insert(CategoryId::new(from), CategoryId::new(to));
            }
            None => {
                return Err(CurateError::InvalidFilterParams {
                    message: format!("relabel '{}' is not of the form OLD=NEW", pair),
                })
            }
        }
    }
    Ok(mapping)
}

/// Keeps only categories present in `keep`, for exports that should not
/// advertise dropped classes.
pub fn restrict_category_table(dataset: &Dataset, keep: &BTreeSet<CategoryId>) -> Dataset {
    let meta = DatasetMeta {
        categories: dataset
            .categories()
            .iter()
            .filter(|cat| keep.contains(&cat.id))
            .cloned()
            .collect(),
        ..(**dataset.meta()).clone()
    };
    dataset.with_meta(meta)
}
