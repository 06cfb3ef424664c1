//! Dataset statistics.
//!
//! The numbers here are the ones needed to pick filter parameters: how many
//! annotations each category has, and how densely a single image can be
//! labelled with one category before it counts as an outlier.

mod report;

pub use report::{AnnotationDensityStats, CategoryStats, StatsReport, SummarySection};

use std::collections::{HashMap, HashSet};

use crate::filter::{count_by_image_and_category, DEFAULT_MAX_ANNOTATIONS_PER_IMAGE};
use crate::ir::{CategoryId, Dataset, ImageId};

/// Options for dataset statistics.
#[derive(Clone, Debug)]
pub struct StatsOptions {
    /// Per-image, per-category count above which an image is an outlier.
    pub outlier_threshold: usize,
    /// Width of histogram bars (in characters).
    pub bar_width: usize,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            outlier_threshold: DEFAULT_MAX_ANNOTATIONS_PER_IMAGE,
            bar_width: 20,
        }
    }
}

/// Compute a statistics report for a dataset.
pub fn stats_dataset(dataset: &Dataset, opts: &StatsOptions) -> StatsReport {
    let pair_counts = count_by_image_and_category(dataset.annotations());

    StatsReport {
        summary: compute_summary(dataset),
        categories: compute_categories(dataset, &pair_counts, opts.outlier_threshold),
        annotation_density: compute_annotation_density(dataset, opts.outlier_threshold),
        bar_width: opts.bar_width,
    }
}

fn compute_summary(dataset: &Dataset) -> SummarySection {
    let annotated: HashSet<ImageId> = dataset
        .annotations()
        .iter()
        .map(|ann| ann.image_id)
        .collect();
    let known: HashSet<CategoryId> = dataset.categories().iter().map(|c| c.id).collect();

    SummarySection {
        images: dataset.images().len(),
        categories: dataset.categories().len(),
        annotations: dataset.annotations().len(),
        licenses: dataset.licenses().len(),
        annotated_images: annotated.len(),
        uncategorized_annotations: dataset
            .annotations()
            .iter()
            .filter(|ann| !known.contains(&ann.category_id))
            .count(),
    }
}

fn compute_categories(
    dataset: &Dataset,
    pair_counts: &HashMap<(ImageId, CategoryId), usize>,
    threshold: usize,
) -> Vec<CategoryStats> {
    #[derive(Default)]
    struct Acc {
        annotations: usize,
        images: usize,
        max_per_image: usize,
        outlier_images: usize,
    }

    let mut per_category: HashMap<CategoryId, Acc> = HashMap::new();
    for ((_, category_id), count) in pair_counts {
        let acc = per_category.entry(*category_id).or_default();
        acc.annotations += count;
        acc.images += 1;
        acc.max_per_image = acc.max_per_image.max(*count);
        if *count > threshold {
            acc.outlier_images += 1;
        }
    }

    dataset
        .categories()
        .iter()
        .map(|category| {
            let acc = per_category.remove(&category.id).unwrap_or_default();
            CategoryStats {
                id: category.id.as_u64(),
                name: category.name.clone(),
                annotations: acc.annotations,
                images: acc.images,
                max_per_image: acc.max_per_image,
                outlier_images: acc.outlier_images,
            }
        })
        .collect()
}

fn compute_annotation_density(dataset: &Dataset, threshold: usize) -> AnnotationDensityStats {
    let mut per_image: HashMap<ImageId, usize> = dataset
        .images()
        .iter()
        .map(|image| (image.id, 0))
        .collect();
    for ann in dataset.annotations() {
        if let Some(count) = per_image.get_mut(&ann.image_id) {
            *count += 1;
        }
    }

    if per_image.is_empty() {
        return AnnotationDensityStats {
            outlier_threshold: threshold,
            ..Default::default()
        };
    }

    let counts: Vec<usize> = per_image.into_values().collect();
    let total: usize = counts.iter().sum();

    AnnotationDensityStats {
        min_per_image: counts.iter().copied().min().unwrap_or(0),
        max_per_image: counts.iter().copied().max().unwrap_or(0),
        mean_per_image: total as f64 / counts.len() as f64,
        zero_annotation_images: counts.iter().filter(|c| **c == 0).count(),
        outlier_threshold: threshold,
    }
}
