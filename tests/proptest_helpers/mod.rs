#![allow(dead_code)]

use std::collections::BTreeMap;

use cococurate::ir::{Annotation, Category, Dataset, DatasetMeta, Image, ImageId};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Annotations grouped by the file name of the image they sit on, ignoring
/// ids. Survives any renumbering that keeps foreign keys intact.
pub fn annotations_by_file(dataset: &Dataset) -> BTreeMap<String, Vec<(u64, String)>> {
    let files: BTreeMap<ImageId, &str> = dataset
        .images()
        .iter()
        .map(|img| (img.id, img.file_name.as_str()))
        .collect();

    let mut out: BTreeMap<String, Vec<(u64, String)>> = BTreeMap::new();
    for ann in dataset.annotations() {
        let file = files.get(&ann.image_id).copied().unwrap_or("<missing>");
        out.entry(file.to_string())
            .or_default()
            .push((ann.category_id.as_u64(), format!("{:?}", ann.bbox)));
    }
    out
}

fn category_table(count: usize) -> Vec<Category> {
    (1..=count as u64)
        .map(|id| Category::new(id, format!("class_{id}")))
        .collect()
}

/// Datasets with sparse, shuffled ids and consistent foreign keys.
///
/// Image ids are drawn from `1..=1000` without repetition; annotations pick
/// an existing image and a defined category. At least two categories are
/// defined whenever `max_cats` allows it. Annotations can pile
/// up on one image so outlier thresholds are exercised.
pub fn arb_dataset(max_images: usize, max_cats: usize, max_anns: usize) -> BoxedStrategy<Dataset> {
    assert!(max_cats > 0, "max_cats must be > 0");

    (
        proptest::collection::btree_set(1u64..=1000, 0..=max_images),
        max_cats.min(2)..=max_cats,
    )
        .prop_flat_map(move |(image_ids, cat_count)| {
            let image_ids: Vec<u64> = image_ids.into_iter().collect();
            let n_images = image_ids.len();
            let ann_seeds = if n_images == 0 {
                proptest::collection::vec((0usize..1, 1u64..=1), 0..=0).boxed()
            } else {
                proptest::collection::vec(
                    (0..n_images, 1u64..=cat_count as u64),
                    0..=max_anns,
                )
                .boxed()
            };
            (
                Just(image_ids).prop_shuffle(),
                Just(cat_count),
                ann_seeds,
                1u64..=50,
            )
        })
        .prop_map(|(image_ids, cat_count, ann_seeds, ann_base)| {
            let images: Vec<Image> = image_ids
                .iter()
                .map(|id| Image::new(*id, format!("img_{id}.jpg"), 64, 48))
                .collect();
            let annotations: Vec<Annotation> = ann_seeds
                .iter()
                .enumerate()
                .map(|(i, (image_idx, category))| {
                    Annotation::new(
                        ann_base + i as u64 * 3,
                        image_ids[*image_idx],
                        *category,
                        [i as f64, 0.0, 2.0, 2.0],
                    )
                })
                .collect();
            Dataset::new(
                DatasetMeta::with_categories(category_table(cat_count)),
                images,
                annotations,
            )
        })
        .boxed()
}
