use std::collections::{HashMap, HashSet};

use cococurate::filter::{count_by_image_and_category, filter_categories, FilterOptions};
use cococurate::ir::io_coco_json::{from_coco_str, to_coco_string};
use cococurate::ir::{CategoryId, ImageId};
use cococurate::merge::{merge_datasets, CategoryPolicy};
use cococurate::split::{split_dataset, split_sizes, SplitOptions};
use cococurate::validation::{check_referential_integrity, validate_dataset, ValidateOptions};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn filter_respects_bound_and_keep_set(
        dataset in proptest_helpers::arb_dataset(12, 4, 60),
        max in 0usize..6,
    ) {
        let opts = FilterOptions::new([1u64, 2], max);
        let filtered = filter_categories(&dataset, &opts).expect("filter ok");

        prop_assert!(validate_dataset(&filtered, &ValidateOptions::default()).is_ok());
        prop_assert!(filtered.annotations().iter().all(|a| opts.keep.contains(&a.category_id)));

        let counts = count_by_image_and_category(filtered.annotations());
        prop_assert!(counts.values().all(|c| *c <= max));

        // Every surviving image still has at least one annotation.
        let annotated: HashSet<ImageId> = filtered.annotations().iter().map(|a| a.image_id).collect();
        prop_assert_eq!(annotated, filtered.image_ids());
        prop_assert!(std::sync::Arc::ptr_eq(filtered.meta(), dataset.meta()));
    }

    #[test]
    fn filter_is_idempotent(
        dataset in proptest_helpers::arb_dataset(12, 3, 60),
        max in 1usize..5,
    ) {
        let opts = FilterOptions::new([2u64], max);
        let once = filter_categories(&dataset, &opts).expect("filter ok");
        let twice = filter_categories(&once, &opts).expect("filter ok");
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn split_covers_input_exactly_once(
        dataset in proptest_helpers::arb_dataset(40, 3, 80),
        fraction in 0.0f64..=1.0,
        include_validation in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let opts = SplitOptions { train_fraction: fraction, include_validation, seed: Some(seed) };
        let partition = split_dataset(&dataset, &opts).expect("split ok");

        let sizes = split_sizes(dataset.images().len(), fraction, include_validation);
        prop_assert_eq!(partition.train.images().len(), sizes.train);
        prop_assert_eq!(partition.test.images().len(), sizes.test);
        prop_assert_eq!(
            partition.validation.as_ref().map(|v| v.images().len()).unwrap_or(0),
            sizes.validation
        );

        let mut seen: HashMap<ImageId, usize> = HashMap::new();
        let mut annotation_total = 0;
        for (_, subset) in partition.subsets() {
            prop_assert!(validate_dataset(subset, &ValidateOptions::default()).is_ok());
            prop_assert!(check_referential_integrity(subset).is_ok());
            annotation_total += subset.annotations().len();
            for image in subset.images() {
                *seen.entry(image.id).or_insert(0) += 1;
            }
        }
        prop_assert!(seen.values().all(|n| *n == 1));
        prop_assert_eq!(seen.len(), dataset.images().len());
        prop_assert_eq!(annotation_total, dataset.annotations().len());
    }

    #[test]
    fn merge_conserves_records_and_links(
        a in proptest_helpers::arb_dataset(10, 3, 30),
        b in proptest_helpers::arb_dataset(10, 3, 30),
    ) {
        let merged = merge_datasets(&a, &b, CategoryPolicy::PreferFirst).expect("merge ok");
        let ds = &merged.dataset;

        prop_assert_eq!(ds.images().len(), a.images().len() + b.images().len());
        prop_assert_eq!(ds.annotations().len(), a.annotations().len() + b.annotations().len());

        let image_ids: Vec<u64> = ds.images().iter().map(|i| i.id.as_u64()).collect();
        let expected: Vec<u64> = (1..=ds.images().len() as u64).collect();
        prop_assert_eq!(image_ids, expected);
        let ann_ids: Vec<u64> = ds.annotations().iter().map(|a| a.id.as_u64()).collect();
        let expected: Vec<u64> = (1..=ds.annotations().len() as u64).collect();
        prop_assert_eq!(ann_ids, expected);

        let res = check_referential_integrity(ds);
        prop_assert!(res.is_ok(), "{}", res.unwrap_err());

        // Both inputs name files img_<old id>.jpg, so compare per input half.
        let (first_images, second_images) = ds.images().split_at(a.images().len());
        let (first_anns, second_anns) = ds.annotations().split_at(a.annotations().len());
        let first = a.with_records(first_images.to_vec(), first_anns.to_vec());
        let second = b.with_records(second_images.to_vec(), second_anns.to_vec());
        prop_assert_eq!(
            proptest_helpers::annotations_by_file(&first),
            proptest_helpers::annotations_by_file(&a)
        );
        prop_assert_eq!(
            proptest_helpers::annotations_by_file(&second),
            proptest_helpers::annotations_by_file(&b)
        );
    }

    #[test]
    fn reconcile_merge_keeps_every_category_resolvable(
        a in proptest_helpers::arb_dataset(6, 4, 20),
        b in proptest_helpers::arb_dataset(6, 4, 20),
    ) {
        let merged = merge_datasets(&a, &b, CategoryPolicy::Reconcile).expect("merge ok");
        let known: HashSet<CategoryId> = merged.dataset.categories().iter().map(|c| c.id).collect();
        prop_assert!(merged.dataset.annotations().iter().all(|a| known.contains(&a.category_id)));
    }

    #[test]
    fn coco_text_roundtrip_is_lossless(dataset in proptest_helpers::arb_dataset(8, 3, 20)) {
        let json = to_coco_string(&dataset).expect("serialize coco");
        let restored = from_coco_str(&json).expect("parse coco");
        prop_assert_eq!(restored, dataset);
    }
}
