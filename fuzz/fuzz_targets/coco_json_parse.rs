//! Fuzz target for COCO JSON parsing and the transforms behind `split`.
//!
//! Any document the parser accepts is pushed through filtering, splitting
//! and a self-merge; none of them may panic on inconsistent input.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_json_parse

#![no_main]

use cococurate::filter::{filter_categories, FilterOptions};
use cococurate::ir::io_coco_json::from_coco_slice;
use cococurate::merge::{merge_datasets, CategoryPolicy};
use cococurate::split::{split_dataset, SplitOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for JSON annotation files.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(dataset) = from_coco_slice(data) else {
        return;
    };

    let keep = dataset.categories().iter().map(|c| c.id).take(2);
    let _ = filter_categories(&dataset, &FilterOptions::new(keep, 3));

    let opts = SplitOptions {
        include_validation: true,
        seed: Some(0),
        ..Default::default()
    };
    let _ = split_dataset(&dataset, &opts);
    let _ = merge_datasets(&dataset, &dataset, CategoryPolicy::Reconcile);
});
