//! Train/test(/validation) partitioning.
//!
//! Images are shuffled and cut into consecutive runs; each subset's
//! annotations are then selected by joining on `image_id`. Every image of
//! the input lands in exactly one subset.

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::fmt;

use log::info;

use crate::error::CurateError;
use crate::ir::{Dataset, ImageId};

/// Share of images assigned to the train subset by default.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// A named subset of a partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subset {
    Train,
    Test,
    Validation,
}

impl Subset {
    /// Directory and file prefix used on disk.
    pub fn name(self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Test => "test",
            Subset::Validation => "validation",
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split options.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitOptions {
    pub train_fraction: f64,
    pub include_validation: bool,
    /// Seed for a reproducible shuffle; `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            train_fraction: DEFAULT_TRAIN_FRACTION,
            include_validation: false,
            seed: None,
        }
    }
}

/// The subsets produced by a split.
#[derive(Clone, Debug)]
pub struct Partition {
    pub train: Dataset,
    pub test: Dataset,
    /// Present only for three-way splits.
    pub validation: Option<Dataset>,
}

impl Partition {
    /// Subsets in export order.
    pub fn subsets(&self) -> Vec<(Subset, &Dataset)> {
        let mut out = vec![(Subset::Train, &self.train), (Subset::Test, &self.test)];
        if let Some(validation) = &self.validation {
            out.push((Subset::Validation, validation));
        }
        out
    }
}

/// Sizes of the train, test and validation runs for `total` images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitSizes {
    pub train: usize,
    pub test: usize,
    pub validation: usize,
}

/// Validate split options before running.
pub fn validate_split_options(opts: &SplitOptions) -> Result<(), CurateError> {
    let fraction = opts.train_fraction;
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(CurateError::InvalidSplitParams {
            message: format!("train fraction must be in [0.0, 1.0], got {}", fraction),
        });
    }
    Ok(())
}

/// Compute subset sizes.
///
/// `train = ceil(f * total)`; for three-way splits `test = ceil((1 - f) / 2 *
/// total)` and validation takes the remainder. Each size is clamped to the
/// images still unassigned, so the three always sum to `total`.
pub fn split_sizes(total: usize, train_fraction: f64, include_validation: bool) -> SplitSizes {
    let train = ((train_fraction * total as f64).ceil() as usize).min(total);
    let rest = total - train;

    if !include_validation {
        return SplitSizes {
            train,
            test: rest,
            validation: 0,
        };
    }

    let test = (((1.0 - train_fraction) / 2.0 * total as f64).ceil() as usize).min(rest);
    SplitSizes {
        train,
        test,
        validation: rest - test,
    }
}

/// Split a dataset according to options.
pub fn split_dataset(dataset: &Dataset, opts: &SplitOptions) -> Result<Partition, CurateError> {
    if let Some(seed) = opts.seed {
        let mut rng = StdRng::seed_from_u64(seed);
        split_dataset_with_rng(dataset, opts, &mut rng)
    } else {
        let mut rng = rand::rng();
        split_dataset_with_rng(dataset, opts, &mut rng)
    }
}

/// Split a dataset using a caller-provided randomness source.
///
/// `opts.seed` is ignored; the shuffle draws from `rng` only.
pub fn split_dataset_with_rng<R: Rng + ?Sized>(
    dataset: &Dataset,
    opts: &SplitOptions,
    rng: &mut R,
) -> Result<Partition, CurateError> {
    validate_split_options(opts)?;

    let mut order: Vec<ImageId> = dataset.images().iter().map(|image| image.id).collect();
    order.shuffle(rng);

    let sizes = split_sizes(order.len(), opts.train_fraction, opts.include_validation);
    let (train_ids, rest) = order.split_at(sizes.train);
    let (test_ids, validation_ids) = rest.split_at(sizes.test);

    let train = subset_in_order(dataset, train_ids);
    let test = subset_in_order(dataset, test_ids);
    let validation = opts
        .include_validation
        .then(|| subset_in_order(dataset, validation_ids));

    info!(
        "Split {} images into train={} test={}{}",
        order.len(),
        train.images().len(),
        test.images().len(),
        validation
            .as_ref()
            .map(|v| format!(" validation={}", v.images().len()))
            .unwrap_or_default()
    );

    Ok(Partition {
        train,
        test,
        validation,
    })
}

/// Create a subset dataset by selected image IDs, preserving original IDs
/// and input order.
pub fn subset_by_image_ids(dataset: &Dataset, keep: &HashSet<ImageId>) -> Dataset {
    let images = dataset
        .images()
        .iter()
        .filter(|image| keep.contains(&image.id))
        .cloned()
        .collect();

    let annotations = dataset
        .annotations()
        .iter()
        .filter(|ann| keep.contains(&ann.image_id))
        .cloned()
        .collect();

    dataset.with_records(images, annotations)
}

/// Like [`subset_by_image_ids`], but images follow the order of `ids`.
fn subset_in_order(dataset: &Dataset, ids: &[ImageId]) -> Dataset {
    let keep: HashSet<ImageId> = ids.iter().copied().collect();
    let subset = subset_by_image_ids(dataset, &keep);

    let position: HashMap<ImageId, usize> =
        ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let (mut images, annotations) = subset.into_records();
    images.sort_by_key(|image| position.get(&image.id).copied().unwrap_or(usize::MAX));

    dataset.with_records(images, annotations)
}
