//! cococurate: curation for COCO object detection datasets.
//!
//! Takes CVAT-style COCO exports (`annotations/instances_default.json` next
//! to an `images/` directory) and turns them into training releases:
//! category filtering with outlier removal, reproducible train/test
//! (/validation) splits, merging of separately annotated batches, and label
//! maps for TensorFlow and TensorFlow.js detectors.
//!
//! # Modules
//!
//! - [`ir`]: Dataset snapshot types and COCO JSON I/O
//! - [`filter`]: Category filtering, outlier removal, relabelling
//! - [`split`]: Train/test/validation partitioning
//! - [`merge`]: Merging two datasets into one id space
//! - [`labelmap`]: `label_map.pbtxt` and `classes.js` rendering
//! - [`export`]: Writing subsets and merged datasets to disk
//! - [`validation`]: Dataset validation and error reporting
//! - [`stats`]: Per-category statistics
//! - [`config`]: YAML split recipes
//! - [`error`]: Error types for cococurate operations

pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod ir;
pub mod labelmap;
pub mod merge;
pub mod split;
pub mod stats;
pub mod validation;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

pub use error::CurateError;

use ir::Dataset;

/// The cococurate CLI application.
#[derive(Parser)]
#[command(name = "cococurate")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Filter a dataset and split it into train/test(/validation) subsets.
    Split(SplitArgs),
    /// Merge two datasets into one with a single id space.
    Merge(MergeArgs),
    /// Write the label map (and optionally classes.js) for a dataset.
    LabelMap(LabelMapArgs),
    /// Validate a dataset for errors and warnings.
    Validate(ValidateArgs),
    /// Show per-category statistics for a dataset.
    Stats(StatsArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum CategoryPolicyArg {
    Strict,
    Reconcile,
    PreferFirst,
}

impl From<CategoryPolicyArg> for merge::CategoryPolicy {
    fn from(arg: CategoryPolicyArg) -> Self {
        match arg {
            CategoryPolicyArg::Strict => merge::CategoryPolicy::Strict,
            CategoryPolicyArg::Reconcile => merge::CategoryPolicy::Reconcile,
            CategoryPolicyArg::PreferFirst => merge::CategoryPolicy::PreferFirst,
        }
    }
}

/// Arguments for the split subcommand.
#[derive(clap::Args)]
struct SplitArgs {
    /// Dataset root containing annotations/ and images/.
    input: PathBuf,

    /// Output root (defaults to the input root).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Categories to keep, by id or name (comma-separated).
    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// Drop images with more than this many annotations of one kept category.
    #[arg(long)]
    max_per_image: Option<usize>,

    /// Skip category filtering and split the whole dataset.
    #[arg(long)]
    no_filter: bool,

    /// Drop categories that were filtered out from the exported category table.
    #[arg(long)]
    prune_categories: bool,

    /// Share of images assigned to train.
    #[arg(long)]
    train_fraction: Option<f64>,

    /// Also produce a validation subset.
    #[arg(long)]
    validation: bool,

    /// Seed for a reproducible split.
    #[arg(long, env = "COCOCURATE_SEED")]
    seed: Option<u64>,

    /// Also write classes.js at the output root.
    #[arg(long)]
    classes_js: bool,

    /// Rewrite annotation categories before filtering (OLD=NEW, repeatable).
    #[arg(long)]
    relabel: Vec<String>,

    /// YAML recipe with defaults for the options above.
    #[arg(long, env = "COCOCURATE_CONFIG")]
    config: Option<PathBuf>,
}

/// Arguments for the merge subcommand.
#[derive(clap::Args)]
struct MergeArgs {
    /// First dataset root; its metadata is kept.
    first: PathBuf,

    /// Second dataset root.
    second: PathBuf,

    /// Output root; the result is written to <OUTPUT>/merged.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// How to combine the two category tables.
    #[arg(long, value_enum, default_value_t = CategoryPolicyArg::Strict)]
    category_policy: CategoryPolicyArg,

    /// Rename every image to <PREFIX>-<id>.<ext>.
    #[arg(long, value_name = "PREFIX")]
    rename: Option<String>,
}

/// Arguments for the label-map subcommand.
#[derive(clap::Args)]
struct LabelMapArgs {
    /// Dataset root or COCO JSON file.
    input: PathBuf,

    /// Write the pbtxt here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a classes.js module to this path.
    #[arg(long, value_name = "FILE")]
    classes_js: Option<PathBuf>,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Dataset root or COCO JSON file.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the stats subcommand.
#[derive(clap::Args)]
struct StatsArgs {
    /// Dataset root or COCO JSON file.
    input: PathBuf,

    /// Per-image, per-category count above which an image is an outlier.
    #[arg(long, default_value_t = filter::DEFAULT_MAX_ANNOTATIONS_PER_IMAGE)]
    max_per_image: usize,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Run the cococurate CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), CurateError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Split(args)) => run_split(args),
        Some(Commands::Merge(args)) => run_merge(args),
        Some(Commands::LabelMap(args)) => run_label_map(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Stats(args)) => run_stats(args),
        None => {
            println!("cococurate {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Curate COCO object detection datasets.");
            println!();
            println!("Run 'cococurate --help' for usage information.");
            Ok(())
        }
    }
}

/// Loads a dataset root, or a single COCO JSON file.
fn load_input(path: &Path) -> Result<Dataset, CurateError> {
    if path.is_dir() {
        ir::io_coco_json::load_dataset_dir(path)
    } else {
        ir::io_coco_json::read_coco_json(path)
    }
}

/// Warn about relational errors in loaded input without refusing it.
fn warn_if_inconsistent(path: &Path, dataset: &Dataset) {
    let report = validation::validate_dataset(dataset, &validation::ValidateOptions::default());
    if !report.is_ok() {
        warn!(
            "{} has {} validation error(s); run 'cococurate validate' for details",
            path.display(),
            report.error_count()
        );
    }
}

/// Execute the split subcommand.
fn run_split(args: SplitArgs) -> Result<(), CurateError> {
    let recipe = match &args.config {
        Some(path) => config::load_recipe(path)?,
        None => config::SplitRecipe::default(),
    };

    let mut dataset = ir::io_coco_json::load_dataset_dir(&args.input)?;
    warn_if_inconsistent(&args.input, &dataset);

    let relabel = if args.relabel.is_empty() {
        recipe.relabel_args()
    } else {
        args.relabel.clone()
    };
    if !relabel.is_empty() {
        let mapping = filter::parse_relabel_pairs(&relabel)?;
        dataset = filter::relabel_categories(&dataset, &mapping)?;
    }

    let apply_filter = !args.no_filter && recipe.filter.unwrap_or(true);
    if apply_filter {
        let selectors: Vec<String> = if !args.categories.is_empty() {
            args.categories.clone()
        } else if !recipe.categories.is_empty() {
            recipe.categories.iter().map(|c| c.to_arg()).collect()
        } else {
            vec![filter::DEFAULT_CATEGORY.to_string()]
        };
        let keep = filter::resolve_categories(&dataset, &selectors)?;
        let opts = filter::FilterOptions {
            keep,
            max_annotations_per_image: args
                .max_per_image
                .or(recipe.max_per_image)
                .unwrap_or(filter::DEFAULT_MAX_ANNOTATIONS_PER_IMAGE),
        };

        for outlier in filter::find_outliers(&dataset, &opts) {
            info!(
                "Dropping image {}: {} annotations of category {}",
                outlier.image_id, outlier.count, outlier.category_id
            );
        }
        dataset = filter::filter_categories(&dataset, &opts)?;
        if args.prune_categories {
            dataset = filter::restrict_category_table(&dataset, &opts.keep);
        }
    }

    let split_opts = split::SplitOptions {
        train_fraction: args
            .train_fraction
            .or(recipe.train_fraction)
            .unwrap_or(split::DEFAULT_TRAIN_FRACTION),
        include_validation: args.validation || recipe.validation.unwrap_or(false),
        seed: args.seed.or(recipe.seed),
    };
    let partition = split::split_dataset(&dataset, &split_opts)?;

    let out_root = args.output.clone().unwrap_or_else(|| args.input.clone());
    let export_opts = export::ExportOptions {
        classes_js: args.classes_js || recipe.classes_js.unwrap_or(false),
    };
    let summary = export::export_partition(&partition, &args.input, &out_root, &export_opts)?;

    for (subset, subset_dataset) in partition.subsets() {
        println!(
            "{:<10} {:>6} images {:>7} annotations",
            subset.name(),
            subset_dataset.images().len(),
            subset_dataset.annotations().len()
        );
    }
    println!(
        "Copied {} image(s) to {}",
        summary.images_copied,
        out_root.display()
    );
    Ok(())
}

/// Execute the merge subcommand.
fn run_merge(args: MergeArgs) -> Result<(), CurateError> {
    let first = ir::io_coco_json::load_dataset_dir(&args.first)?;
    let second = ir::io_coco_json::load_dataset_dir(&args.second)?;

    let mut merged = merge::merge_datasets(&first, &second, args.category_policy.into())?;
    if let Some(prefix) = &args.rename {
        merged = merged.rename_files(prefix);
    }

    let summary = export::export_merged(&merged, &args.first, &args.second, &args.output)?;
    println!(
        "Merged {} images and {} annotations into {}",
        merged.dataset.images().len(),
        merged.dataset.annotations().len(),
        args.output.join(export::MERGED_DIR).display()
    );
    info!("Copied {} image(s)", summary.images_copied);
    Ok(())
}

/// Execute the label-map subcommand.
fn run_label_map(args: LabelMapArgs) -> Result<(), CurateError> {
    let dataset = load_input(&args.input)?;

    match &args.output {
        Some(path) => {
            export::write_label_map(path, dataset.categories())?;
            println!("Wrote {}", path.display());
        }
        None => print!(
            "{}",
            labelmap::render_label_map(&labelmap::label_map(dataset.categories()))
        ),
    }

    if let Some(path) = &args.classes_js {
        export::write_classes_js(path, dataset.categories())?;
        if args.output.is_some() {
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), CurateError> {
    let dataset = load_input(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_dataset(&dataset, &opts);

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).map_err(|source| {
                CurateError::CocoJsonWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", report),
    }

    if report.blocking_count(args.strict) > 0 {
        Err(CurateError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the stats subcommand.
fn run_stats(args: StatsArgs) -> Result<(), CurateError> {
    let dataset = load_input(&args.input)?;

    let opts = stats::StatsOptions {
        outlier_threshold: args.max_per_image,
        ..Default::default()
    };
    let report = stats::stats_dataset(&dataset, &opts);

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).map_err(|source| {
                CurateError::CocoJsonWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", report),
    }
    Ok(())
}

