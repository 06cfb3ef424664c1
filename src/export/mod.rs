//! Writing curated datasets to disk.
//!
//! Split output:
//!
//! ```text
//! <out>/images/{train,test,validation}/<file_name>
//! <out>/annotations/{train,test,validation}_instances.json
//! <out>/annotations/label_map.pbtxt
//! <out>/classes.js                      (optional)
//! ```
//!
//! Merge output goes to `<out>/merged/` in the same layout as an input
//! dataset, so it can be fed straight back into `split`.
//!
//! Image directories are removed and recreated on every run. A missing or
//! unreadable source image does not abort the export: every other file is
//! still copied and every document still written, then the call fails with
//! [`CurateError::ExportIncomplete`] listing what was skipped.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::CurateError;
use crate::ir::io_coco_json::{images_dir, instances_path, write_coco_json, ANNOTATIONS_DIR};
use crate::ir::{Category, Dataset};
use crate::labelmap::{class_export, label_map, render_classes_js, render_label_map};
use crate::merge::{MergeInput, Merged};
use crate::split::Partition;

/// Directory under the output root that receives merge results.
pub const MERGED_DIR: &str = "merged";
pub const LABEL_MAP_FILE: &str = "label_map.pbtxt";
pub const CLASSES_JS_FILE: &str = "classes.js";

/// An image file that could not be copied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyFailure {
    /// The image's `file_name`.
    pub file_name: String,
    /// Where the file was expected.
    pub source: PathBuf,
    pub message: String,
}

impl fmt::Display for CopyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.file_name, self.source.display(), self.message)
    }
}

/// Options for split export.
#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    /// Also write `classes.js` at the output root.
    pub classes_js: bool,
}

/// What an export wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub images_copied: usize,
    /// Every non-image file written, in write order.
    pub documents: Vec<PathBuf>,
}

/// Lists image files under `dir` as `/`-separated paths relative to `dir`.
///
/// A missing directory yields an empty set.
pub fn scan_images(dir: &Path) -> Result<BTreeSet<String>, CurateError> {
    let mut files = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(files);
    }

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            let key: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.insert(key.join("/"));
        }
    }

    Ok(files)
}

/// File names referenced by `dataset` that are absent from `available`.
pub fn missing_files(dataset: &Dataset, available: &BTreeSet<String>) -> Vec<String> {
    dataset
        .images()
        .iter()
        .filter(|image| !available.contains(&image.file_name))
        .map(|image| image.file_name.clone())
        .collect()
}

/// Write every subset of `partition` under `out_root`.
///
/// Image files are read from `<source_root>/images/`.
pub fn export_partition(
    partition: &Partition,
    source_root: &Path,
    out_root: &Path,
    opts: &ExportOptions,
) -> Result<ExportSummary, CurateError> {
    let source_images = images_dir(source_root);
    let available = scan_images(&source_images)?;

    let mut summary = ExportSummary::default();
    let mut failures = Vec::new();
    let annotations_dir = out_root.join(ANNOTATIONS_DIR);

    for (subset, dataset) in partition.subsets() {
        let missing = missing_files(dataset, &available);
        if !missing.is_empty() {
            warn!(
                "{} of {} {} image(s) are not in {}",
                missing.len(),
                dataset.images().len(),
                subset,
                source_images.display()
            );
        }

        let dest = images_dir(out_root).join(subset.name());
        reset_dir(&dest)?;

        let copies = dataset
            .images()
            .iter()
            .map(|image| {
                let name = image.file_name.as_str();
                (name, source_images.as_path(), name)
            });
        summary.images_copied += copy_images(copies, &dest, &mut failures)?;

        let json_path = annotations_dir.join(format!("{}_instances.json", subset.name()));
        write_coco_json(&json_path, dataset)?;
        info!(
            "Wrote {} ({} images, {} annotations)",
            json_path.display(),
            dataset.images().len(),
            dataset.annotations().len()
        );
        summary.documents.push(json_path);
    }

    let categories = partition.train.categories();
    let label_map_path = annotations_dir.join(LABEL_MAP_FILE);
    write_label_map(&label_map_path, categories)?;
    summary.documents.push(label_map_path);

    if opts.classes_js {
        let classes_path = out_root.join(CLASSES_JS_FILE);
        write_classes_js(&classes_path, categories)?;
        summary.documents.push(classes_path);
    }

    finish(summary, failures)
}

/// Write a merged dataset to `<out_root>/merged/`.
///
/// Each image is copied from the `images/` directory of the input it came
/// from. Fails before writing anything if two merged images share a file
/// name; rename them first with [`Merged::rename_files`].
pub fn export_merged(
    merged: &Merged,
    first_root: &Path,
    second_root: &Path,
    out_root: &Path,
) -> Result<ExportSummary, CurateError> {
    let collisions = merged.file_name_collisions();
    if !collisions.is_empty() {
        return Err(CurateError::FileNameCollision {
            file_names: collisions,
        });
    }

    let root = out_root.join(MERGED_DIR);
    let dest = images_dir(&root);
    reset_dir(&dest)?;

    let first_images = images_dir(first_root);
    let second_images = images_dir(second_root);
    let copies = merged
        .dataset
        .images()
        .iter()
        .zip(&merged.sources)
        .map(|(image, source)| {
            let dir = match source.input {
                MergeInput::First => &first_images,
                MergeInput::Second => &second_images,
            };
            (
                image.file_name.as_str(),
                dir.as_path(),
                source.original_file_name.as_str(),
            )
        });

    let mut failures = Vec::new();
    let mut summary = ExportSummary {
        images_copied: copy_images(copies, &dest, &mut failures)?,
        documents: Vec::new(),
    };

    let json_path = instances_path(&root);
    write_coco_json(&json_path, &merged.dataset)?;
    info!(
        "Wrote {} ({} images, {} annotations)",
        json_path.display(),
        merged.dataset.images().len(),
        merged.dataset.annotations().len()
    );
    summary.documents.push(json_path);

    finish(summary, failures)
}

/// Write `label_map.pbtxt` for `categories`.
pub fn write_label_map(path: &Path, categories: &[Category]) -> Result<(), CurateError> {
    write_text(path, &render_label_map(&label_map(categories)))
}

/// Write `classes.js` for `categories`, with the background slot prepended.
pub fn write_classes_js(path: &Path, categories: &[Category]) -> Result<(), CurateError> {
    write_text(path, &render_classes_js(&class_export(categories)))
}

fn write_text(path: &Path, contents: &str) -> Result<(), CurateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn reset_dir(path: &Path) -> Result<(), CurateError> {
    if path.exists() {
        debug!("Removing existing directory {}", path.display());
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Copies `(file_name, source_dir, source_name)` entries into `dest`,
/// recording failures.
///
/// Names that are not plain relative paths are recorded as failures and
/// never touched. Failing to create a destination directory is an I/O error
/// for the whole export.
fn copy_images<'a>(
    copies: impl Iterator<Item = (&'a str, &'a Path, &'a str)>,
    dest: &Path,
    failures: &mut Vec<CopyFailure>,
) -> Result<usize, CurateError> {
    let mut copied = 0;
    for (file_name, source_dir, source_name) in copies {
        let source = source_dir.join(source_name);
        if let Some(bad) = [file_name, source_name]
            .into_iter()
            .find(|name| !is_plain_relative(name))
        {
            warn!("Skipping {}: not a relative file name", bad);
            failures.push(CopyFailure {
                file_name: file_name.to_string(),
                source,
                message: format!("'{}' is not a relative file name", bad),
            });
            continue;
        }

        let target = dest.join(file_name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::copy(&source, &target) {
            Ok(_) => copied += 1,
            Err(err) => {
                warn!("Skipping {}: {}", source.display(), err);
                failures.push(CopyFailure {
                    file_name: file_name.to_string(),
                    source,
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(copied)
}

/// True for non-empty paths made only of normal components.
fn is_plain_relative(name: &str) -> bool {
    let path = Path::new(name);
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

fn finish(summary: ExportSummary, failures: Vec<CopyFailure>) -> Result<ExportSummary, CurateError> {
    if failures.is_empty() {
        Ok(summary)
    } else {
        Err(CurateError::ExportIncomplete { failures })
    }
}
