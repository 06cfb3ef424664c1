//! Stats report types and terminal formatting.

use serde::Serialize;
use std::fmt;

/// The result of computing dataset statistics.
#[derive(Clone, Debug, Serialize)]
pub struct StatsReport {
    pub summary: SummarySection,
    /// One entry per category, in category-table order.
    pub categories: Vec<CategoryStats>,
    pub annotation_density: AnnotationDensityStats,
    /// Display-only option for histogram rendering width.
    #[serde(skip)]
    pub(crate) bar_width: usize,
}

/// Summary counts for the dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SummarySection {
    pub images: usize,
    pub categories: usize,
    pub annotations: usize,
    pub licenses: usize,
    /// Number of images that have at least one annotation.
    pub annotated_images: usize,
    /// Annotations whose category is not in the category table.
    pub uncategorized_annotations: usize,
}

/// Counts for one category.
#[derive(Clone, Debug, Serialize)]
pub struct CategoryStats {
    pub id: u64,
    pub name: String,
    pub annotations: usize,
    /// Images with at least one annotation of this category.
    pub images: usize,
    /// Largest number of annotations of this category on a single image.
    pub max_per_image: usize,
    /// Images whose count for this category exceeds the outlier threshold.
    pub outlier_images: usize,
}

/// Annotation density statistics.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AnnotationDensityStats {
    pub min_per_image: usize,
    pub max_per_image: usize,
    pub mean_per_image: f64,
    pub zero_annotation_images: usize,
    /// Threshold used for `CategoryStats::outlier_images`.
    pub outlier_threshold: usize,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_summary(f)?;
        writeln!(f)?;
        self.fmt_categories(f)?;
        writeln!(f)?;
        self.fmt_annotation_density(f)
    }
}

impl StatsReport {
    fn fmt_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;

        writeln!(f, "┌─ Summary")?;
        writeln!(f, "│   Images:        {:>8}", format_number(s.images))?;
        writeln!(f, "│   Categories:    {:>8}", format_number(s.categories))?;
        writeln!(f, "│   Annotations:   {:>8}", format_number(s.annotations))?;
        if s.licenses > 0 {
            writeln!(f, "│   Licenses:      {:>8}", format_number(s.licenses))?;
        }
        writeln!(
            f,
            "│   Annotated:     {:>8} of {} ({})",
            format_number(s.annotated_images),
            format_number(s.images),
            fmt_percent(s.annotated_images, s.images)
        )?;
        if s.uncategorized_annotations > 0 {
            writeln!(
                f,
                "│   Uncategorized: {:>8}",
                format_number(s.uncategorized_annotations)
            )?;
        }
        writeln!(f, "└─")
    }

    fn fmt_categories(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "┌─ Categories ({})", self.categories.len())?;

        if self.categories.is_empty() {
            writeln!(f, "│   No categories defined.")?;
            return writeln!(f, "└─");
        }

        writeln!(
            f,
            "│   {:>4}  {:<16} {:>7} {:>6}  {:<w$}  {:>7} {:>8}",
            "id",
            "name",
            "anns",
            "share",
            "",
            "max/img",
            "outliers",
            w = self.bar_width
        )?;

        let total: usize = self.categories.iter().map(|c| c.annotations).sum();
        let max_count = self
            .categories
            .iter()
            .map(|c| c.annotations)
            .max()
            .unwrap_or(0);

        for category in &self.categories {
            writeln!(
                f,
                "│   {:>4}  {:<16} {:>7} {:>6}  {}  {:>7} {:>8}",
                category.id,
                truncate_label(&category.name, 16),
                format_number(category.annotations),
                fmt_percent(category.annotations, total),
                render_bar(category.annotations, max_count, self.bar_width),
                category.max_per_image,
                category.outlier_images
            )?;
        }
        writeln!(f, "└─")
    }

    fn fmt_annotation_density(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.annotation_density;

        writeln!(f, "┌─ Annotation Density")?;
        writeln!(
            f,
            "│   Per image:  min {}  max {}  mean {:.2}",
            d.min_per_image, d.max_per_image, d.mean_per_image
        )?;
        writeln!(
            f,
            "│   Images without annotations: {}",
            format_number(d.zero_annotation_images)
        )?;
        writeln!(
            f,
            "│   Outlier threshold: more than {} per category per image",
            d.outlier_threshold
        )?;
        writeln!(f, "└─")
    }
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a percentage, handling zero denominators.
fn fmt_percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", (numerator as f64 / denominator as f64) * 100.0)
    }
}

/// Render a horizontal bar using Unicode block characters.
fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return " ".repeat(width);
    }

    let filled = ((count * width) / max_count).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

/// Truncate a label to fit in the display column.
fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else {
        let kept: String = label.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
