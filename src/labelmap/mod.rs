//! Label maps for downstream detectors.
//!
//! Two artifacts are derived from a category table:
//! - a TensorFlow Object Detection API `label_map.pbtxt`
//! - a JavaScript `CLASSES` table for in-browser inference, indexed by model
//!   output slot, where slot 0 is a synthetic background class
//!
//! Neither touches the dataset's own category list.

use std::fmt::Write as _;

use crate::ir::{Category, CategoryId};

/// Name and id of the synthetic class placed in slot 0 of class exports.
pub const BACKGROUND_NAME: &str = "background";
pub const BACKGROUND_ID: u64 = 1;

/// One `item { ... }` block of a label map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMapEntry {
    pub id: CategoryId,
    pub name: String,
    pub display_name: String,
}

/// Label map entries in category order.
pub fn label_map(categories: &[Category]) -> Vec<LabelMapEntry> {
    categories
        .iter()
        .map(|category| LabelMapEntry {
            id: category.id,
            name: category.name.clone(),
            display_name: category.name.clone(),
        })
        .collect()
}

/// Render entries in protobuf text format.
pub fn render_label_map(entries: &[LabelMapEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        writeln!(out, "item {{").expect("write to string");
        writeln!(out, "  id: {}", entry.id).expect("write to string");
        writeln!(out, "  name: \"{}\"", escape(&entry.name)).expect("write to string");
        writeln!(out, "  display_name: \"{}\"", escape(&entry.display_name))
            .expect("write to string");
        writeln!(out, "}}").expect("write to string");
    }
    out
}

/// Categories prefixed with the background class, for class exports.
///
/// Returns a new list; the input is left as-is.
pub fn class_export(categories: &[Category]) -> Vec<Category> {
    let mut classes = Vec::with_capacity(categories.len() + 1);
    classes.push(Category::new(BACKGROUND_ID, BACKGROUND_NAME));
    classes.extend(categories.iter().cloned());
    classes
}

/// Render a JavaScript module exporting `CLASSES`, keyed by list position.
///
/// Pass the output of [`class_export`] to get the background slot.
pub fn render_classes_js(classes: &[Category]) -> String {
    let mut out = String::from("export const CLASSES = {\n");
    for (slot, class) in classes.iter().enumerate() {
        let name = escape(&class.name);
        writeln!(out, "\t{}: {{", slot).expect("write to string");
        writeln!(out, "\t\tname: \"{}\",", name).expect("write to string");
        writeln!(out, "\t\tid: {},", class.id).expect("write to string");
        writeln!(out, "\t\tdisplayName: \"{}\",", name).expect("write to string");
        writeln!(out, "\t}},").expect("write to string");
    }
    out.push_str("}\n");
    out
}

/// Escapes a value for a double-quoted pbtxt or JS string.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
