//! Split recipes.
//!
//! A recipe is a YAML file holding the parameters of a `split` run, so a
//! curated release can be reproduced exactly:
//!
//! ```yaml
//! categories: [ethernet_port, 3]
//! max_per_image: 30
//! train_fraction: 0.8
//! validation: true
//! seed: 42
//! relabel:
//!   5: 2
//! ```
//!
//! Every key is optional. Flags given on the command line win over the recipe.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::CurateError;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SplitRecipe {
    /// Categories to keep, by id or by name.
    #[serde(default)]
    pub categories: Vec<CategorySelector>,
    pub max_per_image: Option<usize>,
    /// Set to `false` to skip category filtering entirely.
    pub filter: Option<bool>,
    pub train_fraction: Option<f64>,
    pub validation: Option<bool>,
    pub seed: Option<u64>,
    pub classes_js: Option<bool>,
    /// Category relabelling applied before filtering, old id to new id.
    #[serde(default)]
    pub relabel: BTreeMap<u64, u64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CategorySelector {
    Id(u64),
    Name(String),
}

impl CategorySelector {
    /// The selector as typed on the command line.
    pub fn to_arg(&self) -> String {
        match self {
            CategorySelector::Id(id) => id.to_string(),
            CategorySelector::Name(name) => name.clone(),
        }
    }
}

impl SplitRecipe {
    /// Relabel pairs in `OLD=NEW` form.
    pub fn relabel_args(&self) -> Vec<String> {
        self.relabel
            .iter()
            .map(|(from, to)| format!("{}={}", from, to))
            .collect()
    }
}

/// Reads a recipe from a YAML file.
pub fn load_recipe(path: &Path) -> Result<SplitRecipe, CurateError> {
    if !path.is_file() {
        return Err(CurateError::SourceMissing {
            path: path.to_path_buf(),
        });
    }
    let data = fs::read_to_string(path)?;
    let recipe = parse_recipe(&data).map_err(|source| CurateError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded recipe {}: {:?}", path.display(), recipe);
    Ok(recipe)
}

/// Parses recipe YAML. An empty document is an empty recipe.
pub fn parse_recipe(data: &str) -> Result<SplitRecipe, serde_yaml::Error> {
    if data.trim().is_empty() {
        return Ok(SplitRecipe::default());
    }
    serde_yaml::from_str(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_recipe() {
        let recipe = parse_recipe(
            "categories: [ethernet_port, 3]\n\
             max_per_image: 12\n\
             filter: true\n\
             train_fraction: 0.75\n\
             validation: true\n\
             seed: 42\n\
             classes_js: false\n\
             relabel:\n  5: 2\n",
        )
        .expect("parse recipe");

        assert_eq!(
            recipe.categories,
            vec![
                CategorySelector::Name("ethernet_port".into()),
                CategorySelector::Id(3)
            ]
        );
        assert_eq!(recipe.max_per_image, Some(12));
        assert_eq!(recipe.train_fraction, Some(0.75));
        assert_eq!(recipe.seed, Some(42));
        assert_eq!(recipe.relabel_args(), vec!["5=2".to_string()]);
        assert_eq!(
            recipe.categories.iter().map(|c| c.to_arg()).collect::<Vec<_>>(),
            vec!["ethernet_port", "3"]
        );
    }

    #[test]
    fn empty_recipe_is_default() {
        assert_eq!(parse_recipe("").expect("parse"), SplitRecipe::default());
        assert_eq!(
            parse_recipe("seed: 1\n").expect("parse").max_per_image,
            None
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_recipe("seeed: 1\n").is_err());
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recipe.yaml");
        fs::write(&path, "train_fraction: [oops\n").expect("write");

        let err = load_recipe(&path).unwrap_err();
        assert!(matches!(err, CurateError::ConfigParse { path: p, .. } if p == path));
        assert!(matches!(
            load_recipe(&dir.path().join("missing.yaml")),
            Err(CurateError::SourceMissing { .. })
        ));
    }
}
