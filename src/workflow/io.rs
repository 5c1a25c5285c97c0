use std::fs;
use std::path::Path;

use serde::Serialize;

use super::{Result, SegmentationRecipe};

fn is_yaml(path: &Path) -> bool {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    matches!(extension.as_str(), "yaml" | "yml")
}

pub fn load_recipe(path: impl AsRef<Path>) -> Result<SegmentationRecipe> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let recipe = if is_yaml(path) {
        serde_yaml::from_str::<SegmentationRecipe>(&raw)?
    } else {
        serde_json::from_str::<SegmentationRecipe>(&raw)?
    };
    recipe.validate()?;
    Ok(recipe)
}

/// Writes any report as YAML (`.yaml`/`.yml`) or pretty JSON.
pub fn save_report<R: Serialize>(path: impl AsRef<Path>, report: &R) -> Result<()> {
    let path = path.as_ref();
    let serialized = if is_yaml(path) {
        serde_yaml::to_string(report)?
    } else {
        serde_json::to_string_pretty(report)?
    };
    fs::write(path, serialized)?;
    Ok(())
}
