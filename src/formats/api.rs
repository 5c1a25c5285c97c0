use std::path::Path;

use crate::model::{DatasetF32, LabelDataset};

use super::raster::{read_common_raster, write_common_raster, write_label_png};
use super::tiff::{read_tiff, write_label_tiff, write_tiff};
use super::util::extension;
use super::{IoError, Result, StackLayout};

/// Reads an image. `layout` only applies to TIFF stacks.
pub fn read_dataset(path: impl AsRef<Path>, layout: &StackLayout) -> Result<DatasetF32> {
    let path = path.as_ref();
    let extension = extension(path)?;
    match extension.as_str() {
        "png" | "jpg" | "jpeg" => read_common_raster(path),
        "tif" | "tiff" => read_tiff(path, layout),
        other => Err(IoError::UnsupportedFormat(other.to_string())),
    }
}

pub fn write_dataset(path: impl AsRef<Path>, dataset: &DatasetF32) -> Result<()> {
    let path = path.as_ref();
    let extension = extension(path)?;
    match extension.as_str() {
        "png" | "jpg" | "jpeg" => write_common_raster(path, dataset),
        "tif" | "tiff" => write_tiff(path, dataset),
        other => Err(IoError::UnsupportedFormat(other.to_string())),
    }
}

/// Writes instance labels: 32-bit TIFF stacks, or 16-bit PNG for single
/// planes.
pub fn write_labels(path: impl AsRef<Path>, labels: &LabelDataset) -> Result<()> {
    let path = path.as_ref();
    let extension = extension(path)?;
    match extension.as_str() {
        "png" => write_label_png(path, labels),
        "tif" | "tiff" => write_label_tiff(path, labels),
        other => Err(IoError::UnsupportedFormat(other.to_string())),
    }
}

pub fn supported_formats() -> &'static [&'static str] {
    &["png", "jpg", "jpeg", "tif", "tiff"]
}

pub fn supported_label_formats() -> &'static [&'static str] {
    &["png", "tif", "tiff"]
}
