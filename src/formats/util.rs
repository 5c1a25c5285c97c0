use std::path::Path;

use crate::model::{Dim, Metadata, PixelType};

use super::{IoError, Result};

pub(crate) fn extension(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .ok_or_else(|| IoError::UnsupportedFormat(path.to_string_lossy().to_string()))?;
    Ok(ext)
}

pub(crate) fn metadata_for_dims(path: &Path, dims: Vec<Dim>, pixel_type: PixelType) -> Metadata {
    Metadata {
        dims,
        pixel_type,
        source: Some(path.to_path_buf()),
        ..Metadata::default()
    }
}

/// Stretches `values` onto 0..=255. A constant image maps to 0.
pub(crate) fn scale_to_u8(values: &[f32]) -> Vec<u8> {
    let (min, max) = min_max(values);
    let span = max - min;
    values
        .iter()
        .map(|value| {
            let normalized = if span.abs() < f32::EPSILON {
                0.0
            } else {
                (*value - min) / span
            };
            (normalized.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect()
}

pub(crate) fn min_max(values: &[f32]) -> (f32, f32) {
    let mut iter = values.iter().copied();
    let first = iter.next().unwrap_or(0.0);
    let mut min = first;
    let mut max = first;
    for value in iter {
        if value < min {
            min = value;
        }
        if value > max {
            max = value;
        }
    }
    (min, max)
}
