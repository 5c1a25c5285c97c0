use std::path::Path;

use crate::model::{AxisKind, Dataset, DatasetF32, Dim, LabelDataset, PixelType};
use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use ndarray::{Array, IxDyn};

use super::util::{metadata_for_dims, scale_to_u8};
use super::{IoError, Result};

/// Decodes PNG/JPEG into `[Y, X]` for gray images and `[Y, X, C]` for
/// color. Samples keep their stored values.
pub(crate) fn read_common_raster(path: &Path) -> Result<DatasetF32> {
    let image = image::open(path)?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    match image {
        DynamicImage::ImageLuma8(buffer) => {
            let values = buffer.into_raw().into_iter().map(f32::from).collect();
            gray_dataset(path, height, width, values, PixelType::U8)
        }
        DynamicImage::ImageLuma16(buffer) => {
            let values = buffer.into_raw().into_iter().map(f32::from).collect();
            gray_dataset(path, height, width, values, PixelType::U16)
        }
        DynamicImage::ImageRgb16(buffer) => {
            let values = buffer.into_raw().into_iter().map(f32::from).collect();
            rgb_dataset(path, height, width, values, PixelType::U16)
        }
        other => {
            let values = other.to_rgb8().into_raw().into_iter().map(f32::from).collect();
            rgb_dataset(path, height, width, values, PixelType::U8)
        }
    }
}

fn gray_dataset(
    path: &Path,
    height: usize,
    width: usize,
    values: Vec<f32>,
    pixel_type: PixelType,
) -> Result<DatasetF32> {
    let data = Array::from_shape_vec((height, width), values)
        .map_err(|error| IoError::UnsupportedLayout(error.to_string()))?
        .into_dyn();
    let metadata = metadata_for_dims(
        path,
        vec![Dim::new(AxisKind::Y, height), Dim::new(AxisKind::X, width)],
        pixel_type,
    );
    Ok(Dataset::new(data, metadata)?)
}

fn rgb_dataset(
    path: &Path,
    height: usize,
    width: usize,
    values: Vec<f32>,
    pixel_type: PixelType,
) -> Result<DatasetF32> {
    let data = Array::from_shape_vec((height, width, 3usize), values)
        .map_err(|error| IoError::UnsupportedLayout(error.to_string()))?
        .into_dyn();
    let mut metadata = metadata_for_dims(
        path,
        vec![
            Dim::new(AxisKind::Y, height),
            Dim::new(AxisKind::X, width),
            Dim::new(AxisKind::Channel, 3),
        ],
        pixel_type,
    );
    metadata.channel_names = vec!["R".into(), "G".into(), "B".into()];
    Ok(Dataset::new(data, metadata)?)
}

/// Writes a `[Y, X]` (or single-channel `[Y, X, 1]`) intensity image as
/// 8-bit gray, stretching the value range onto 0..=255.
pub(crate) fn write_common_raster(path: &Path, dataset: &DatasetF32) -> Result<()> {
    let shape = dataset.shape();
    let plane = match shape {
        [height, width] | [height, width, 1] => (*height, *width),
        [height, width, 3] => {
            let (height, width) = (*height, *width);
            let mut bytes = Vec::with_capacity(height * width * 3);
            for y in 0..height {
                for x in 0..width {
                    for channel in 0..3 {
                        let value = dataset.data[IxDyn(&[y, x, channel])];
                        bytes.push(value.clamp(0.0, 255.0).round() as u8);
                    }
                }
            }
            let image = ImageBuffer::<Rgb<u8>, _>::from_vec(width as u32, height as u32, bytes)
                .ok_or_else(|| IoError::UnsupportedLayout("failed to construct RGB image".into()))?;
            image.save(path)?;
            return Ok(());
        }
        _ => {
            return Err(IoError::UnsupportedLayout(format!(
                "raster write expects [Y, X] or [Y, X, C], found shape {shape:?}"
            )));
        }
    };

    let (height, width) = plane;
    let values = dataset.data.iter().copied().collect::<Vec<_>>();
    let bytes = scale_to_u8(&values);
    let image = ImageBuffer::<Luma<u8>, _>::from_vec(width as u32, height as u32, bytes)
        .ok_or_else(|| IoError::UnsupportedLayout("failed to construct gray image".into()))?;
    image.save(path)?;
    Ok(())
}

/// Writes a 2-D label image as 16-bit gray PNG. Label values above
/// `u16::MAX` cannot be represented and are rejected.
pub(crate) fn write_label_png(path: &Path, labels: &LabelDataset) -> Result<()> {
    let [height, width] = labels.shape() else {
        return Err(IoError::UnsupportedLayout(format!(
            "PNG labels must be 2-D, found shape {:?}; use TIFF for stacks",
            labels.shape()
        )));
    };
    let max_label = labels.max_label();
    if max_label > u32::from(u16::MAX) {
        return Err(IoError::UnsupportedLayout(format!(
            "label {max_label} does not fit a 16-bit PNG; use TIFF"
        )));
    }
    let samples = labels
        .data
        .iter()
        .map(|label| *label as u16)
        .collect::<Vec<_>>();
    let image = ImageBuffer::<Luma<u16>, _>::from_vec(*width as u32, *height as u32, samples)
        .ok_or_else(|| IoError::UnsupportedLayout("failed to construct label image".into()))?;
    image.save(path)?;
    Ok(())
}
