use std::fs::File;
use std::path::Path;

use crate::model::{Dataset, DatasetF32, LabelDataset, Metadata, PixelType};
use ndarray::{Array, ArrayD, IxDyn};
use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{Rational, TiffEncoder, TiffValue, colortype};
use tiff::tags::Tag;

use super::layout::{Hyperstack, page_order};
use super::util::metadata_for_dims;
use super::{IoError, Result, StackLayout};

/// Reads every page of a grayscale TIFF into a `[T, C, Z, Y, X]` dataset
/// (extents of 1 are dropped). Samples keep their stored values.
pub(crate) fn read_tiff(path: &Path, layout: &StackLayout) -> Result<DatasetF32> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(file)?;
    let (width, height) = decoder.dimensions()?;
    let description = decoder.get_tag_ascii_string(Tag::ImageDescription).ok();
    let pixel_size = pixel_size(&mut decoder, Tag::XResolution)
        .zip(pixel_size(&mut decoder, Tag::YResolution));
    let mut pages = Vec::new();
    let mut pixel_type = PixelType::F32;

    loop {
        let page = decode_tiff_page(&mut decoder, &mut pixel_type, width, height)?;
        pages.push(page);
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
        let (other_width, other_height) = decoder.dimensions()?;
        if other_width != width || other_height != height {
            return Err(IoError::UnsupportedLayout(
                "TIFF pages must have identical dimensions".into(),
            ));
        }
    }

    let mut stack = layout.resolve(pages.len(), description.as_deref())?;
    stack.calibrate_plane(pixel_size);
    let (height, width) = (height as usize, width as usize);
    let plane = height * width;
    let mut values = vec![0.0_f32; plane * pages.len()];
    for (page_index, page) in pages.iter().enumerate() {
        let start = stack.array_page(page_index) * plane;
        values[start..start + plane].copy_from_slice(page);
    }

    let dims = stack.dims(height, width);
    let shape = dims.iter().map(|dim| dim.size).collect::<Vec<_>>();
    let data = Array::from_shape_vec(IxDyn(&shape), values).map_err(|error| {
        IoError::UnsupportedLayout(format!("cannot arrange TIFF pages: {error}"))
    })?;
    tracing::debug!(
        path = %path.display(),
        channels = stack.channels,
        slices = stack.slices,
        frames = stack.frames,
        pixel_size = ?stack.pixel_size,
        "read TIFF stack"
    );

    let metadata = metadata_for_dims(path, dims, pixel_type);
    Ok(Dataset::new(data, metadata)?)
}

/// Physical pixel size from a resolution tag, which stores pixels per unit.
fn pixel_size(decoder: &mut Decoder<File>, tag: Tag) -> Option<f32> {
    match decoder.find_tag(tag).ok().flatten()? {
        Value::Rational(pixels, units) if pixels > 0 && units > 0 => {
            Some((f64::from(units) / f64::from(pixels)) as f32)
        }
        Value::Float(pixels) if pixels > 0.0 => Some(pixels.recip()),
        _ => None,
    }
}

/// Pixels per unit as a rational with a fixed denominator.
fn resolution(pixel_size: f32) -> Rational {
    const UNITS: u32 = 1_000_000;
    let pixels = (f64::from(UNITS) / f64::from(pixel_size))
        .round()
        .clamp(1.0, f64::from(u32::MAX)) as u32;
    Rational { n: pixels, d: UNITS }
}

fn decode_tiff_page(
    decoder: &mut Decoder<File>,
    pixel_type: &mut PixelType,
    width: u32,
    height: u32,
) -> Result<Vec<f32>> {
    let (values, page_type) = match decoder.read_image()? {
        DecodingResult::U8(buffer) => (
            buffer.into_iter().map(f32::from).collect::<Vec<_>>(),
            PixelType::U8,
        ),
        DecodingResult::U16(buffer) => (
            buffer.into_iter().map(f32::from).collect::<Vec<_>>(),
            PixelType::U16,
        ),
        DecodingResult::U32(buffer) => (
            buffer.into_iter().map(|value| value as f32).collect::<Vec<_>>(),
            PixelType::U32,
        ),
        DecodingResult::F32(buffer) => (buffer, PixelType::F32),
        other => {
            return Err(IoError::UnsupportedLayout(format!(
                "unsupported TIFF sample type: {other:?}"
            )));
        }
    };
    if values.len() != width as usize * height as usize {
        return Err(IoError::UnsupportedLayout(
            "TIFF RGB/alpha pages are not supported".into(),
        ));
    }
    *pixel_type = page_type;
    Ok(values)
}

/// Writes intensities as 32-bit float pages.
pub(crate) fn write_tiff(path: &Path, dataset: &DatasetF32) -> Result<()> {
    let (width, height, samples, stack) = hyperstack_pages(&dataset.data, &dataset.metadata)?;
    write_pages::<colortype::Gray32Float>(path, width, height, &samples, &stack)
}

/// Writes labels as unsigned 32-bit pages, so every label value survives.
pub(crate) fn write_label_tiff(path: &Path, labels: &LabelDataset) -> Result<()> {
    let (width, height, samples, stack) = hyperstack_pages(&labels.data, &labels.metadata)?;
    write_pages::<colortype::Gray32>(path, width, height, &samples, &stack)
}

fn hyperstack_pages<T: Copy>(
    data: &ArrayD<T>,
    metadata: &Metadata,
) -> Result<(u32, u32, Vec<T>, Hyperstack)> {
    metadata.validate_shape(data.shape())?;
    let (permutation, stack) = page_order(metadata)?;
    let rank = data.ndim();
    let height = data.shape()[rank - 2] as u32;
    let width = data.shape()[rank - 1] as u32;
    let samples = data
        .view()
        .permuted_axes(IxDyn(&permutation))
        .iter()
        .copied()
        .collect::<Vec<_>>();
    Ok((width, height, samples, stack))
}

fn write_pages<C>(
    path: &Path,
    width: u32,
    height: u32,
    samples: &[C::Inner],
    stack: &Hyperstack,
) -> Result<()>
where
    C: colortype::ColorType,
    [C::Inner]: TiffValue,
{
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(file)?;
    let plane = width as usize * height as usize;
    let description = stack.imagej_description();
    for (index, page) in samples.chunks(plane).enumerate() {
        let mut image = encoder.new_image::<C>(width, height)?;
        if index == 0 {
            image
                .encoder()
                .write_tag(Tag::ImageDescription, description.as_str())?;
        }
        if let Some((size_x, size_y)) = stack.pixel_size {
            image
                .encoder()
                .write_tag(Tag::XResolution, resolution(size_x))?;
            image
                .encoder()
                .write_tag(Tag::YResolution, resolution(size_y))?;
        }
        image.write_data(page)?;
    }
    Ok(())
}
