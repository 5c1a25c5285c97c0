use serde::{Deserialize, Serialize};

use crate::model::{AxisKind, Dim, Metadata};

use super::{IoError, Result};

/// Channel and frame counts of a multi-page TIFF.
///
/// Pages are ordered the way ImageJ writes hyperstacks: channel fastest,
/// then Z, then time. Counts left as `None` are taken from the ImageJ
/// description when the file carries one and default to 1 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackLayout {
    pub channels: Option<usize>,
    pub frames: Option<usize>,
}

impl StackLayout {
    pub fn new(channels: Option<usize>, frames: Option<usize>) -> Self {
        Self { channels, frames }
    }

    pub(crate) fn resolve(&self, pages: usize, description: Option<&str>) -> Result<Hyperstack> {
        let described = description.map(ImageJDescription::parse).unwrap_or_default();
        let channels = self.channels.or(described.channels).unwrap_or(1);
        let frames = self.frames.or(described.frames).unwrap_or(1);
        if channels == 0 || frames == 0 {
            return Err(IoError::UnsupportedLayout(format!(
                "channel and frame counts must be >= 1, got channels={channels}, frames={frames}"
            )));
        }
        let planes_per_slice = channels.checked_mul(frames).ok_or_else(|| {
            IoError::UnsupportedLayout(format!(
                "channel and frame counts overflow: channels={channels}, frames={frames}"
            ))
        })?;
        if pages % planes_per_slice != 0 {
            return Err(IoError::UnsupportedLayout(format!(
                "{pages} pages cannot be split into {channels} channels x {frames} frames"
            )));
        }
        Ok(Hyperstack {
            channels,
            slices: pages / planes_per_slice,
            frames,
            z_spacing: described.spacing,
            pixel_size: None,
            unit: described.unit,
        })
    }
}

/// Extents of a hyperstack besides the image plane.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Hyperstack {
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
    pub z_spacing: Option<f32>,
    /// Physical `(x, y)` size of one pixel.
    pub pixel_size: Option<(f32, f32)>,
    pub unit: Option<String>,
}

impl Hyperstack {
    /// Dimensions in `[T, C, Z, Y, X]` order, leaving out extents of 1.
    pub fn dims(&self, height: usize, width: usize) -> Vec<Dim> {
        let mut dims = Vec::with_capacity(5);
        if self.frames > 1 {
            dims.push(Dim::new(AxisKind::Time, self.frames));
        }
        if self.channels > 1 {
            dims.push(Dim::new(AxisKind::Channel, self.channels));
        }
        if self.slices > 1 {
            let mut z = Dim::new(AxisKind::Z, self.slices);
            z.spacing = self.z_spacing;
            z.unit = self.unit.clone();
            dims.push(z);
        }
        let mut y = Dim::new(AxisKind::Y, height);
        let mut x = Dim::new(AxisKind::X, width);
        if let Some((size_x, size_y)) = self.pixel_size {
            x.spacing = Some(size_x);
            y.spacing = Some(size_y);
            x.unit = self.unit.clone();
            y.unit = self.unit.clone();
        }
        dims.push(y);
        dims.push(x);
        dims
    }

    /// Accepts `(x, y)` pixel sizes read from the resolution tags. A 1/1
    /// resolution without a unit is what uncalibrated writers store, so it
    /// is ignored.
    pub fn calibrate_plane(&mut self, pixel_size: Option<(f32, f32)>) {
        self.pixel_size = pixel_size.filter(|(x, y)| {
            x.is_finite()
                && y.is_finite()
                && *x > 0.0
                && *y > 0.0
                && (*x != 1.0 || *y != 1.0 || self.unit.is_some())
        });
    }

    /// Position of page `page` (file order) within `[T, C, Z]` order.
    pub fn array_page(&self, page: usize) -> usize {
        let channel = page % self.channels;
        let slice = (page / self.channels) % self.slices;
        let frame = page / (self.channels * self.slices);
        (frame * self.channels + channel) * self.slices + slice
    }

    pub fn pages(&self) -> usize {
        self.channels * self.slices * self.frames
    }

    pub fn imagej_description(&self) -> String {
        let mut text = format!("ImageJ=1.54f\nimages={}\n", self.pages());
        if self.channels > 1 {
            text.push_str(&format!("channels={}\n", self.channels));
        }
        if self.slices > 1 {
            text.push_str(&format!("slices={}\n", self.slices));
        }
        if self.frames > 1 {
            text.push_str(&format!("frames={}\n", self.frames));
        }
        if [self.channels, self.slices, self.frames]
            .iter()
            .filter(|extent| **extent > 1)
            .count()
            > 1
        {
            text.push_str("hyperstack=true\n");
        }
        if let Some(unit) = &self.unit {
            text.push_str(&format!("unit={unit}\n"));
        }
        if let Some(spacing) = self.z_spacing {
            text.push_str(&format!("spacing={spacing}\n"));
        }
        text
    }
}

/// Page permutation and extents needed to write `metadata` as an ImageJ
/// hyperstack. The plane axes must be the last two, `Y` then `X`.
pub(crate) fn page_order(metadata: &Metadata) -> Result<(Vec<usize>, Hyperstack)> {
    let rank = metadata.dims.len();
    if rank < 2
        || metadata.dims[rank - 2].axis != AxisKind::Y
        || metadata.dims[rank - 1].axis != AxisKind::X
    {
        return Err(IoError::UnsupportedLayout(format!(
            "TIFF output needs Y and X as the last two axes, found {:?}",
            metadata.dims.iter().map(|dim| dim.axis).collect::<Vec<_>>()
        )));
    }

    let mut stack = Hyperstack {
        channels: 1,
        slices: 1,
        frames: 1,
        z_spacing: metadata.spacing(AxisKind::Z),
        pixel_size: metadata
            .spacing(AxisKind::X)
            .zip(metadata.spacing(AxisKind::Y)),
        unit: metadata
            .dims
            .iter()
            .filter(|dim| matches!(dim.axis, AxisKind::Z | AxisKind::X | AxisKind::Y))
            .find_map(|dim| dim.unit.clone()),
    };
    // File order is T, Z, C from slowest to fastest.
    let mut leading = Vec::with_capacity(rank - 2);
    for (index, dim) in metadata.dims[..rank - 2].iter().enumerate() {
        let (rank_key, extent) = match dim.axis {
            AxisKind::Time => (0, &mut stack.frames),
            AxisKind::Z => (1, &mut stack.slices),
            AxisKind::Channel => (2, &mut stack.channels),
            other => {
                return Err(IoError::UnsupportedLayout(format!(
                    "axis {} cannot be stored in a TIFF hyperstack",
                    other.label()
                )));
            }
        };
        if leading.iter().any(|(key, _)| *key == rank_key) {
            return Err(IoError::UnsupportedLayout(format!(
                "axis {} appears more than once",
                dim.axis.label()
            )));
        }
        *extent = dim.size;
        leading.push((rank_key, index));
    }
    leading.sort_by_key(|(key, _)| *key);

    let mut permutation = leading.into_iter().map(|(_, index)| index).collect::<Vec<_>>();
    permutation.extend([rank - 2, rank - 1]);
    Ok((permutation, stack))
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ImageJDescription {
    channels: Option<usize>,
    frames: Option<usize>,
    spacing: Option<f32>,
    unit: Option<String>,
}

impl ImageJDescription {
    fn parse(text: &str) -> Self {
        let mut described = Self::default();
        if !text.starts_with("ImageJ=") {
            return described;
        }
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "channels" => described.channels = value.parse().ok(),
                "frames" => described.frames = value.parse().ok(),
                "spacing" => described.spacing = value.parse().ok(),
                "unit" => described.unit = Some(value.to_string()),
                _ => {}
            }
        }
        described
    }
}
