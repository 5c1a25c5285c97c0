use ndarray::{ArrayD, Axis};
use serde_json::Value;

use crate::model::{AxisKind, AxisMap, Dataset, DatasetF32};

use super::{OpOutput, OpSchema, Operation, OpsError, ParamSpec, Result, get_required_usize};

pub(crate) fn spatial_axes(dataset: &DatasetF32) -> Vec<usize> {
    dataset
        .metadata
        .dims
        .iter()
        .enumerate()
        .filter(|(_, dim)| dim.axis.is_spatial() || dim.axis == AxisKind::Unknown)
        .map(|(index, _)| index)
        .collect()
}

/// Copies the hyperplane at `index` along `axis`, dropping that dimension.
pub fn take_along<T: Clone>(volume: &ArrayD<T>, axis: usize, index: usize) -> Result<ArrayD<T>> {
    if axis >= volume.ndim() {
        return Err(OpsError::UnsupportedLayout(format!(
            "axis {axis} does not exist in a volume of rank {}",
            volume.ndim()
        )));
    }
    let len = volume.len_of(Axis(axis));
    if index >= len {
        return Err(OpsError::IndexOutOfRange { axis, index, len });
    }
    Ok(volume.index_axis(Axis(axis), index).to_owned())
}

/// Keeps the 1-based `target_channel` of a multi-channel volume.
///
/// Volumes without a `Channel` axis come back unchanged. Otherwise the
/// returned map no longer has `Channel` and every axis that followed it has
/// moved down one position.
pub fn select_channel<T: Clone>(
    volume: &ArrayD<T>,
    axes: &AxisMap,
    target_channel: usize,
) -> Result<(ArrayD<T>, AxisMap)> {
    let Some(channel_axis) = axes.get(AxisKind::Channel) else {
        return Ok((volume.clone(), axes.clone()));
    };
    axes.validate(volume.ndim())?;
    let available = volume.len_of(Axis(channel_axis));
    if target_channel == 0 || target_channel > available {
        return Err(OpsError::ChannelOutOfRange {
            requested: target_channel,
            available,
        });
    }
    let reduced = take_along(volume, channel_axis, target_channel - 1)?;
    Ok((reduced, axes.without(AxisKind::Channel)))
}

#[derive(Debug, Clone, Copy)]
pub struct AxesSelectChannelOp;

impl Operation for AxesSelectChannelOp {
    fn name(&self) -> &'static str {
        "axes.select_channel"
    }

    fn schema(&self) -> OpSchema {
        OpSchema {
            name: self.name().to_string(),
            description: "Keep a single channel and drop the Channel axis.".to_string(),
            params: vec![ParamSpec {
                name: "channel".to_string(),
                description: "1-based channel to keep.".to_string(),
                required: true,
                kind: "int".to_string(),
            }],
        }
    }

    fn execute(&self, dataset: &DatasetF32, params: &Value) -> Result<OpOutput> {
        let channel = get_required_usize(params, "channel")?;
        let (data, _) = select_channel(&dataset.data, &dataset.axis_map(), channel)?;
        let metadata = dataset.metadata.without_axis(AxisKind::Channel);
        let output_dataset = Dataset::new(data, metadata)?;
        Ok(OpOutput::dataset_only(output_dataset))
    }
}
