use crate::model::{Dataset, DatasetF32};
use ndarray::{ArrayBase, ArrayD, ArrayView1, Axis, Data, IxDyn, Zip};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    OpOutput, OpSchema, Operation, OpsError, ParamSpec, Result, get_optional_usize,
    get_required_f64_list,
};

/// Sampling kernel used when a dimension changes size.
///
/// `Linear` is for continuous intensities. `Nearest` only ever copies
/// existing samples, which makes it the one choice for label volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    Linear,
}

impl Interpolation {
    pub fn from_order(order: usize) -> Result<Self> {
        match order {
            0 => Ok(Interpolation::Nearest),
            1 => Ok(Interpolation::Linear),
            other => Err(OpsError::InvalidParams(format!(
                "interpolation order must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// Output shape for per-axis zoom factors: `round(size * factor)`, at least 1.
pub fn zoom_shape(shape: &[usize], factors: &[f64]) -> Result<Vec<usize>> {
    if shape.len() != factors.len() {
        return Err(OpsError::InvalidParams(format!(
            "expected {} zoom factors, got {}",
            shape.len(),
            factors.len()
        )));
    }
    shape
        .iter()
        .zip(factors)
        .map(|(size, factor)| {
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(OpsError::InvalidParams(format!(
                    "zoom factors must be finite and > 0, got {factor}"
                )));
            }
            Ok(((*size as f64) * factor).round().max(1.0) as usize)
        })
        .collect()
}

pub fn zoom<S>(
    volume: &ArrayBase<S, IxDyn>,
    factors: &[f64],
    interpolation: Interpolation,
) -> Result<ArrayD<f32>>
where
    S: Data<Elem = f32>,
{
    let target = zoom_shape(volume.shape(), factors)?;
    match interpolation {
        Interpolation::Linear => resample_linear(volume, &target),
        Interpolation::Nearest => resample_nearest(volume, &target),
    }
}

pub fn resample_linear<S>(volume: &ArrayBase<S, IxDyn>, target: &[usize]) -> Result<ArrayD<f32>>
where
    S: Data<Elem = f32>,
{
    resample_with(volume, target, sample_linear)
}

pub fn resample_nearest<S, T>(volume: &ArrayBase<S, IxDyn>, target: &[usize]) -> Result<ArrayD<T>>
where
    S: Data<Elem = T>,
    T: Copy + Default + Send + Sync,
{
    resample_with(volume, target, sample_nearest)
}

fn resample_with<S, T, F>(
    volume: &ArrayBase<S, IxDyn>,
    target: &[usize],
    sample: F,
) -> Result<ArrayD<T>>
where
    S: Data<Elem = T>,
    T: Copy + Default + Send + Sync,
    F: Fn(ArrayView1<'_, T>, f64) -> T + Sync,
{
    if target.len() != volume.ndim() {
        return Err(OpsError::UnsupportedLayout(format!(
            "cannot resample a rank-{} volume to shape {target:?}",
            volume.ndim()
        )));
    }
    if let Some(axis) = volume.shape().iter().position(|size| *size == 0) {
        return Err(OpsError::UnsupportedLayout(format!(
            "cannot resample: axis {axis} of the input is empty"
        )));
    }
    if let Some(axis) = target.iter().position(|size| *size == 0) {
        return Err(OpsError::UnsupportedLayout(format!(
            "cannot resample: axis {axis} of the target shape is empty"
        )));
    }

    let mut current = volume.to_owned();
    for (axis, size) in target.iter().enumerate() {
        if current.len_of(Axis(axis)) != *size {
            current = resample_axis(&current, axis, *size, &sample);
        }
    }
    Ok(current)
}

fn resample_axis<T, F>(input: &ArrayD<T>, axis: usize, target: usize, sample: &F) -> ArrayD<T>
where
    T: Copy + Default + Send + Sync,
    F: Fn(ArrayView1<'_, T>, f64) -> T + Sync,
{
    let source = input.len_of(Axis(axis));
    let step = if target > 1 {
        (source - 1) as f64 / (target - 1) as f64
    } else {
        0.0
    };
    let mut shape = input.shape().to_vec();
    shape[axis] = target;
    let mut output = ArrayD::from_elem(IxDyn(&shape), T::default());

    Zip::from(output.lanes_mut(Axis(axis)))
        .and(input.lanes(Axis(axis)))
        .par_for_each(|mut out_lane, in_lane| {
            for (coord, value) in out_lane.iter_mut().enumerate() {
                *value = sample(in_lane, coord as f64 * step);
            }
        });
    output
}

fn sample_linear(lane: ArrayView1<'_, f32>, position: f64) -> f32 {
    let last = lane.len() - 1;
    let lower = (position.floor() as usize).min(last);
    let upper = (lower + 1).min(last);
    let weight = (position - lower as f64).clamp(0.0, 1.0) as f32;
    lane[lower] * (1.0 - weight) + lane[upper] * weight
}

fn sample_nearest<T: Copy>(lane: ArrayView1<'_, T>, position: f64) -> T {
    let last = lane.len() - 1;
    lane[((position + 0.5).floor() as usize).min(last)]
}

#[derive(Debug, Clone, Copy)]
pub struct ResampleZoomOp;

impl Operation for ResampleZoomOp {
    fn name(&self) -> &'static str {
        "resample.zoom"
    }

    fn schema(&self) -> OpSchema {
        OpSchema {
            name: self.name().to_string(),
            description: "Zoom every axis by its own factor (order 0 = nearest, 1 = linear)."
                .to_string(),
            params: vec![
                ParamSpec {
                    name: "factors".to_string(),
                    description: "One zoom factor per dataset axis.".to_string(),
                    required: true,
                    kind: "float[]".to_string(),
                },
                ParamSpec {
                    name: "order".to_string(),
                    description: "Interpolation order, 0 or 1. Defaults to 1.".to_string(),
                    required: false,
                    kind: "int".to_string(),
                },
            ],
        }
    }

    fn execute(&self, dataset: &DatasetF32, params: &Value) -> Result<OpOutput> {
        let factors = get_required_f64_list(params, "factors")?;
        let interpolation = Interpolation::from_order(get_optional_usize(params, "order", 1))?;
        let data = zoom(&dataset.data, &factors, interpolation)?;

        let mut metadata = dataset.metadata.clone();
        for ((dim, size), factor) in metadata.dims.iter_mut().zip(data.shape()).zip(&factors) {
            dim.size = *size;
            dim.spacing = dim.spacing.map(|spacing| spacing / *factor as f32);
        }
        let output_dataset = Dataset::new(data, metadata)?;
        Ok(OpOutput::dataset_only(output_dataset))
    }
}
