use crate::model::{Dataset, DatasetF32};
use ndarray::ArrayD;
use rayon::prelude::*;
use serde_json::Value;

use super::{OpOutput, OpSchema, Operation, OpsError, ParamSpec, Result, get_optional_f32};

pub const DEFAULT_LOW_PERCENTILE: f32 = 1.0;
pub const DEFAULT_HIGH_PERCENTILE: f32 = 99.8;

const NORMALIZE_EPS: f32 = 1e-20;

/// Percentile of `sorted` with linear interpolation between closest ranks.
/// `percent` is in `[0, 100]`; `sorted` must be ascending and non-empty.
pub(crate) fn percentile_sorted(sorted: &[f32], percent: f32) -> f32 {
    let last = sorted.len() - 1;
    let rank = f64::from(percent / 100.0) * last as f64;
    let lower = (rank.floor() as usize).min(last);
    let upper = (lower + 1).min(last);
    let weight = (rank - lower as f64) as f32;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Maps the `low`-th percentile to 0 and the `high`-th to 1. Values outside
/// that window are kept, not clipped.
pub fn percentile_normalize(volume: &ArrayD<f32>, low: f32, high: f32) -> Result<ArrayD<f32>> {
    if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || high <= low {
        return Err(OpsError::InvalidParams(format!(
            "percentiles must satisfy 0 <= low < high <= 100, got low={low}, high={high}"
        )));
    }
    if volume.is_empty() {
        return Ok(volume.clone());
    }
    let mut sorted = volume.iter().copied().collect::<Vec<_>>();
    sorted.par_sort_unstable_by(f32::total_cmp);
    let lower = percentile_sorted(&sorted, low);
    let upper = percentile_sorted(&sorted, high);
    let span = upper - lower + NORMALIZE_EPS;

    let mut normalized = volume.clone();
    normalized.par_mapv_inplace(|value| (value - lower) / span);
    Ok(normalized)
}

#[derive(Debug, Clone, Copy)]
pub struct IntensityPercentileNormalizeOp;

impl Operation for IntensityPercentileNormalizeOp {
    fn name(&self) -> &'static str {
        "intensity.percentile_normalize"
    }

    fn schema(&self) -> OpSchema {
        OpSchema {
            name: self.name().to_string(),
            description: "Map the low/high percentiles of the data onto 0 and 1 (no clipping)."
                .to_string(),
            params: vec![
                ParamSpec {
                    name: "low".to_string(),
                    description: "Lower percentile. Defaults to 1.".to_string(),
                    required: false,
                    kind: "float".to_string(),
                },
                ParamSpec {
                    name: "high".to_string(),
                    description: "Upper percentile. Defaults to 99.8.".to_string(),
                    required: false,
                    kind: "float".to_string(),
                },
            ],
        }
    }

    fn execute(&self, dataset: &DatasetF32, params: &Value) -> Result<OpOutput> {
        let low = get_optional_f32(params, "low", DEFAULT_LOW_PERCENTILE);
        let high = get_optional_f32(params, "high", DEFAULT_HIGH_PERCENTILE);
        let normalized = percentile_normalize(&dataset.data, low, high)?;
        let output_dataset = Dataset::new(normalized, dataset.metadata.clone())?;
        Ok(OpOutput::dataset_only(output_dataset))
    }
}
