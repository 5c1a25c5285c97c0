use std::collections::VecDeque;

use crate::model::{Dataset, DatasetF32};
use ndarray::{ArrayD, Dimension, IxDyn};
use serde_json::{Value, json};

use super::{
    MeasurementTable, OpOutput, OpSchema, Operation, OpsError, ParamSpec, Result,
    get_optional_f32, spatial_axes, util::neighborhood_offsets,
};

/// Labels connected foreground regions along `axes` with full (8/26-style)
/// connectivity, scanning in memory order. Returns the labels and the
/// number of components found.
pub fn label_components(foreground: &ArrayD<bool>, axes: &[usize]) -> (ArrayD<u32>, u32) {
    let shape = foreground.shape().to_vec();
    let offsets = neighborhood_offsets(axes.len(), 1, false);
    let mut labels = ArrayD::<u32>::zeros(IxDyn(&shape));
    let mut next_label = 1_u32;

    for (index, value) in foreground.indexed_iter() {
        if !*value || labels[index.slice()] != 0 {
            continue;
        }

        let mut queue = VecDeque::new();
        queue.push_back(index.slice().to_vec());
        labels[index.slice()] = next_label;

        while let Some(point) = queue.pop_front() {
            for offset in &offsets {
                let mut candidate = point.clone();
                let mut out_of_bounds = false;
                for (offset_axis, data_axis) in axes.iter().enumerate() {
                    let size = shape[*data_axis] as isize;
                    let next = candidate[*data_axis] as isize + offset[offset_axis];
                    if next < 0 || next >= size {
                        out_of_bounds = true;
                        break;
                    }
                    candidate[*data_axis] = next as usize;
                }
                if out_of_bounds {
                    continue;
                }
                if !foreground[candidate.as_slice()] || labels[candidate.as_slice()] != 0 {
                    continue;
                }
                labels[candidate.as_slice()] = next_label;
                queue.push_back(candidate);
            }
        }

        next_label += 1;
    }

    (labels, next_label - 1)
}

/// Clears components smaller than `min_voxels` and renumbers the survivors
/// 1..=n in order of first appearance. Returns the new object count.
pub fn filter_small_components(labels: &mut ArrayD<u32>, count: u32, min_voxels: usize) -> u32 {
    let mut sizes = vec![0usize; count as usize + 1];
    for label in labels.iter() {
        sizes[*label as usize] += 1;
    }
    let mut remap = vec![0u32; count as usize + 1];
    let mut kept = 0u32;
    for label in 1..=count as usize {
        if sizes[label] >= min_voxels {
            kept += 1;
            remap[label] = kept;
        }
    }
    labels.mapv_inplace(|label| remap[label as usize]);
    kept
}

#[derive(Debug, Clone, Copy)]
pub struct ComponentsLabelOp;

impl Operation for ComponentsLabelOp {
    fn name(&self) -> &'static str {
        "components.label"
    }

    fn schema(&self) -> OpSchema {
        OpSchema {
            name: self.name().to_string(),
            description: "Connected-component labeling of voxels above a threshold.".to_string(),
            params: vec![ParamSpec {
                name: "threshold".to_string(),
                description: "Foreground is value > threshold. Defaults to 0.5.".to_string(),
                required: false,
                kind: "float".to_string(),
            }],
        }
    }

    fn execute(&self, dataset: &DatasetF32, params: &Value) -> Result<OpOutput> {
        let axes = spatial_axes(dataset);
        if axes.is_empty() {
            return Err(OpsError::UnsupportedLayout(
                "dataset has no spatial axes".to_string(),
            ));
        }
        let threshold = get_optional_f32(params, "threshold", 0.5);
        let foreground = dataset.data.mapv(|value| value > threshold);
        let (labels, count) = label_components(&foreground, &axes);

        let labeled = labels.mapv(|label| label as f32);
        let output_dataset = Dataset::new(labeled, dataset.metadata.clone())?;

        let mut measurements = MeasurementTable::default();
        measurements
            .values
            .insert("component_count".to_string(), json!(count));
        Ok(OpOutput {
            dataset: output_dataset,
            measurements: Some(measurements),
        })
    }
}
