use std::collections::BTreeMap;

use crate::model::DatasetF32;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{MeasurementTable, OpOutput, OpSchema, Operation, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub object_count: usize,
    pub max_label: u32,
    pub background_voxels: usize,
    pub voxels_per_label: BTreeMap<u32, usize>,
}

impl LabelSummary {
    pub fn of(labels: &ArrayD<u32>) -> Self {
        let mut summary = LabelSummary::default();
        for label in labels.iter().copied() {
            if label == 0 {
                summary.background_voxels += 1;
            } else {
                *summary.voxels_per_label.entry(label).or_default() += 1;
            }
        }
        summary.object_count = summary.voxels_per_label.len();
        summary.max_label = summary
            .voxels_per_label
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0);
        summary
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LabelsSummaryOp;

impl Operation for LabelsSummaryOp {
    fn name(&self) -> &'static str {
        "labels.summary"
    }

    fn schema(&self) -> OpSchema {
        OpSchema {
            name: self.name().to_string(),
            description: "Count objects and voxels per label in a label image.".to_string(),
            params: vec![],
        }
    }

    fn execute(&self, dataset: &DatasetF32, _params: &Value) -> Result<OpOutput> {
        let labels = dataset.data.mapv(|value| value.round().max(0.0) as u32);
        let summary = LabelSummary::of(&labels);

        let mut measurements = MeasurementTable::default();
        measurements
            .values
            .insert("object_count".to_string(), json!(summary.object_count));
        measurements
            .values
            .insert("max_label".to_string(), json!(summary.max_label));
        measurements.values.insert(
            "background_voxels".to_string(),
            json!(summary.background_voxels),
        );
        measurements.values.insert(
            "voxels_per_label".to_string(),
            json!(summary.voxels_per_label),
        );
        Ok(OpOutput {
            dataset: dataset.clone(),
            measurements: Some(measurements),
        })
    }
}
