use crate::model::Metadata;
use crate::segmentation::{FrameSummary, ModelExpectedSize, ScaleRatios};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentationReport {
    pub recipe_name: Option<String>,
    pub model: String,
    pub expected_size: ModelExpectedSize,
    pub ratios: ScaleRatios,
    /// Distinct labels in the whole output, across all timepoints.
    pub object_count: usize,
    pub max_label: u32,
    pub frames: Vec<FrameSummary>,
    pub duration_ms: u64,
    pub output_metadata: Metadata,
}
