use std::time::Instant;

use crate::model::{AxisKind, Dataset, DatasetF32, LabelDataset, Metadata, PixelType};
use crate::segmentation::{
    AxisAwareVolumeRescaler, CancellationToken, MASKS_OUTPUT, PredictorLoader, ProgressSink,
    SegmentationConfig, TaskOutputs,
};

use super::{Result, SegmentationRecipe, SegmentationReport, WorkflowError};

/// Segments `dataset` with the parameters of `recipe`.
pub fn run_recipe(
    recipe: &SegmentationRecipe,
    dataset: &DatasetF32,
    loader: &dyn PredictorLoader,
    progress: &dyn ProgressSink,
    cancellation: Option<CancellationToken>,
) -> Result<(TaskOutputs, SegmentationReport)> {
    let mut config = recipe.config()?;
    calibrate(&mut config, dataset);
    let (outputs, mut report) =
        segment_dataset(&config, dataset, loader, progress, cancellation)?;
    report.recipe_name = recipe.name.clone();
    Ok((outputs, report))
}

pub fn segment_dataset(
    config: &SegmentationConfig,
    dataset: &DatasetF32,
    loader: &dyn PredictorLoader,
    progress: &dyn ProgressSink,
    cancellation: Option<CancellationToken>,
) -> Result<(TaskOutputs, SegmentationReport)> {
    let started = Instant::now();
    dataset.validate()?;
    let axes = dataset.axis_map();
    if let Some(path) = config.custom_model_path() {
        tracing::info!(path = %path.display(), "using custom model");
    }

    let mut rescaler = AxisAwareVolumeRescaler::new(loader, progress);
    if let Some(token) = cancellation {
        rescaler = rescaler.with_cancellation(token);
    }
    let segmentation = rescaler.segment(&dataset.data, &axes, config)?;
    let summary = segmentation.masks.summary();

    let report = SegmentationReport {
        recipe_name: None,
        model: segmentation.model_name,
        expected_size: segmentation.expected,
        ratios: segmentation.ratios,
        object_count: summary.object_count,
        max_label: summary.max_label,
        frames: segmentation.frames,
        duration_ms: started.elapsed().as_millis() as u64,
        output_metadata: label_metadata(&dataset.metadata),
    };
    tracing::info!(
        objects = report.object_count,
        frames = report.frames.len(),
        "labels ready"
    );

    let mut outputs = TaskOutputs::new();
    outputs.set_masks(segmentation.masks);
    Ok((outputs, report))
}

/// The `"masks"` output as a dataset on the geometry of `source`.
pub fn masks_dataset(outputs: &TaskOutputs, source: &Metadata) -> Result<LabelDataset> {
    let masks = outputs
        .masks()
        .ok_or(WorkflowError::MissingOutput(MASKS_OUTPUT))?;
    Ok(Dataset::new(masks.labels.clone(), label_metadata(source))?)
}

fn label_metadata(source: &Metadata) -> Metadata {
    let mut metadata = source.without_axis(AxisKind::Channel);
    metadata.pixel_type = PixelType::U32;
    metadata
}

/// Takes pixel sizes from the image calibration when the recipe leaves
/// them out.
fn calibrate(config: &mut SegmentationConfig, dataset: &DatasetF32) {
    let calibrated = |axis| {
        dataset
            .metadata
            .spacing(axis)
            .map(f64::from)
            .filter(|size| *size > 0.0)
    };
    if config.pixel_size_xy.is_none() {
        config.pixel_size_xy = calibrated(AxisKind::X);
    }
    if config.pixel_size_z.is_none() {
        config.pixel_size_z = calibrated(AxisKind::Z);
    }
}
