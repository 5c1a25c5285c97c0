use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::{AxisMap, DatasetF32, LabelDataset};
use crate::segmentation::{
    CancellationToken, ModelCatalog, ModelExpectedSize, ModelSource, ScaleFactors, ScaleRatios,
    ThresholdModelLoader, TracingProgress,
};
use crate::workflow::{
    SegmentationRecipe, SegmentationReport, load_recipe, masks_dataset, run_recipe, save_report,
};

use super::Result;

/// A catalog model and whether a definition for it is installed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelEntry {
    pub name: String,
    pub description: String,
    pub expected_size: ModelExpectedSize,
    pub installed: bool,
}

/// Factors a run would apply to an image, without running a model.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScalePreview {
    pub model: String,
    pub expected_size: ModelExpectedSize,
    pub ratios: ScaleRatios,
    pub axes: AxisMap,
    pub factors: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct SegmentationService {
    loader: ThresholdModelLoader,
    catalog: ModelCatalog,
}

impl SegmentationService {
    pub fn new(model_root: impl Into<PathBuf>) -> Self {
        Self {
            loader: ThresholdModelLoader::new(model_root),
            catalog: ModelCatalog,
        }
    }

    pub fn model_root(&self) -> &Path {
        self.loader.model_root()
    }

    pub fn models(&self) -> Vec<ModelEntry> {
        self.catalog
            .pretrained()
            .iter()
            .map(|model| {
                let source = ModelSource::Pretrained(model.name.to_string());
                ModelEntry {
                    name: model.name.to_string(),
                    description: model.description.to_string(),
                    expected_size: model.expected,
                    installed: self.loader.model_dir(&source).is_dir(),
                }
            })
            .collect()
    }

    /// Scale factors for `dataset` if it were segmented with `model` and
    /// objects of the given diameters.
    pub fn preview(
        &self,
        dataset: &DatasetF32,
        model: &str,
        diameter_xy: f64,
        diameter_z: f64,
    ) -> ScalePreview {
        let expected = self.catalog.expected_size(model);
        let ratios = ScaleRatios::new(expected, diameter_xy, diameter_z);
        let axes = dataset.axis_map();
        let factors = ScaleFactors::for_axes(ratios, &axes, dataset.ndim());
        ScalePreview {
            model: model.to_string(),
            expected_size: expected,
            ratios,
            axes,
            factors: factors.0,
        }
    }

    pub fn load_recipe(&self, path: impl AsRef<Path>) -> Result<SegmentationRecipe> {
        Ok(load_recipe(path)?)
    }

    pub fn run(
        &self,
        recipe: &SegmentationRecipe,
        dataset: &DatasetF32,
        cancellation: Option<CancellationToken>,
    ) -> Result<(LabelDataset, SegmentationReport)> {
        let (outputs, report) =
            run_recipe(recipe, dataset, &self.loader, &TracingProgress, cancellation)?;
        let labels = masks_dataset(&outputs, &dataset.metadata)?;
        Ok((labels, report))
    }

    pub fn save_report(&self, path: impl AsRef<Path>, report: &SegmentationReport) -> Result<()> {
        save_report(path, report)?;
        Ok(())
    }
}
