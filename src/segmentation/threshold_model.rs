use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, ArrayViewD};
use serde::{Deserialize, Serialize};

use crate::commands::{filter_small_components, label_components};

use super::{
    ModelSource, Predictor, PredictorError, PredictorLoader, Result, SegmentationError,
    Thresholds,
};

pub const MODEL_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdModelConfig {
    /// Components with fewer voxels are discarded.
    #[serde(default = "default_min_voxels")]
    pub min_voxels: usize,
}

fn default_min_voxels() -> usize {
    1
}

impl Default for ThresholdModelConfig {
    fn default() -> Self {
        Self {
            min_voxels: default_min_voxels(),
        }
    }
}

/// Resolves model directories below `model_root` and loads them as
/// [`ThresholdPredictor`]s.
#[derive(Debug, Clone)]
pub struct ThresholdModelLoader {
    model_root: PathBuf,
}

impl ThresholdModelLoader {
    pub fn new(model_root: impl Into<PathBuf>) -> Self {
        Self {
            model_root: model_root.into(),
        }
    }

    pub fn model_root(&self) -> &Path {
        &self.model_root
    }

    pub fn model_dir(&self, model: &ModelSource) -> PathBuf {
        match model {
            ModelSource::Pretrained(name) => self.model_root.join(name),
            ModelSource::Custom(path) => path.clone(),
        }
    }
}

impl PredictorLoader for ThresholdModelLoader {
    fn load(&self, model: &ModelSource) -> Result<Box<dyn Predictor>> {
        let config_path = self.model_dir(model).join(MODEL_CONFIG_FILE);
        if !config_path.is_file() {
            return Err(SegmentationError::ModelNotFound(config_path));
        }
        let text = fs::read_to_string(&config_path)?;
        let config = serde_json::from_str::<ThresholdModelConfig>(&text).map_err(|error| {
            SegmentationError::InvalidModel {
                path: config_path.clone(),
                reason: error.to_string(),
            }
        })?;
        tracing::debug!(
            path = %config_path.display(),
            min_voxels = config.min_voxels,
            "loaded threshold model"
        );
        Ok(Box::new(ThresholdPredictor::new(config)))
    }
}

/// Foreground is every voxel at or above the probability threshold; each
/// connected foreground region becomes one object. The NMS threshold has no
/// effect on this model.
#[derive(Debug, Clone, Default)]
pub struct ThresholdPredictor {
    config: ThresholdModelConfig,
}

impl ThresholdPredictor {
    pub fn new(config: ThresholdModelConfig) -> Self {
        Self { config }
    }
}

impl Predictor for ThresholdPredictor {
    fn predict_instances(
        &mut self,
        volume: ArrayViewD<'_, f32>,
        thresholds: &Thresholds,
    ) -> std::result::Result<ArrayD<u32>, PredictorError> {
        let foreground = volume.mapv(|value| value >= thresholds.probability);
        let axes = (0..volume.ndim()).collect::<Vec<_>>();
        let (mut labels, count) = label_components(&foreground, &axes);
        let kept = filter_small_components(&mut labels, count, self.config.min_voxels);
        tracing::debug!(found = count, kept, "threshold model labelled components");
        Ok(labels)
    }
}
