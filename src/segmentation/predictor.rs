use ndarray::{ArrayD, ArrayViewD};

use super::{ModelSource, Result, Thresholds};

/// Errors raised by a predictor are passed through to the caller untouched.
pub type PredictorError = Box<dyn std::error::Error + Send + Sync>;

/// A loaded instance-segmentation model.
///
/// Implementations may keep state between calls; a single instance is used
/// for every timepoint of one run and is never called concurrently.
pub trait Predictor {
    /// Returns a label volume with exactly the shape of `volume`.
    fn predict_instances(
        &mut self,
        volume: ArrayViewD<'_, f32>,
        thresholds: &Thresholds,
    ) -> std::result::Result<ArrayD<u32>, PredictorError>;
}

pub trait PredictorLoader {
    fn load(&self, model: &ModelSource) -> Result<Box<dyn Predictor>>;
}
