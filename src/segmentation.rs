mod cancel;
mod catalog;
mod config;
mod error;
mod outputs;
mod predictor;
mod progress;
mod rescaler;
mod threshold_model;

#[cfg(test)]
mod tests;

pub use cancel::CancellationToken;
pub use catalog::{ModelCatalog, ModelExpectedSize, PretrainedModel, ScaleFactors, ScaleRatios};
pub use config::{
    DEFAULT_DIAMETER_XY, DEFAULT_DIAMETER_Z, DEFAULT_MODEL, DEFAULT_NMS_THRESHOLD,
    DEFAULT_NORMALIZE, DEFAULT_PROB_THRESHOLD, DEFAULT_TARGET_CHANNEL, ModelSource,
    SegmentationConfig, Thresholds,
};
pub use error::{ConfigError, Result, SegmentationError};
pub use outputs::{MASKS_OUTPUT, TaskOutputs};
pub use predictor::{Predictor, PredictorError, PredictorLoader};
pub use progress::{ProgressSink, RecordingProgress, TracingProgress};
pub use rescaler::{AxisAwareVolumeRescaler, FrameSummary, LabelVolume, Segmentation};
pub use threshold_model::{
    MODEL_CONFIG_FILE, ThresholdModelConfig, ThresholdModelLoader, ThresholdPredictor,
};
