use std::path::PathBuf;

use thiserror::Error;

use crate::commands::OpsError;
use crate::model::CoreError;

use super::PredictorError;

pub type Result<T> = std::result::Result<T, SegmentationError>;

/// Problems with the parameters of a run, detected before any computation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),

    #[error("parameter `{key}` must be {expected}, got `{value}`")]
    Parse {
        key: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("parameter `{key}` = {value} is outside its valid range {range}")]
    OutOfRange {
        key: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("custom model path does not exist: {0}")]
    CustomModelMissing(PathBuf),
}

#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("model not found: no model artifact at {0}")]
    ModelNotFound(PathBuf),

    #[error("invalid model definition at {path}: {reason}")]
    InvalidModel { path: PathBuf, reason: String },

    #[error("predictor failed: {0}")]
    Predictor(#[source] PredictorError),

    #[error("predictor returned labels of shape {actual:?} for an input of shape {expected:?}")]
    PredictionShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("segmentation cancelled before timepoint {timepoint}")]
    Cancelled { timepoint: usize },

    #[error("segmentation deadline exceeded before timepoint {timepoint}")]
    DeadlineExceeded { timepoint: usize },

    #[error("array operation failed: {0}")]
    Ops(#[from] OpsError),

    #[error("invalid axes: {0}")]
    Core(#[from] CoreError),

    #[error("model I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
