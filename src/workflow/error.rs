use crate::model::CoreError;
use crate::segmentation::{ConfigError, SegmentationError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("recipe parse failure: {0}")]
    Parse(String),

    #[error("recipe I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("recipe serialization failure: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("recipe YAML serialization failure: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("invalid recipe parameters: {0}")]
    Config(#[from] ConfigError),

    #[error("run produced no `{0}` output")]
    MissingOutput(&'static str),

    #[error("segmentation failed: {0}")]
    Segmentation(#[from] SegmentationError),

    #[error("dataset validation failed: {0}")]
    Core(#[from] CoreError),
}
