use crate::model::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpsError>;

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("invalid operation parameters: {0}")]
    InvalidParams(String),

    #[error("unsupported dataset layout: {0}")]
    UnsupportedLayout(String),

    #[error("target channel {requested} is outside the valid range [1, {available}]")]
    ChannelOutOfRange { requested: usize, available: usize },

    #[error("index {index} is outside axis {axis} of length {len}")]
    IndexOutOfRange {
        axis: usize,
        index: usize,
        len: usize,
    },

    #[error("core dataset error: {0}")]
    Core(#[from] CoreError),
}
