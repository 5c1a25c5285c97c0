use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::segmentation::SegmentationConfig;

use super::{Result, WorkflowError};

/// A named set of segmentation parameters as stored on disk.
///
/// Parameter values are kept untyped until [`SegmentationRecipe::config`]
/// so that templated files can carry numbers as strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SegmentationRecipe {
    pub name: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl SegmentationRecipe {
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = self.params.keys().find(|key| key.trim().is_empty()) {
            return Err(WorkflowError::Parse(format!(
                "recipe contains an empty parameter name: {key:?}"
            )));
        }
        Ok(())
    }

    pub fn config(&self) -> Result<SegmentationConfig> {
        self.validate()?;
        Ok(SegmentationConfig::from_params(&self.params)?)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }
}
