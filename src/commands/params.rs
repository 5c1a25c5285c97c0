use serde_json::Value;

use super::{OpsError, Result};

pub(crate) fn get_optional_f32(params: &Value, key: &str, default: f32) -> f32 {
    params
        .get(key)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(default)
}

pub(crate) fn get_optional_usize(params: &Value, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

pub(crate) fn get_required_usize(params: &Value, key: &str) -> Result<usize> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| OpsError::InvalidParams(format!("missing integer parameter `{key}`")))
}

pub(crate) fn get_required_f64_list(params: &Value, key: &str) -> Result<Vec<f64>> {
    let values = params
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| OpsError::InvalidParams(format!("missing float list parameter `{key}`")))?;
    values
        .iter()
        .map(|value| {
            value.as_f64().ok_or_else(|| {
                OpsError::InvalidParams(format!("`{key}` must only contain numbers"))
            })
        })
        .collect()
}
