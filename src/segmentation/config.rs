use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ConfigError;

pub const DEFAULT_MODEL: &str = "confocal";
pub const DEFAULT_PROB_THRESHOLD: f32 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;
pub const DEFAULT_NORMALIZE: bool = true;
pub const DEFAULT_TARGET_CHANNEL: usize = 1;
pub const DEFAULT_DIAMETER_XY: f64 = 35.0;
pub const DEFAULT_DIAMETER_Z: f64 = 8.0;

/// Which model to run: a named pretrained model or a model directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Pretrained(String),
    Custom(PathBuf),
}

impl ModelSource {
    /// Name used for the expected-size lookup. Custom models go by their
    /// directory name.
    pub fn name(&self) -> String {
        match self {
            ModelSource::Pretrained(name) => name.clone(),
            ModelSource::Custom(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Object probability threshold in `[0, 1]`.
    pub probability: f32,
    /// Non-maximum-suppression overlap threshold in `[0, 1]`.
    pub nms: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    pub model: ModelSource,
    pub thresholds: Thresholds,
    pub normalize: bool,
    /// 1-based; only consulted when the volume has a channel axis.
    pub target_channel: usize,
    /// Expected object diameter in the XY plane, in pixels.
    pub diameter_xy: f64,
    /// Expected object diameter along Z, in pixels.
    pub diameter_z: f64,
    pub pixel_size_xy: Option<f64>,
    pub pixel_size_z: Option<f64>,
    pub timeout: Option<Duration>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            model: ModelSource::Pretrained(DEFAULT_MODEL.to_string()),
            thresholds: Thresholds {
                probability: DEFAULT_PROB_THRESHOLD,
                nms: DEFAULT_NMS_THRESHOLD,
            },
            normalize: DEFAULT_NORMALIZE,
            target_channel: DEFAULT_TARGET_CHANNEL,
            diameter_xy: DEFAULT_DIAMETER_XY,
            diameter_z: DEFAULT_DIAMETER_Z,
            pixel_size_xy: None,
            pixel_size_z: None,
            timeout: None,
        }
    }
}

impl SegmentationConfig {
    /// Parses externally templated parameters. Values may be JSON numbers
    /// and booleans or their string renderings.
    pub fn from_params(params: &BTreeMap<String, Value>) -> Result<Self, ConfigError> {
        let model = match read_string(params, "custom_model")? {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(ConfigError::CustomModelMissing(path));
                }
                ModelSource::Custom(path)
            }
            None => ModelSource::Pretrained(
                read_string(params, "model")?.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ),
        };

        let config = Self {
            model,
            thresholds: Thresholds {
                probability: require(read_f64(params, "prob_thresh")?, "prob_thresh")? as f32,
                nms: require(read_f64(params, "nms_thresh")?, "nms_thresh")? as f32,
            },
            normalize: read_bool(params, "normalize")?.unwrap_or(DEFAULT_NORMALIZE),
            target_channel: require(read_usize(params, "target_channel")?, "target_channel")?,
            diameter_xy: require(read_f64(params, "diameter_xy")?, "diameter_xy")?,
            diameter_z: require(read_f64(params, "diameter_z")?, "diameter_z")?,
            pixel_size_xy: read_f64(params, "pixel_size_xy")?,
            pixel_size_z: read_f64(params, "pixel_size_z")?,
            timeout: read_f64(params, "timeout_secs")?
                .map(|secs| check_positive("timeout_secs", secs).map(Duration::from_secs_f64))
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("prob_thresh", f64::from(self.thresholds.probability))?;
        check_unit("nms_thresh", f64::from(self.thresholds.nms))?;
        if self.target_channel == 0 {
            return Err(ConfigError::OutOfRange {
                key: "target_channel",
                value: 0.0,
                range: ">= 1",
            });
        }
        check_at_least_one_pixel("diameter_xy", self.diameter_xy)?;
        check_at_least_one_pixel("diameter_z", self.diameter_z)?;
        if let Some(size) = self.pixel_size_xy {
            check_positive("pixel_size_xy", size)?;
        }
        if let Some(size) = self.pixel_size_z {
            check_positive("pixel_size_z", size)?;
        }
        match &self.model {
            ModelSource::Pretrained(name) if name.trim().is_empty() => {
                Err(ConfigError::Missing("model"))
            }
            _ => Ok(()),
        }
    }

    pub fn model_name(&self) -> String {
        self.model.name()
    }

    /// Expected diameters in physical units, when the pixel sizes are known.
    pub fn physical_diameters(&self) -> Option<(f64, f64)> {
        Some((
            self.diameter_xy * self.pixel_size_xy?,
            self.diameter_z * self.pixel_size_z?,
        ))
    }

    pub fn custom_model_path(&self) -> Option<&Path> {
        match &self.model {
            ModelSource::Custom(path) => Some(path),
            ModelSource::Pretrained(_) => None,
        }
    }
}

fn require<T>(value: Option<T>, key: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::Missing(key))
}

/// Blank strings count as absent: templating leaves them behind for unset
/// parameters.
fn raw<'a>(params: &'a BTreeMap<String, Value>, key: &str) -> Option<&'a Value> {
    match params.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn read_string(
    params: &BTreeMap<String, Value>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match raw(params, key) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.trim().to_string())),
        Some(other) => Err(ConfigError::Parse {
            key,
            expected: "a string",
            value: other.to_string(),
        }),
    }
}

fn read_f64(params: &BTreeMap<String, Value>, key: &'static str) -> Result<Option<f64>, ConfigError> {
    let parse_error = |value: String| ConfigError::Parse {
        key,
        expected: "a number",
        value,
    };
    let value = match raw(params, key) {
        None => return Ok(None),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| parse_error(number.to_string()))?,
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| parse_error(text.clone()))?,
        Some(other) => return Err(parse_error(other.to_string())),
    };
    if !value.is_finite() {
        return Err(parse_error(value.to_string()));
    }
    Ok(Some(value))
}

fn read_usize(
    params: &BTreeMap<String, Value>,
    key: &'static str,
) -> Result<Option<usize>, ConfigError> {
    let parse_error = |value: String| ConfigError::Parse {
        key,
        expected: "a non-negative integer",
        value,
    };
    match raw(params, key) {
        None => Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .map(|value| Some(value as usize))
            .ok_or_else(|| parse_error(number.to_string())),
        Some(Value::String(text)) => text
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| parse_error(text.clone())),
        Some(other) => Err(parse_error(other.to_string())),
    }
}

fn read_bool(
    params: &BTreeMap<String, Value>,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    let parse_error = |value: String| ConfigError::Parse {
        key,
        expected: "one of true/false, yes/no, on/off, 1/0",
        value,
    };
    match raw(params, key) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(parse_error(text.clone())),
        },
        Some(Value::Number(number)) => match number.as_u64() {
            Some(1) => Ok(Some(true)),
            Some(0) => Ok(Some(false)),
            _ => Err(parse_error(number.to_string())),
        },
        Some(other) => Err(parse_error(other.to_string())),
    }
}

fn check_unit(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            range: "[0, 1]",
        })
    }
}

fn check_at_least_one_pixel(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            range: ">= 1 pixel",
        })
    }
}

fn check_positive(key: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            range: "> 0",
        })
    }
}
