use serde::{Deserialize, Serialize};

use crate::model::{AxisKind, AxisMap};

/// Typical object extent, in pixels, that a model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelExpectedSize {
    pub xy: f64,
    pub z: f64,
}

impl ModelExpectedSize {
    pub const DEFAULT: ModelExpectedSize = ModelExpectedSize { xy: 35.0, z: 8.0 };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PretrainedModel {
    pub name: &'static str,
    pub description: &'static str,
    pub expected: ModelExpectedSize,
}

const PRETRAINED: [PretrainedModel; 3] = [
    PretrainedModel {
        name: "confocal",
        description: "confocal - FUCCI label (39x39x7 px)",
        expected: ModelExpectedSize { xy: 39.0, z: 7.0 },
    },
    PretrainedModel {
        name: "sospim",
        description: "sospim - DAPI/SOX2 (27x28x10 px)",
        expected: ModelExpectedSize { xy: 27.5, z: 10.0 },
    },
    PretrainedModel {
        name: "spinning",
        description: "spinning - DAPI (39x39x7 px)",
        expected: ModelExpectedSize { xy: 39.0, z: 7.0 },
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelCatalog;

impl ModelCatalog {
    pub fn pretrained(&self) -> &'static [PretrainedModel] {
        &PRETRAINED
    }

    pub fn find(&self, name: &str) -> Option<&'static PretrainedModel> {
        PRETRAINED.iter().find(|model| model.name == name)
    }

    /// Expected object size for `name`, falling back to
    /// [`ModelExpectedSize::DEFAULT`] for names the catalog does not know.
    pub fn expected_size(&self, name: &str) -> ModelExpectedSize {
        self.find(name)
            .map(|model| model.expected)
            .unwrap_or(ModelExpectedSize::DEFAULT)
    }
}

/// How much the volume has to be magnified so that objects of the caller's
/// size look like the objects the model was trained on. Values above 1 mean
/// the model expects larger objects than the caller's estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRatios {
    pub xy: f64,
    pub z: f64,
}

impl ScaleRatios {
    pub fn new(expected: ModelExpectedSize, diameter_xy: f64, diameter_z: f64) -> Self {
        Self {
            xy: expected.xy / diameter_xy,
            z: expected.z / diameter_z,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.xy == 1.0 && self.z == 1.0
    }
}

/// One zoom factor per array dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactors(pub Vec<f64>);

impl ScaleFactors {
    /// Places the ratios on the Z, Y and X positions of `axes`; every other
    /// dimension keeps a factor of 1.
    pub fn for_axes(ratios: ScaleRatios, axes: &AxisMap, rank: usize) -> Self {
        let mut factors = vec![1.0; rank];
        for (axis, index) in axes.iter() {
            let Some(slot) = factors.get_mut(index) else {
                continue;
            };
            match axis {
                AxisKind::Z => *slot = ratios.z,
                AxisKind::Y | AxisKind::X => *slot = ratios.xy,
                _ => {}
            }
        }
        Self(factors)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().all(|factor| *factor == 1.0)
    }
}
