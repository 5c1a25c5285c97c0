use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AxisKind {
    Time,
    Channel,
    Z,
    Y,
    X,
    Unknown,
}

impl AxisKind {
    /// Semantic axes, in the order they are reported.
    pub const SEMANTIC: [AxisKind; 5] = [
        AxisKind::Time,
        AxisKind::Channel,
        AxisKind::Z,
        AxisKind::Y,
        AxisKind::X,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AxisKind::Time => "Time",
            AxisKind::Channel => "Channel",
            AxisKind::Z => "Z",
            AxisKind::Y => "Y",
            AxisKind::X => "X",
            AxisKind::Unknown => "Unknown",
        }
    }

    /// Parses an axis label as exchanged with image-analysis hosts.
    /// Anything that is not one of the semantic labels yields `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        AxisKind::SEMANTIC
            .into_iter()
            .find(|axis| axis.label() == label)
    }

    pub fn is_spatial(self) -> bool {
        matches!(self, AxisKind::X | AxisKind::Y | AxisKind::Z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PixelType {
    U8,
    U16,
    U32,
    #[default]
    F32,
}

pub fn default_axis_for_index(index: usize) -> AxisKind {
    match index {
        0 => AxisKind::Y,
        1 => AxisKind::X,
        2 => AxisKind::Z,
        3 => AxisKind::Channel,
        4 => AxisKind::Time,
        _ => AxisKind::Unknown,
    }
}
