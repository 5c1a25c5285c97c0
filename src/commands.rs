mod axes;
mod components;
mod error;
mod intensity;
mod labels;
mod params;
mod registry;
mod resample;
mod schema;
mod util;


pub use axes::{AxesSelectChannelOp, select_channel, take_along};
pub use components::{ComponentsLabelOp, filter_small_components, label_components};
pub use error::{OpsError, Result};
pub use intensity::{
    DEFAULT_HIGH_PERCENTILE, DEFAULT_LOW_PERCENTILE, IntensityPercentileNormalizeOp,
    percentile_normalize,
};
pub use labels::{LabelSummary, LabelsSummaryOp};
pub use registry::{
    default_registry, execute_operation, execute_operation_with_registry, list_operations,
};
pub use resample::{
    Interpolation, ResampleZoomOp, resample_linear, resample_nearest, zoom, zoom_shape,
};
pub use schema::{MeasurementTable, OpOutput, OpSchema, Operation, ParamSpec};

pub(crate) use axes::spatial_axes;
pub(crate) use params::{
    get_optional_f32, get_optional_usize, get_required_f64_list, get_required_usize,
};
