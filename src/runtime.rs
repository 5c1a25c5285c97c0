mod context;
mod error;
mod io_service;
mod ops_service;
mod segmentation_service;


pub use context::{AppContext, DEFAULT_MODEL_ROOT};
pub use error::{AppError, Result};
pub use io_service::IoService;
pub use ops_service::OpsService;
pub use segmentation_service::{ModelEntry, ScalePreview, SegmentationService};
