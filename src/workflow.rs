mod error;
mod execute;
mod io;
mod report;
mod spec;


pub use error::{Result, WorkflowError};
pub use execute::{masks_dataset, run_recipe, segment_dataset};
pub use io::{load_recipe, save_report};
pub use report::SegmentationReport;
pub use spec::SegmentationRecipe;
