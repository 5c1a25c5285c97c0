use std::path::PathBuf;

use super::{IoService, OpsService, SegmentationService};

/// Directory searched for model definitions when none is configured.
pub const DEFAULT_MODEL_ROOT: &str = "models";

#[derive(Debug, Clone)]
pub struct AppContext {
    io_service: IoService,
    ops_service: OpsService,
    segmentation_service: SegmentationService,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_ROOT)
    }
}

impl AppContext {
    pub fn new(model_root: impl Into<PathBuf>) -> Self {
        Self {
            io_service: IoService,
            ops_service: OpsService::default(),
            segmentation_service: SegmentationService::new(model_root),
        }
    }

    pub fn io_service(&self) -> &IoService {
        &self.io_service
    }

    pub fn ops_service(&self) -> &OpsService {
        &self.ops_service
    }

    pub fn segmentation_service(&self) -> &SegmentationService {
        &self.segmentation_service
    }
}
