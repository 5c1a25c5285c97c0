use std::path::Path;

use crate::formats::{StackLayout, read_dataset, write_dataset, write_labels};
use crate::model::{DatasetF32, LabelDataset};

use super::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct IoService;

impl IoService {
    pub fn read(&self, path: impl AsRef<Path>, layout: &StackLayout) -> Result<DatasetF32> {
        let path = path.as_ref();
        let dataset = read_dataset(path, layout)?;
        tracing::info!(path = %path.display(), shape = ?dataset.shape(), "read image");
        Ok(dataset)
    }

    pub fn write(&self, path: impl AsRef<Path>, dataset: &DatasetF32) -> Result<()> {
        write_dataset(path, dataset)?;
        Ok(())
    }

    pub fn write_labels(&self, path: impl AsRef<Path>, labels: &LabelDataset) -> Result<()> {
        let path = path.as_ref();
        write_labels(path, labels)?;
        tracing::info!(path = %path.display(), shape = ?labels.shape(), "wrote labels");
        Ok(())
    }
}
