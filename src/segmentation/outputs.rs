use std::collections::BTreeMap;

use super::LabelVolume;

/// Name under which the instance labels of a run are published.
pub const MASKS_OUTPUT: &str = "masks";

/// Named results of a finished run.
#[derive(Debug, Clone, Default)]
pub struct TaskOutputs {
    entries: BTreeMap<String, LabelVolume>,
}

impl TaskOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, volume: LabelVolume) {
        self.entries.insert(name.into(), volume);
    }

    pub fn set_masks(&mut self, volume: LabelVolume) {
        self.insert(MASKS_OUTPUT, volume);
    }

    pub fn get(&self, name: &str) -> Option<&LabelVolume> {
        self.entries.get(name)
    }

    pub fn masks(&self) -> Option<&LabelVolume> {
        self.get(MASKS_OUTPUT)
    }

    pub fn take_masks(&mut self) -> Option<LabelVolume> {
        self.entries.remove(MASKS_OUTPUT)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
