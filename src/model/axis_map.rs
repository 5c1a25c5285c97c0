use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AxisKind, CoreError, Metadata, Result};

/// Positions of the semantic axes within one specific array shape.
///
/// The map is only meaningful next to the array it describes. Whenever a
/// dimension is dropped from that array, the matching axis has to be removed
/// through [`AxisMap::remove`] so that every later index shifts down with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxisMap {
    entries: BTreeMap<AxisKind, usize>,
}

impl AxisMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `(label, index)` pairs. Labels that are not one of
    /// `Time`, `Channel`, `Z`, `Y`, `X` are skipped.
    pub fn from_labels<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        let entries = pairs
            .into_iter()
            .filter_map(|(label, index)| AxisKind::from_label(label).map(|axis| (axis, index)))
            .collect();
        Self { entries }
    }

    pub fn from_metadata(metadata: &Metadata) -> Self {
        let entries = metadata
            .dims
            .iter()
            .enumerate()
            .filter(|(_, dim)| dim.axis != AxisKind::Unknown)
            .map(|(index, dim)| (dim.axis, index))
            .collect();
        Self { entries }
    }

    pub fn with(mut self, axis: AxisKind, index: usize) -> Self {
        self.insert(axis, index);
        self
    }

    pub fn insert(&mut self, axis: AxisKind, index: usize) {
        if axis != AxisKind::Unknown {
            self.entries.insert(axis, index);
        }
    }

    pub fn get(&self, axis: AxisKind) -> Option<usize> {
        self.entries.get(&axis).copied()
    }

    pub fn contains(&self, axis: AxisKind) -> bool {
        self.entries.contains_key(&axis)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AxisKind, usize)> + '_ {
        self.entries.iter().map(|(axis, index)| (*axis, *index))
    }

    /// Drops `axis` and shifts every index above it down by one, mirroring
    /// the removal of that dimension from the array. Returns the index the
    /// axis had, or `None` (leaving the map untouched) if it was absent.
    pub fn remove(&mut self, axis: AxisKind) -> Option<usize> {
        let removed = self.entries.remove(&axis)?;
        for index in self.entries.values_mut() {
            if *index > removed {
                *index -= 1;
            }
        }
        Some(removed)
    }

    pub fn without(&self, axis: AxisKind) -> Self {
        let mut reduced = self.clone();
        reduced.remove(axis);
        reduced
    }

    pub fn validate(&self, rank: usize) -> Result<()> {
        let mut seen: BTreeMap<usize, AxisKind> = BTreeMap::new();
        for (axis, index) in self.iter() {
            if index >= rank {
                return Err(CoreError::AxisOutOfRange { axis, index, rank });
            }
            if let Some(first) = seen.insert(index, axis) {
                return Err(CoreError::DuplicateAxisIndex {
                    first,
                    second: axis,
                    index,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for AxisMap {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ordered = self.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|(_, index)| *index);
        formatter.write_str("{")?;
        for (position, (axis, index)) in ordered.iter().enumerate() {
            if position > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{}: {index}", axis.label())?;
        }
        formatter.write_str("}")
    }
}
