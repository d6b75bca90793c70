//! Datasets: per-row extraction of column groups from a frame.
//!
//! A [`Dataset`] turns row `i` of a [`Frame`](crate::Frame) into a
//! [`Sample`]: a mapping from group name to a numeric array. Scalar groups
//! produce arrays of shape `(C,)`, vlarray groups arrays of shape `(L, C)`,
//! where `C` is the number of columns in the group and `L` the (possibly
//! limited) vlarray length of the row.
//!
//! Decorators present the same contract:
//! - [`CachedDataset`] - extracts each row at most once, hands out copies
//! - [`TransformedDataset`] - runs an ordered list of
//!   [`Transform`](crate::Transform)s over each extracted row

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::{dtype::DType, error::Result, frame::FrameRef};

mod cache;
mod grouped;
mod transformed;

pub use cache::CachedDataset;
pub use grouped::GroupedDataset;
pub use transformed::TransformedDataset;

/// Group name to ordered source columns, in declaration order.
pub type ColumnGroups = IndexMap<String, Vec<String>>;

/// Per-group cap on the vlarray length of a row.
pub type VlArrLimits = HashMap<String, usize>;

/// One extracted row: group name to array, in group declaration order.
pub type Sample = IndexMap<String, ArrayD<f64>>;

/// A shared dataset.
pub type DatasetRef = Arc<dyn Dataset>;

/// A random-access source of extracted rows.
///
/// Implementations must be thread-safe (`Send + Sync`); decorators that
/// keep per-row state use interior mutability.
pub trait Dataset: Send + Sync {
    /// Returns the number of rows.
    fn len(&self) -> usize;

    /// Returns true if the dataset has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element dtype of the underlying frame.
    fn dtype(&self) -> DType;

    /// Returns the underlying frame.
    fn frame(&self) -> &FrameRef;

    /// Returns the scalar groups.
    fn scalar_groups(&self) -> &ColumnGroups;

    /// Returns the vlarray groups.
    fn vlarr_groups(&self) -> &ColumnGroups;

    /// Extracts row `index`.
    ///
    /// # Errors
    ///
    /// Returns an error for out-of-range rows, unknown columns, misaligned
    /// vlarray groups, or failing transforms.
    fn get(&self, index: usize) -> Result<Sample>;
}

impl<D: Dataset + ?Sized> Dataset for Arc<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn dtype(&self) -> DType {
        (**self).dtype()
    }

    fn frame(&self) -> &FrameRef {
        (**self).frame()
    }

    fn scalar_groups(&self) -> &ColumnGroups {
        (**self).scalar_groups()
    }

    fn vlarr_groups(&self) -> &ColumnGroups {
        (**self).vlarr_groups()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        (**self).get(index)
    }
}

/// Which part of a split frame a dataset reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    /// Training rows; datasets get the training transforms.
    #[default]
    Train,
    /// Validation rows.
    Val,
    /// Test rows.
    Test,
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_serde_names() {
        let splits: Vec<Split> = serde_json::from_str(r#"["train", "val", "test"]"#).unwrap();
        assert_eq!(splits, vec![Split::Train, Split::Val, Split::Test]);
        assert_eq!(Split::default(), Split::Train);
        assert_eq!(Split::Val.to_string(), "val");
    }
}
