//! Column-group extraction over a frame.

use ndarray::{Array1, Array2};

use super::{ColumnGroups, Dataset, Sample, VlArrLimits};
use crate::{
    dtype::DType,
    error::{Error, Result},
    frame::{check_index, FrameRef},
};

/// The base dataset: extracts scalar and vlarray groups from each frame row.
///
/// For row `i`, every scalar group yields `[get_scalar(c, i) for c in
/// group]` and every vlarray group yields an `(L, C)` array whose columns
/// are the vlarrays of the group's columns. The first column of a vlarray
/// group fixes the reference length `R` of the row; every other column must
/// have exactly `R` values. `L` is `R`, capped by the group limit if one is
/// configured, keeping the first `L` values.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use vlndata::{DType, Dataset, GroupedDataset, MapFrame};
///
/// let frame = MapFrame::builder(DType::Float64)
///     .scalar("col1", vec![1.0, 2.0, 3.0])
///     .scalar("col2", vec![4.0, 5.0, 6.0])
///     .build()
///     .unwrap();
///
/// let dataset = GroupedDataset::new(Arc::new(frame))
///     .scalar_group("grp1", ["col2"])
///     .scalar_group("grp2", ["col2", "col1"]);
///
/// let row = dataset.get(1).unwrap();
/// assert_eq!(row["grp2"].as_slice().unwrap(), &[5.0, 2.0]);
/// ```
#[derive(Clone)]
pub struct GroupedDataset {
    frame: FrameRef,
    scalar_groups: ColumnGroups,
    vlarr_groups: ColumnGroups,
    vlarr_limits: VlArrLimits,
}

impl std::fmt::Debug for GroupedDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupedDataset")
            .field("len", &self.frame.len())
            .field("scalar_groups", &self.scalar_groups)
            .field("vlarr_groups", &self.vlarr_groups)
            .field("vlarr_limits", &self.vlarr_limits)
            .finish()
    }
}

impl GroupedDataset {
    /// Creates a dataset over `frame` with no groups.
    pub fn new(frame: FrameRef) -> Self {
        Self::with_groups(
            frame,
            ColumnGroups::new(),
            ColumnGroups::new(),
            VlArrLimits::new(),
        )
    }

    /// Creates a dataset with the given groups and limits.
    pub fn with_groups(
        frame: FrameRef,
        scalar_groups: ColumnGroups,
        vlarr_groups: ColumnGroups,
        vlarr_limits: VlArrLimits,
    ) -> Self {
        Self {
            frame,
            scalar_groups,
            vlarr_groups,
            vlarr_limits,
        }
    }

    /// Adds (or replaces) a scalar group.
    #[must_use]
    pub fn scalar_group<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.scalar_groups
            .insert(name.into(), columns.into_iter().map(Into::into).collect());
        self
    }

    /// Adds (or replaces) a vlarray group.
    #[must_use]
    pub fn vlarr_group<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.vlarr_groups
            .insert(name.into(), columns.into_iter().map(Into::into).collect());
        self
    }

    /// Caps the vlarray length of a group.
    #[must_use]
    pub fn vlarr_limit(mut self, name: impl Into<String>, limit: usize) -> Self {
        self.vlarr_limits.insert(name.into(), limit);
        self
    }

    /// Returns the configured vlarray limits.
    pub fn vlarr_limits(&self) -> &VlArrLimits {
        &self.vlarr_limits
    }

    /// Extracts scalar group `name` of row `index` as a `(C,)` array.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown groups or columns and out-of-range rows.
    pub fn extract_scalar_group(&self, name: &str, index: usize) -> Result<Array1<f64>> {
        let columns = self
            .scalar_groups
            .get(name)
            .ok_or_else(|| Error::group_not_found(name))?;

        columns
            .iter()
            .map(|column| self.frame.get_scalar(column, index))
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    /// Extracts vlarray group `name` of row `index` as an `(L, C)` array.
    ///
    /// A group without columns yields a `(0, 0)` array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] when a column disagrees with the
    /// reference length of the group, and an error for unknown groups or
    /// columns and out-of-range rows.
    pub fn extract_vlarr_group(&self, name: &str, index: usize) -> Result<Array2<f64>> {
        let columns = self
            .vlarr_groups
            .get(name)
            .ok_or_else(|| Error::group_not_found(name))?;

        let Some((first, rest)) = columns.split_first() else {
            return Ok(Array2::zeros((0, 0)));
        };

        let first_vlarr = self.frame.get_vlarr(first, index)?;
        let reference = first_vlarr.len();
        let length = self
            .vlarr_limits
            .get(name)
            .map_or(reference, |&limit| limit.min(reference));

        let mut result = Array2::zeros((length, columns.len()));
        for (row, &value) in first_vlarr.iter().take(length).enumerate() {
            result[[row, 0]] = value;
        }

        for (position, column) in rest.iter().enumerate() {
            let vlarr = self.frame.get_vlarr(column, index)?;
            if vlarr.len() != reference {
                return Err(Error::LengthMismatch {
                    group: name.to_string(),
                    column: column.clone(),
                    index,
                    expected: reference,
                    actual: vlarr.len(),
                });
            }
            for (row, &value) in vlarr.iter().take(length).enumerate() {
                result[[row, position + 1]] = value;
            }
        }

        Ok(result)
    }
}

impl Dataset for GroupedDataset {
    fn len(&self) -> usize {
        self.frame.len()
    }

    fn dtype(&self) -> DType {
        self.frame.dtype()
    }

    fn frame(&self) -> &FrameRef {
        &self.frame
    }

    fn scalar_groups(&self) -> &ColumnGroups {
        &self.scalar_groups
    }

    fn vlarr_groups(&self) -> &ColumnGroups {
        &self.vlarr_groups
    }

    fn get(&self, index: usize) -> Result<Sample> {
        check_index(index, self.frame.len())?;

        let mut sample = Sample::with_capacity(self.scalar_groups.len() + self.vlarr_groups.len());
        for name in self.scalar_groups.keys() {
            let values = self.extract_scalar_group(name, index)?;
            sample.insert(name.clone(), values.into_dyn());
        }
        for name in self.vlarr_groups.keys() {
            let values = self.extract_vlarr_group(name, index)?;
            sample.insert(name.clone(), values.into_dyn());
        }

        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ndarray::array;

    use super::*;
    use crate::frame::{Frame, MapFrame};

    fn frame() -> FrameRef {
        Arc::new(
            MapFrame::builder(DType::Float32)
                .scalar("c1", vec![1.0, 2.0, 3.0, 4.0, -1.0])
                .scalar("c2", vec![9.0, 8.0, 1.0, -2.0, 5.0])
                .scalar("c3", vec![0.0, 1.0, 0.0, 1.0, 0.0])
                .vlarr(
                    "vc1",
                    vec![
                        vec![1.0, 2.0],
                        vec![],
                        vec![3.0],
                        vec![4.0, 5.0, 6.0, 7.0],
                        vec![-1.0],
                    ],
                )
                .vlarr(
                    "vc2",
                    vec![
                        vec![0.0, 8.0],
                        vec![],
                        vec![1.0],
                        vec![1.0, 2.0, 3.0, 4.0],
                        vec![-2.0],
                    ],
                )
                .vlarr(
                    "vc3",
                    vec![vec![1.0], vec![], vec![], vec![1.0], vec![1.0]],
                )
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_scalar_group_matches_frame() {
        let frame = frame();
        let dataset = GroupedDataset::new(frame.clone()).scalar_group("g", ["c1", "c3"]);
        for i in 0..frame.len() {
            let sample = dataset.get(i).unwrap();
            let expected = vec![
                frame.get_scalar("c1", i).unwrap(),
                frame.get_scalar("c3", i).unwrap(),
            ];
            assert_eq!(sample["g"].as_slice().unwrap(), expected.as_slice());
        }
    }

    #[test]
    fn test_vlarr_group_shape_and_values() {
        let dataset = GroupedDataset::new(frame()).vlarr_group("v", ["vc1", "vc2"]);
        let sample = dataset.get(3).unwrap();
        assert_eq!(
            sample["v"],
            array![[4.0, 1.0], [5.0, 2.0], [6.0, 3.0], [7.0, 4.0]].into_dyn()
        );

        let empty = dataset.get(1).unwrap();
        assert_eq!(empty["v"].shape(), &[0, 2]);
    }

    #[test]
    fn test_vlarr_limit_keeps_first_entries() {
        let dataset = GroupedDataset::new(frame())
            .vlarr_group("v", ["vc1", "vc2"])
            .vlarr_limit("v", 2);
        let sample = dataset.get(3).unwrap();
        assert_eq!(sample["v"], array![[4.0, 1.0], [5.0, 2.0]].into_dyn());

        // limit above the reference length leaves the row untouched
        let sample = dataset.get(2).unwrap();
        assert_eq!(sample["v"], array![[3.0, 1.0]].into_dyn());
    }

    #[test]
    fn test_vlarr_length_mismatch_fails() {
        let dataset = GroupedDataset::new(frame()).vlarr_group("v", ["vc1", "vc3"]);
        assert!(dataset.get(4).is_ok());
        assert!(matches!(
            dataset.get(0),
            Err(Error::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_length_checked_before_truncation() {
        let dataset = GroupedDataset::new(frame())
            .vlarr_group("v", ["vc1", "vc3"])
            .vlarr_limit("v", 1);
        assert!(matches!(
            dataset.get(0),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_vlarr_group_is_degenerate() {
        let dataset = GroupedDataset::new(frame()).vlarr_group("v", Vec::<String>::new());
        assert_eq!(dataset.get(0).unwrap()["v"].shape(), &[0, 0]);
    }

    #[test]
    fn test_groups_in_declaration_order() {
        let dataset = GroupedDataset::new(frame())
            .vlarr_group("vb", ["vc1"])
            .scalar_group("sb", ["c2"])
            .scalar_group("sa", ["c1"])
            .vlarr_group("va", ["vc2"]);
        let sample = dataset.get(0).unwrap();
        let keys: Vec<&str> = sample.keys().map(String::as_str).collect();
        assert_eq!(keys, ["sb", "sa", "vb", "va"]);
    }

    #[test]
    fn test_errors() {
        let dataset = GroupedDataset::new(frame()).scalar_group("g", ["c1", "missing"]);
        assert!(matches!(
            dataset.get(0),
            Err(Error::ColumnNotFound { .. })
        ));
        assert!(matches!(
            dataset.get(5),
            Err(Error::IndexOutOfBounds { index: 5, len: 5 })
        ));
        assert!(matches!(
            dataset.extract_scalar_group("nope", 0),
            Err(Error::GroupNotFound { .. })
        ));
    }
}
