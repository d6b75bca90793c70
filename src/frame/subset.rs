//! Row-subset and shuffle decorators.

use arrow::{
    array::{ArrayRef, UInt64Array},
    compute::take,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use super::{check_index, Frame, FrameRef};
use crate::{
    dtype::DType,
    error::{Error, Result},
};

/// A frame exposing an explicit list of parent rows.
///
/// Row `i` of this frame is row `indices[i]` of the parent. Indices need not
/// be sorted or unique, so the same type covers subsetting, reordering and
/// replication. The parent is never modified.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use vlndata::{DType, Frame, MapFrame, SubsetFrame};
///
/// let parent = MapFrame::builder(DType::Float64)
///     .scalar("x", vec![10.0, 20.0, 30.0])
///     .build()
///     .unwrap();
/// let subset = SubsetFrame::new(Arc::new(parent), vec![2, 0]).unwrap();
///
/// assert_eq!(subset.len(), 2);
/// assert_eq!(subset.get_scalar("x", 0).unwrap(), 30.0);
/// ```
#[derive(Clone)]
pub struct SubsetFrame {
    parent: FrameRef,
    indices: Vec<usize>,
}

impl std::fmt::Debug for SubsetFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsetFrame")
            .field("parent_len", &self.parent.len())
            .field("len", &self.indices.len())
            .finish()
    }
}

impl SubsetFrame {
    /// Wraps `parent`, exposing the rows listed in `indices`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if any index is not a parent row.
    pub fn new(parent: FrameRef, indices: Vec<usize>) -> Result<Self> {
        let len = parent.len();
        if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
            return Err(Error::index_out_of_bounds(bad, len));
        }
        Ok(Self { parent, indices })
    }

    /// Wraps `parent` in a seeded random permutation of all of its rows.
    ///
    /// The same seed always produces the same permutation.
    pub fn shuffled(parent: FrameRef, seed: u64) -> Self {
        let mut indices: Vec<usize> = (0..parent.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
        Self { parent, indices }
    }

    /// Returns the parent row of every row of this frame.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Returns the wrapped frame.
    pub fn parent(&self) -> &FrameRef {
        &self.parent
    }

    fn parent_index(&self, index: usize) -> Result<usize> {
        check_index(index, self.indices.len())?;
        Ok(self.indices[index])
    }
}

impl Frame for SubsetFrame {
    fn columns(&self) -> &[String] {
        self.parent.columns()
    }

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn dtype(&self) -> DType {
        self.parent.dtype()
    }

    fn get_scalar(&self, column: &str, index: usize) -> Result<f64> {
        self.parent.get_scalar(column, self.parent_index(index)?)
    }

    fn get_vlarr(&self, column: &str, index: usize) -> Result<Vec<f64>> {
        self.parent.get_vlarr(column, self.parent_index(index)?)
    }

    fn raw_column(&self, column: &str) -> Result<ArrayRef> {
        let values = self.parent.raw_column(column)?;
        let indices = UInt64Array::from_iter_values(self.indices.iter().map(|&i| i as u64));
        Ok(take(values.as_ref(), &indices, None)?)
    }
}
