//! Transform pipeline decorator.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::{ColumnGroups, Dataset, Sample};
use crate::{dtype::DType, error::Result, frame::FrameRef, transform::Transform};

/// A dataset that runs an ordered list of transforms over every row.
///
/// Every transform is bound once, when the pipeline is built, with the
/// pipeline itself as the parent dataset. On access the wrapped dataset
/// extracts the row and each transform is applied in list order.
///
/// Transforms hold mutable state (random generators), so they run under a
/// lock: concurrent `get` calls on one pipeline are serialized.
pub struct TransformedDataset<D> {
    inner: D,
    transforms: Mutex<Vec<Box<dyn Transform>>>,
}

impl<D: Dataset> std::fmt::Debug for TransformedDataset<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let transforms = self.transforms.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("TransformedDataset")
            .field("len", &self.inner.len())
            .field(
                "transforms",
                &transforms.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<D: Dataset> TransformedDataset<D> {
    /// Wraps `inner` and binds every transform to the new pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first bind error, for example a transform naming a group
    /// or column the dataset does not have.
    pub fn new(inner: D, transforms: Vec<Box<dyn Transform>>) -> Result<Self> {
        let mut dataset = Self {
            inner,
            transforms: Mutex::new(Vec::with_capacity(transforms.len())),
        };
        for transform in transforms {
            dataset.push(transform)?;
        }
        Ok(dataset)
    }

    /// Binds `transform` to this pipeline and appends it.
    ///
    /// # Errors
    ///
    /// Returns the bind error; the transform is not appended.
    pub fn push(&mut self, mut transform: Box<dyn Transform>) -> Result<()> {
        transform.bind(&*self)?;
        debug!(transform = transform.name(), "bound transform");
        self.transforms
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transform);
        Ok(())
    }

    /// Returns the wrapped dataset.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Returns the number of transforms in the pipeline.
    pub fn num_transforms(&self) -> usize {
        self.transforms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<D: Dataset> Dataset for TransformedDataset<D> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn dtype(&self) -> DType {
        self.inner.dtype()
    }

    fn frame(&self) -> &FrameRef {
        self.inner.frame()
    }

    fn scalar_groups(&self) -> &ColumnGroups {
        self.inner.scalar_groups()
    }

    fn vlarr_groups(&self) -> &ColumnGroups {
        self.inner.vlarr_groups()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let mut sample = self.inner.get(index)?;
        let mut transforms = self.transforms.lock().unwrap_or_else(PoisonError::into_inner);
        for transform in transforms.iter_mut() {
            sample = transform.apply(sample, index)?;
        }
        Ok(sample)
    }
}
