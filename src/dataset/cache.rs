//! Per-row memoization of extracted samples.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::{ColumnGroups, Dataset, Sample};
use crate::{
    dtype::DType,
    error::{Error, Result},
    frame::FrameRef,
};

/// A dataset that extracts each row at most once.
///
/// One slot per row is allocated up front. The first successful access to a
/// row stores its sample; every access, including the first, returns a deep
/// copy, so callers may mutate what they receive without touching the
/// cache. Failed extractions are not cached.
///
/// Placing a [`TransformedDataset`](super::TransformedDataset) on top of a
/// cache applies transforms to fresh copies; placing the cache on top of a
/// transformed dataset stores post-transform samples.
pub struct CachedDataset<D> {
    inner: D,
    slots: Vec<Mutex<Option<Sample>>>,
}

impl<D: Dataset> std::fmt::Debug for CachedDataset<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedDataset")
            .field("len", &self.slots.len())
            .field("cached", &self.cached_count())
            .finish()
    }
}

impl<D: Dataset> CachedDataset<D> {
    /// Wraps `inner` with an empty cache.
    pub fn new(inner: D) -> Self {
        let slots = (0..inner.len()).map(|_| Mutex::new(None)).collect();
        Self { inner, slots }
    }

    /// Returns the wrapped dataset.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Returns the number of rows currently cached.
    pub fn cached_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }
}

impl<D: Dataset> Dataset for CachedDataset<D> {
    fn len(&self) -> usize {
        self.slots.len()
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
        let Some(slot) = self.slots.get(index) else {
            return Err(Error::index_out_of_bounds(index, self.slots.len()));
        };

        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sample) = slot.as_ref() {
            return Ok(sample.clone());
        }

        let sample = self.inner.get(index)?;
        debug!(index, "cached dataset row");
        *slot = Some(sample.clone());
        Ok(sample)
    }
}
