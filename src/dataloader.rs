//! DataLoader for batched iteration over datasets.
//!
//! The [`DataLoader`] extracts rows from a [`Dataset`] and collates them into
//! fixed-size, padded batches (see [`collate`](crate::collate)).

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::debug;

use crate::{
    collate::{collate, Batch},
    dataset::Dataset,
    error::{Error, Result},
};

/// A data loader that provides batched iteration over a dataset.
///
/// The DataLoader wraps a dataset and provides:
/// - Configurable batch sizes and pad value
/// - Shuffling (on by default) with a reproducible seed; the row order is
///   reshuffled at the start of every epoch
/// - Option to drop incomplete final batches
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use vlndata::{DType, DataLoader, FrameRef, GroupedDataset, MapFrame};
///
/// let frame: FrameRef = Arc::new(
///     MapFrame::builder(DType::Float32)
///         .scalar("x", vec![0.0, 1.0, 2.0])
///         .vlarr("pt", vec![vec![1.0], vec![], vec![2.0, 3.0]])
///         .build()
///         .unwrap(),
/// );
/// let dataset = GroupedDataset::new(frame)
///     .scalar_group("scalar", ["x"])
///     .vlarr_group("particles", ["pt"]);
///
/// let mut loader = DataLoader::new(dataset).batch_size(2).shuffle(false);
/// assert_eq!(loader.num_batches(), 2);
///
/// for batch in &mut loader {
///     let batch = batch.unwrap();
///     assert_eq!(batch["particles"].ndim(), 3);
/// }
/// ```
#[derive(Debug)]
pub struct DataLoader<D: Dataset> {
    dataset: D,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    pad: f64,
    seed: u64,
    rng: StdRng,
    indices: Vec<usize>,
    epoch: usize,
}

impl<D: Dataset> DataLoader<D> {
    /// Creates a new DataLoader wrapping the given dataset.
    ///
    /// Default configuration:
    /// - batch_size: 1
    /// - shuffle: true
    /// - drop_last: false
    /// - pad: 0
    /// - seed: 0
    pub fn new(dataset: D) -> Self {
        let indices = (0..dataset.len()).collect();
        Self {
            dataset,
            batch_size: 1,
            shuffle: true,
            drop_last: false,
            pad: 0.0,
            seed: 0,
            rng: StdRng::seed_from_u64(0),
            indices,
            epoch: 0,
        }
    }

    /// Sets the batch size.
    ///
    /// Each batch holds at most this many rows. The final batch may have
    /// fewer rows unless `drop_last` is set.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Enables or disables shuffling.
    #[must_use]
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Sets whether to drop the last incomplete batch.
    #[must_use]
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Sets the value used to pad vlarray groups.
    #[must_use]
    pub fn pad(mut self, pad: f64) -> Self {
        self.pad = pad;
        self
    }

    /// Sets the random seed for shuffling and resets the generator.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Returns the configured batch size.
    pub fn get_batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns whether shuffling is enabled.
    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    /// Returns whether drop_last is enabled.
    pub fn is_drop_last(&self) -> bool {
        self.drop_last
    }

    /// Returns the pad value.
    pub fn get_pad(&self) -> f64 {
        self.pad
    }

    /// Returns the shuffle seed.
    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    /// Returns the wrapped dataset.
    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Returns the number of epochs started so far.
    pub fn epochs(&self) -> usize {
        self.epoch
    }

    /// Returns the number of batches per epoch.
    pub fn num_batches(&self) -> usize {
        let len = self.indices.len();
        if self.drop_last {
            len / self.batch_size
        } else {
            len.div_ceil(self.batch_size)
        }
    }

    /// Returns the total number of rows in the underlying dataset.
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Returns true if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Extracts and collates batch `index` of the current epoch's order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= num_batches()`, or
    /// any error from row extraction or collation.
    pub fn get_batch(&self, index: usize) -> Result<Batch> {
        let num_batches = self.num_batches();
        if index >= num_batches {
            return Err(Error::index_out_of_bounds(index, num_batches));
        }

        let start = index * self.batch_size;
        let end = (start + self.batch_size).min(self.indices.len());

        let rows = self.indices[start..end]
            .iter()
            .map(|&i| self.dataset.get(i))
            .collect::<Result<Vec<_>>>()?;

        collate(&rows, self.pad)
    }

    /// Starts a new epoch and returns an iterator over its batches.
    ///
    /// With shuffling enabled the row order is reshuffled first; the
    /// generator carries over between epochs, so every epoch sees a new
    /// order while the whole sequence stays reproducible for a given seed.
    pub fn iter(&mut self) -> DataLoaderIterator<'_, D> {
        if self.shuffle {
            self.indices.shuffle(&mut self.rng);
        }
        self.epoch += 1;
        debug!(
            epoch = self.epoch,
            rows = self.indices.len(),
            batches = self.num_batches(),
            "Starting data loader epoch"
        );

        DataLoaderIterator {
            loader: self,
            position: 0,
        }
    }
}

impl<'a, D: Dataset> IntoIterator for &'a mut DataLoader<D> {
    type Item = Result<Batch>;
    type IntoIter = DataLoaderIterator<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the batches of one epoch.
///
/// A failing batch yields its error; iteration continues with the next
/// batch.
#[derive(Debug)]
pub struct DataLoaderIterator<'a, D: Dataset> {
    loader: &'a DataLoader<D>,
    position: usize,
}

impl<D: Dataset> Iterator for DataLoaderIterator<'_, D> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.loader.num_batches() {
            return None;
        }
        let batch = self.loader.get_batch(self.position);
        self.position += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.loader.num_batches().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl<D: Dataset> ExactSizeIterator for DataLoaderIterator<'_, D> {}

/// Builder for creating DataLoaders with more complex configurations.
#[derive(Debug, Default)]
pub struct DataLoaderBuilder {
    batch_size: Option<usize>,
    shuffle: Option<bool>,
    drop_last: Option<bool>,
    pad: Option<f64>,
    seed: Option<u64>,
}

impl DataLoaderBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Sets whether to shuffle.
    #[must_use]
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = Some(shuffle);
        self
    }

    /// Sets whether to drop the last incomplete batch.
    #[must_use]
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = Some(drop_last);
        self
    }

    /// Sets the pad value.
    #[must_use]
    pub fn pad(mut self, pad: f64) -> Self {
        self.pad = Some(pad);
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds a DataLoader with the given dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch size is zero.
    pub fn build<D: Dataset>(self, dataset: D) -> Result<DataLoader<D>> {
        let batch_size = self.batch_size.unwrap_or(1);
        if batch_size == 0 {
            return Err(Error::invalid_config("batch_size must be greater than 0"));
        }

        let mut loader = DataLoader::new(dataset).batch_size(batch_size);

        if let Some(shuffle) = self.shuffle {
            loader = loader.shuffle(shuffle);
        }
        if let Some(drop_last) = self.drop_last {
            loader = loader.drop_last(drop_last);
        }
        if let Some(pad) = self.pad {
            loader = loader.pad(pad);
        }
        if let Some(seed) = self.seed {
            loader = loader.seed(seed);
        }

        Ok(loader)
    }
}
