//! Row transforms for extracted samples.
//!
//! A [`Transform`] mutates one extracted [`Sample`] at a time. Transforms
//! that need to know the layout of the groups (which position a column has
//! within its group) resolve it once in [`Transform::bind`], against the
//! dataset they are attached to; applying a transform that needs binding
//! before it was bound fails with [`Error::UnboundTransform`].
//!
//! Transforms are attached through
//! [`TransformedDataset`](crate::TransformedDataset), which binds them and
//! runs them in order.
//!
//! [`Error::UnboundTransform`]: crate::Error::UnboundTransform

use crate::{
    dataset::{Dataset, Sample},
    error::Result,
};

mod mask_nan;
mod noise;
mod noise_transform;
mod vlarr;

pub use mask_nan::MaskNanTransform;
pub use noise::{DebugNoise, DiscreteNoise, GaussianNoise, Noise, UniformNoise};
pub use noise_transform::{NoiseColumns, NoiseTransform};
pub use vlarr::{VlArrShuffleTransform, VlArrSortTransform};

/// A mutating step applied to every extracted row.
///
/// Transforms may hold state that changes on every call (seeded random
/// generators), hence `&mut self`. They must be `Send` so a pipeline can be
/// shared across threads behind a lock.
pub trait Transform: Send + std::fmt::Debug {
    /// Returns a short name used in logs and errors.
    fn name(&self) -> &str;

    /// Resolves per-dataset context against `parent`.
    ///
    /// Called once each time the transform is attached to a dataset. Only
    /// the grouping metadata of `parent` may be used; rows must not be read.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform refers to groups or columns that
    /// `parent` does not have.
    fn bind(&mut self, parent: &dyn Dataset) -> Result<()>;

    /// Transforms row `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform is not bound or the sample does not
    /// have the expected layout.
    fn apply(&mut self, sample: Sample, index: usize) -> Result<Sample>;
}
