//! Replacement of non-finite values.

use super::Transform;
use crate::{
    dataset::{Dataset, Sample},
    error::Result,
};

/// Replaces every NaN and infinite value of every group with a mask value.
///
/// Needs no binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskNanTransform {
    mask: f64,
}

impl MaskNanTransform {
    /// Masks non-finite values with `mask`.
    pub fn new(mask: f64) -> Self {
        Self { mask }
    }
}

impl Default for MaskNanTransform {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Transform for MaskNanTransform {
    fn name(&self) -> &str {
        "mask-nan"
    }

    fn bind(&mut self, _parent: &dyn Dataset) -> Result<()> {
        Ok(())
    }

    fn apply(&mut self, mut sample: Sample, _index: usize) -> Result<Sample> {
        let mask = self.mask;
        for values in sample.values_mut() {
            values.mapv_inplace(|v| if v.is_finite() { v } else { mask });
        }
        Ok(sample)
    }
}
