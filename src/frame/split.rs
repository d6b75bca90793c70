//! Contiguous train/validation/test splitting.

use serde::{Deserialize, Serialize};

use super::{FrameRef, SubsetFrame};
use crate::error::{Error, Result};

/// Size of a split: an absolute row count or a fraction of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SplitSize {
    /// Absolute number of rows.
    Count(usize),
    /// Fraction of the frame rows, truncated toward zero.
    Fraction(f64),
}

impl SplitSize {
    /// Resolves this size against a frame of `len` rows.
    ///
    /// # Errors
    ///
    /// Returns an error for fractions outside `[0, 1]`.
    pub fn resolve(self, len: usize) -> Result<usize> {
        match self {
            Self::Count(count) => Ok(count),
            Self::Fraction(fraction) if (0.0..=1.0).contains(&fraction) => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let rows = (len as f64 * fraction) as usize;
                Ok(rows)
            }
            Self::Fraction(fraction) => Err(Error::invalid_config(format!(
                "split fraction {fraction} must be within [0, 1]"
            ))),
        }
    }
}

/// Splits `frame` into contiguous train, validation and test frames.
///
/// The first rows go to the train frame, the next `val` rows to the
/// validation frame and the rest to the test frame. Missing sizes count as
/// zero. The train frame receives whatever is left after the validation and
/// test sizes are taken, never a negative count; when the requested sizes
/// exceed the frame, the test frame is short.
///
/// # Errors
///
/// Returns an error for fractions outside `[0, 1]`.
pub fn train_val_test_split(
    frame: &FrameRef,
    val: Option<SplitSize>,
    test: Option<SplitSize>,
) -> Result<(SubsetFrame, SubsetFrame, SubsetFrame)> {
    let len = frame.len();
    let val = val.map_or(Ok(0), |size| size.resolve(len))?;
    let test = test.map_or(Ok(0), |size| size.resolve(len))?;

    let train_end = len.saturating_sub(val.saturating_add(test));
    let val_end = train_end.saturating_add(val).min(len);

    Ok((
        SubsetFrame::new(frame.clone(), (0..train_end).collect())?,
        SubsetFrame::new(frame.clone(), (train_end..val_end).collect())?,
        SubsetFrame::new(frame.clone(), (val_end..len).collect())?,
    ))
}
