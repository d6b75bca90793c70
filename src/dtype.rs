//! Element dtype of frame values.
//!
//! Every frame stores and returns values as `f64`, coerced through the
//! [`DType`] it was constructed with. The dtype is always explicit
//! configuration; there is no process-wide default.

use serde::{Deserialize, Serialize};

/// Element dtype of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// Single precision float.
    #[default]
    Float32,
    /// Double precision float.
    Float64,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
}

impl DType {
    /// Coerces a value to this dtype.
    ///
    /// Floats are rounded to the target precision. Integer dtypes truncate
    /// toward zero and saturate at the type bounds; NaN becomes zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn coerce(self, value: f64) -> f64 {
        match self {
            Self::Float32 => f64::from(value as f32),
            Self::Float64 => value,
            Self::Int32 => f64::from(value as i32),
            Self::Int64 => (value as i64) as f64,
        }
    }

    /// Coerces every value of a slice to this dtype.
    pub fn coerce_slice(self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.coerce(v)).collect()
    }

    /// Returns the lower-case dtype name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
