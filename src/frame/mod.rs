//! Frames: read-only, row-indexed tables of scalar and vlarray columns.
//!
//! A [`Frame`] holds `len()` rows and a fixed, ordered list of columns. Every
//! column is either a *scalar* column (one number per row) or a *vlarray*
//! column (one variable-length numeric sequence per row). Frames are
//! immutable: nothing in this module writes to an existing row.
//!
//! Concrete backends:
//! - [`MapFrame`] - in-memory columns
//! - [`CsvFrame`] - delimited text loaded through `arrow_csv`
//! - [`TextFrame`] - memory-backed text, tokenized one line at a time
//! - [`ParquetFrame`] - Parquet container, one root column per frame column
//! - [`ReadAheadFrame`] - chunked read-ahead cache over any [`ChunkSource`]
//!
//! Decorators wrap a [`FrameRef`] and present the same contract:
//! [`SubsetFrame`] (row subsets and seeded shuffles) and [`DerivedFrame`]
//! (derived columns, eager or lazy).

use std::{path::PathBuf, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Array, ListArray},
    compute::cast,
    datatypes::{DataType, Field, Float64Type},
};
use serde::{Deserialize, Serialize};

use crate::{
    dtype::DType,
    error::{Error, Result},
};

mod csv;
mod derived;
mod map;
mod parquet;
mod read_ahead;
mod split;
mod subset;
mod text;

pub use csv::CsvFrame;
pub use derived::{derive_fn, DeriveFn, DerivedFrame};
pub use map::{MapFrame, MapFrameBuilder};
pub use parquet::ParquetFrame;
pub use read_ahead::{ChunkSource, ReadAheadFrame};
pub use split::{train_val_test_split, SplitSize};
pub use subset::SubsetFrame;
pub use text::TextFrame;

/// A shared, read-only frame.
pub type FrameRef = Arc<dyn Frame>;

/// A read-only, column-addressable, row-indexed source of values.
///
/// # Contract
///
/// - `index` must satisfy `index < len()`; anything else fails with
///   [`Error::IndexOutOfBounds`].
/// - Unknown columns fail with [`Error::ColumnNotFound`].
/// - Reading a vlarray column with [`get_scalar`](Frame::get_scalar) (or
///   the reverse) is the caller's responsibility; backends are free to
///   return an error or a best-effort value.
/// - Values are coerced through [`dtype`](Frame::dtype) on read.
///
/// Implementations that keep read caches use interior mutability and must
/// stay `Send + Sync`.
pub trait Frame: Send + Sync {
    /// Returns the ordered column names.
    fn columns(&self) -> &[String];

    /// Returns the number of rows.
    fn len(&self) -> usize;

    /// Returns true if the frame has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element dtype values are coerced to.
    fn dtype(&self) -> DType;

    /// Returns true if `column` is one of [`columns`](Frame::columns).
    fn has_column(&self, column: &str) -> bool {
        self.columns().iter().any(|c| c == column)
    }

    /// Returns the scalar value at `column`, row `index`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown columns or out-of-range rows.
    fn get_scalar(&self, column: &str, index: usize) -> Result<f64>;

    /// Returns the vlarray value at `column`, row `index`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown columns or out-of-range rows.
    fn get_vlarr(&self, column: &str, index: usize) -> Result<Vec<f64>>;

    /// Returns a whole column as one Arrow array.
    ///
    /// Scalar columns are returned as a `Float64Array`, vlarray columns as a
    /// `ListArray` of `Float64`. Meant for whole-column inspection, not for
    /// per-row access.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown columns or when the backend read fails.
    fn raw_column(&self, column: &str) -> Result<ArrayRef>;
}

/// Fails with [`Error::IndexOutOfBounds`] unless `index < len`.
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::index_out_of_bounds(index, len))
    }
}

/// Kind of a frame column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// One value per row.
    Scalar,
    /// One variable-length sequence per row.
    VlArray,
}

/// Materialized values of one column, or of a contiguous range of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Scalar values, one per row.
    Scalar(Vec<f64>),
    /// Vlarray values, one sequence per row.
    VlArray(Vec<Vec<f64>>),
}

impl ColumnData {
    /// Returns the number of rows held.
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(values) => values.len(),
            Self::VlArray(rows) => rows.len(),
        }
    }

    /// Returns true if no rows are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the column kind.
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Scalar(_) => ColumnKind::Scalar,
            Self::VlArray(_) => ColumnKind::VlArray,
        }
    }

    /// Returns the scalar at `index`.
    ///
    /// # Errors
    ///
    /// Fails for out-of-range rows and for vlarray data.
    pub fn scalar(&self, column: &str, index: usize) -> Result<f64> {
        check_index(index, self.len())?;
        match self {
            Self::Scalar(values) => Ok(values[index]),
            Self::VlArray(_) => Err(Error::KindMismatch {
                column: column.to_string(),
                expected: "scalar",
            }),
        }
    }

    /// Returns the vlarray at `index`.
    ///
    /// Scalar data reads as a one-element sequence, except that a missing
    /// (NaN) scalar reads as an empty sequence.
    ///
    /// # Errors
    ///
    /// Fails for out-of-range rows.
    pub fn vlarr(&self, index: usize) -> Result<Vec<f64>> {
        check_index(index, self.len())?;
        match self {
            Self::Scalar(values) if values[index].is_nan() => Ok(Vec::new()),
            Self::Scalar(values) => Ok(vec![values[index]]),
            Self::VlArray(rows) => Ok(rows[index].clone()),
        }
    }

    /// Returns rows `[start, end)` as a new column.
    ///
    /// # Errors
    ///
    /// Fails unless `start <= end <= len()`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.len() {
            return Err(Error::index_out_of_bounds(end, self.len()));
        }
        Ok(match self {
            Self::Scalar(values) => Self::Scalar(values[start..end].to_vec()),
            Self::VlArray(rows) => Self::VlArray(rows[start..end].to_vec()),
        })
    }

    /// Gathers rows by index.
    ///
    /// # Errors
    ///
    /// Fails if any index is out of range.
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        let len = self.len();
        if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
            return Err(Error::index_out_of_bounds(bad, len));
        }
        Ok(match self {
            Self::Scalar(values) => Self::Scalar(indices.iter().map(|&i| values[i]).collect()),
            Self::VlArray(rows) => Self::VlArray(indices.iter().map(|&i| rows[i].clone()).collect()),
        })
    }

    /// Appends the rows of `other`.
    ///
    /// # Errors
    ///
    /// Fails when the two columns are of different kinds.
    pub fn extend(&mut self, other: Self) -> Result<()> {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a.extend(b),
            (Self::VlArray(a), Self::VlArray(b)) => a.extend(b),
            _ => return Err(Error::shape_mismatch("cannot append columns of different kinds")),
        }
        Ok(())
    }

    /// Coerces every value through `dtype`.
    #[must_use]
    pub fn coerce(self, dtype: DType) -> Self {
        match self {
            Self::Scalar(values) => Self::Scalar(dtype.coerce_slice(&values)),
            Self::VlArray(rows) => {
                Self::VlArray(rows.iter().map(|row| dtype.coerce_slice(row)).collect())
            }
        }
    }

    /// Converts to an Arrow array (`Float64Array` or `ListArray`).
    pub fn to_arrow(&self) -> ArrayRef {
        match self {
            Self::Scalar(values) => Arc::new(Float64Array::from(values.clone())),
            Self::VlArray(rows) => Arc::new(ListArray::from_iter_primitive::<Float64Type, _, _>(
                rows.iter()
                    .map(|row| Some(row.iter().copied().map(Some).collect::<Vec<_>>())),
            )),
        }
    }

    /// Decodes an Arrow array, coercing values through `dtype`.
    ///
    /// Numeric arrays become scalar data, list arrays become vlarray data and
    /// string arrays are parsed with [`parse_vlarr`]. Null scalars and null
    /// list items read as NaN; null lists and null strings read as empty
    /// sequences.
    ///
    /// # Errors
    ///
    /// Fails for unsupported Arrow types and unparsable strings.
    pub fn from_arrow(array: &dyn Array, dtype: DType) -> Result<Self> {
        let data = match array.data_type() {
            DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(_, _) => {
                let item = Arc::new(Field::new("item", DataType::Float64, true));
                let lists = cast(array, &DataType::List(item))?;
                let lists = lists.as_list::<i32>();
                let rows = (0..lists.len())
                    .map(|i| {
                        if lists.is_null(i) {
                            return Vec::new();
                        }
                        let values = lists.value(i);
                        values
                            .as_primitive::<Float64Type>()
                            .iter()
                            .map(|v| v.unwrap_or(f64::NAN))
                            .collect()
                    })
                    .collect();
                Self::VlArray(rows)
            }
            DataType::Utf8 | DataType::LargeUtf8 => {
                let strings = cast(array, &DataType::Utf8)?;
                let rows = strings
                    .as_string::<i32>()
                    .iter()
                    .map(|cell| cell.map_or_else(|| Ok(Vec::new()), parse_vlarr))
                    .collect::<Result<Vec<_>>>()?;
                Self::VlArray(rows)
            }
            DataType::Null => Self::VlArray(vec![Vec::new(); array.len()]),
            dt if dt.is_numeric() || *dt == DataType::Boolean => {
                let values = cast(array, &DataType::Float64)?;
                Self::Scalar(
                    values
                        .as_primitive::<Float64Type>()
                        .iter()
                        .map(|v| v.unwrap_or(f64::NAN))
                        .collect(),
                )
            }
            other => {
                return Err(Error::parse(format!(
                    "unsupported column type {other} for a frame column"
                )))
            }
        };
        Ok(data.coerce(dtype))
    }
}

/// Parses a vlarray serialized as text.
///
/// Accepts `"a,b,c"` and `"[a,b,c]"`. Surrounding whitespace is ignored and
/// an empty cell (or `"[]"`) is a zero-length vlarray.
///
/// # Errors
///
/// Fails on unbalanced brackets and on elements that are not numbers.
pub fn parse_vlarr(text: &str) -> Result<Vec<f64>> {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix('[') {
        body = rest
            .strip_suffix(']')
            .ok_or_else(|| Error::parse(format!("unterminated vlarray '{text}'")))?;
    }

    let body = body.trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }

    body.split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<f64>()
                .map_err(|e| Error::parse(format!("invalid vlarray element '{token}': {e}")))
        })
        .collect()
}

/// Serializable description of a file-backed frame.
///
/// Holds only what is needed to re-open the frame: the source path, the
/// column list, the row count and the element dtype. Raw payloads are never
/// serialized; re-opening reads the file again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameState {
    /// Source file path.
    pub path: PathBuf,
    /// Column names at the time the state was captured.
    pub columns: Vec<String>,
    /// Row count at the time the state was captured.
    pub len: usize,
    /// Element dtype.
    pub dtype: DType,
}

impl FrameState {
    /// Checks that a re-opened frame still matches this state.
    pub(crate) fn verify(&self, columns: &[String], len: usize) -> Result<()> {
        if self.columns != columns || self.len != len {
            return Err(Error::invalid_config(format!(
                "{} changed since its state was captured ({} rows, {} columns; now {} rows, {} columns)",
                self.path.display(),
                self.len,
                self.columns.len(),
                len,
                columns.len()
            )));
        }
        Ok(())
    }
}
