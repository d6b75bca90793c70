//! In-memory frame backed by a map of columns.

use arrow::array::ArrayRef;
use indexmap::IndexMap;

use super::{ChunkSource, ColumnData, Frame};
use crate::{
    dtype::DType,
    error::{Error, Result},
};

/// A frame holding all of its columns in memory.
///
/// Values are coerced to the frame dtype once, at construction.
///
/// # Example
///
/// ```
/// use vlndata::{DType, Frame, MapFrame};
///
/// let frame = MapFrame::builder(DType::Float64)
///     .scalar("energy", vec![1.0, 2.0, 3.0])
///     .vlarr("pt", vec![vec![1.0, 2.0], vec![], vec![3.0]])
///     .build()
///     .unwrap();
///
/// assert_eq!(frame.len(), 3);
/// assert_eq!(frame.get_vlarr("pt", 0).unwrap(), vec![1.0, 2.0]);
/// ```
#[derive(Debug, Clone)]
pub struct MapFrame {
    data: IndexMap<String, ColumnData>,
    columns: Vec<String>,
    len: usize,
    dtype: DType,
}

impl MapFrame {
    /// Creates a frame from scalar and vlarray columns.
    ///
    /// Scalar columns are listed first, then vlarray columns, each in the
    /// given order.
    ///
    /// # Errors
    ///
    /// Returns an error if column names repeat or if the columns disagree on
    /// the number of rows.
    pub fn new(
        scalars: Vec<(String, Vec<f64>)>,
        vlarrs: Vec<(String, Vec<Vec<f64>>)>,
        dtype: DType,
    ) -> Result<Self> {
        let columns = scalars
            .into_iter()
            .map(|(name, values)| (name, ColumnData::Scalar(values)))
            .chain(
                vlarrs
                    .into_iter()
                    .map(|(name, rows)| (name, ColumnData::VlArray(rows))),
            );
        Self::from_columns(columns, dtype)
    }

    /// Creates a frame from materialized columns, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns an error if column names repeat or if the columns disagree on
    /// the number of rows.
    pub fn from_columns(
        columns: impl IntoIterator<Item = (String, ColumnData)>,
        dtype: DType,
    ) -> Result<Self> {
        let mut data = IndexMap::new();
        let mut len: Option<usize> = None;

        for (name, column) in columns {
            match len {
                None => len = Some(column.len()),
                Some(expected) if expected != column.len() => {
                    return Err(Error::RowCountMismatch {
                        column: name,
                        expected,
                        actual: column.len(),
                    });
                }
                Some(_) => {}
            }

            if data.contains_key(&name) {
                return Err(Error::invalid_config(format!("duplicate column '{name}'")));
            }
            data.insert(name, column.coerce(dtype));
        }

        let columns = data.keys().cloned().collect();
        Ok(Self {
            data,
            columns,
            len: len.unwrap_or(0),
            dtype,
        })
    }

    /// Starts building a frame with the given dtype.
    pub fn builder(dtype: DType) -> MapFrameBuilder {
        MapFrameBuilder {
            columns: Vec::new(),
            dtype,
        }
    }

    /// Returns the materialized data of a column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist.
    pub fn column(&self, column: &str) -> Result<&ColumnData> {
        self.data
            .get(column)
            .ok_or_else(|| Error::column_not_found(column))
    }
}

impl Frame for MapFrame {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn len(&self) -> usize {
        self.len
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn get_scalar(&self, column: &str, index: usize) -> Result<f64> {
        self.column(column)?.scalar(column, index)
    }

    fn get_vlarr(&self, column: &str, index: usize) -> Result<Vec<f64>> {
        self.column(column)?.vlarr(index)
    }

    fn raw_column(&self, column: &str) -> Result<ArrayRef> {
        Ok(self.column(column)?.to_arrow())
    }
}

impl ChunkSource for MapFrame {
    fn read_range(&self, column: &str, start: usize, end: usize) -> Result<ColumnData> {
        self.column(column)?.slice(start, end)
    }
}

/// Builder for [`MapFrame`] that keeps the insertion order of columns.
#[derive(Debug)]
pub struct MapFrameBuilder {
    columns: Vec<(String, ColumnData)>,
    dtype: DType,
}

impl MapFrameBuilder {
    /// Adds a scalar column.
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.push((name.into(), ColumnData::Scalar(values)));
        self
    }

    /// Adds a vlarray column.
    #[must_use]
    pub fn vlarr(mut self, name: impl Into<String>, rows: Vec<Vec<f64>>) -> Self {
        self.columns.push((name.into(), ColumnData::VlArray(rows)));
        self
    }

    /// Builds the frame.
    ///
    /// # Errors
    ///
    /// See [`MapFrame::from_columns`].
    pub fn build(self) -> Result<MapFrame> {
        MapFrame::from_columns(self.columns, self.dtype)
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::Array;

    use super::*;

    fn sample_frame() -> MapFrame {
        MapFrame::builder(DType::Float32)
            .scalar("c1", vec![1.0, 2.0, 3.0, 4.0, -1.0])
            .scalar("c2", vec![9.0, 8.0, 1.0, -2.0, 5.0])
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
            .build()
            .unwrap()
    }

    #[test]
    fn test_columns_in_order() {
        let frame = sample_frame();
        assert_eq!(frame.columns(), ["c1", "c2", "vc1"]);
        assert_eq!(frame.len(), 5);
        assert!(frame.has_column("vc1"));
        assert!(!frame.has_column("vc2"));
    }

    #[test]
    fn test_scalars_listed_before_vlarrays() {
        let frame = MapFrame::new(
            vec![("s".to_string(), vec![1.0])],
            vec![("v".to_string(), vec![vec![2.0]])],
            DType::Float64,
        )
        .unwrap();
        assert_eq!(frame.columns(), ["s", "v"]);
    }

    #[test]
    fn test_get_values() {
        let frame = sample_frame();
        assert_eq!(frame.get_scalar("c2", 3).unwrap(), -2.0);
        assert_eq!(frame.get_vlarr("vc1", 3).unwrap(), vec![4.0, 5.0, 6.0, 7.0]);
        assert!(frame.get_vlarr("vc1", 1).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_and_unknown_column() {
        let frame = sample_frame();
        assert!(matches!(
            frame.get_scalar("c1", 5),
            Err(Error::IndexOutOfBounds { index: 5, len: 5 })
        ));
        assert!(matches!(
            frame.get_vlarr("nope", 0),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_row_count_mismatch_fails_at_construction() {
        let result = MapFrame::builder(DType::Float32)
            .scalar("a", vec![1.0, 2.0])
            .vlarr("b", vec![vec![1.0]])
            .build();
        assert!(matches!(result, Err(Error::RowCountMismatch { .. })));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = MapFrame::builder(DType::Float32)
            .scalar("a", vec![1.0])
            .scalar("a", vec![2.0])
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_dtype_coercion() {
        let frame = MapFrame::builder(DType::Int32)
            .scalar("a", vec![1.9, -1.9])
            .vlarr("b", vec![vec![2.5], vec![]])
            .build()
            .unwrap();
        assert_eq!(frame.get_scalar("a", 0).unwrap(), 1.0);
        assert_eq!(frame.get_scalar("a", 1).unwrap(), -1.0);
        assert_eq!(frame.get_vlarr("b", 0).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_raw_column_len_matches_frame() {
        let frame = sample_frame();
        for column in frame.columns() {
            assert_eq!(frame.raw_column(column).unwrap().len(), frame.len());
        }
    }

    #[test]
    fn test_empty_frame() {
        let frame = MapFrame::builder(DType::Float32).build().unwrap();
        assert!(frame.is_empty());
        assert!(frame.columns().is_empty());
    }
}
