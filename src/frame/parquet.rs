//! Parquet container frame.
//!
//! The container holds one root-level column per frame column. Numeric
//! columns are scalar columns of shape `(N,)`; list columns are ragged
//! vlarray columns of shape `(N, *)`. Columns are discovered from the file
//! schema when the frame is opened.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use arrow::array::ArrayRef;
use parquet::arrow::{
    arrow_reader::{
        ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReaderBuilder, RowSelection,
    },
    ProjectionMask,
};
use tracing::info;

use super::{check_index, ChunkSource, ColumnData, Frame, FrameState};
use crate::{
    dtype::DType,
    error::{Error, Result},
};

/// A frame reading values straight from a Parquet file.
///
/// Every access reads only the requested rows of the requested column, so
/// single-row access pays the full per-read overhead of the container. Wrap
/// it in a [`ReadAheadFrame`](super::ReadAheadFrame) (see
/// [`ReadAheadFrame::open_parquet`](super::ReadAheadFrame::open_parquet))
/// when rows are read mostly in order.
#[derive(Debug)]
pub struct ParquetFrame {
    path: PathBuf,
    file: File,
    metadata: ArrowReaderMetadata,
    columns: Vec<String>,
    len: usize,
    dtype: DType,
}

impl ParquetFrame {
    /// Opens a Parquet file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not valid Parquet.
    pub fn open(path: impl AsRef<Path>, dtype: DType) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(e, path))?;
        let metadata = ArrowReaderMetadata::load(&file, ArrowReaderOptions::default())?;

        let columns: Vec<String> = metadata
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        let len = usize::try_from(metadata.metadata().file_metadata().num_rows())
            .map_err(|_| Error::parse(format!("{} reports a negative row count", path.display())))?;

        info!(path = %path.display(), rows = len, columns = columns.len(), "opened parquet frame");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            metadata,
            columns,
            len,
            dtype,
        })
    }

    /// Returns the path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Captures the serializable state of this frame.
    pub fn state(&self) -> FrameState {
        FrameState {
            path: self.path.clone(),
            columns: self.columns.clone(),
            len: self.len,
            dtype: self.dtype,
        }
    }

    /// Re-opens a frame from a captured state.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or no longer matches
    /// the state.
    pub fn from_state(state: &FrameState) -> Result<Self> {
        let frame = Self::open(&state.path, state.dtype)?;
        state.verify(&frame.columns, frame.len)?;
        Ok(frame)
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::column_not_found(column))
    }
}

impl ChunkSource for ParquetFrame {
    fn read_range(&self, column: &str, start: usize, end: usize) -> Result<ColumnData> {
        let root = self.column_index(column)?;
        if start > end || end > self.len {
            return Err(Error::index_out_of_bounds(end, self.len));
        }

        let file = self.file.try_clone().map_err(|e| Error::io(e, &self.path))?;
        let builder = ParquetRecordBatchReaderBuilder::new_with_metadata(file, self.metadata.clone());
        let projection = ProjectionMask::roots(builder.parquet_schema(), [root]);
        let selection = RowSelection::from_consecutive_ranges(std::iter::once(start..end), self.len);
        let reader = builder
            .with_projection(projection)
            .with_row_selection(selection)
            .with_batch_size((end - start).max(1))
            .build()?;

        let mut data: Option<ColumnData> = None;
        for batch in reader {
            let batch = batch?;
            let part = ColumnData::from_arrow(batch.column(0).as_ref(), self.dtype)?;
            match data.as_mut() {
                Some(data) => data.extend(part)?,
                None => data = Some(part),
            }
        }

        // an empty range still needs the column kind
        match data {
            Some(data) => Ok(data),
            None => {
                let empty =
                    arrow::array::new_empty_array(self.metadata.schema().field(root).data_type());
                ColumnData::from_arrow(empty.as_ref(), self.dtype)
            }
        }
    }
}

impl Frame for ParquetFrame {
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
        check_index(index, self.len)?;
        self.read_range(column, index, index + 1)?.scalar(column, 0)
    }

    fn get_vlarr(&self, column: &str, index: usize) -> Result<Vec<f64>> {
        check_index(index, self.len)?;
        self.read_range(column, index, index + 1)?.vlarr(0)
    }

    fn raw_column(&self, column: &str) -> Result<ArrayRef> {
        Ok(self.read_range(column, 0, self.len)?.to_arrow())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Array, Float64Array, Int64Array, ListArray, RecordBatch},
        datatypes::{DataType, Field, Float64Type, Schema},
    };
    use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

    use super::*;
    use crate::frame::ReadAheadFrame;

    fn vlarrs() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 2.0],
            vec![],
            vec![3.0],
            vec![4.0, 5.0, 6.0, 7.0],
            vec![-1.0],
        ]
    }

    /// Writes a small container with scalar and list columns.
    fn write_container(path: &Path, row_group_size: usize) {
        let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
        let schema = Arc::new(Schema::new(vec![
            Field::new("c1", DataType::Int64, false),
            Field::new("c2", DataType::Float64, false),
            Field::new("vc1", list_type, true),
        ]));

        let lists = ListArray::from_iter_primitive::<Float64Type, _, _>(
            vlarrs()
                .into_iter()
                .map(|row| Some(row.into_iter().map(Some).collect::<Vec<_>>())),
        );

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3, 4, -1])),
                Arc::new(Float64Array::from(vec![9.5, 8.0, 1.0, -2.0, 5.0])),
                Arc::new(lists),
            ],
        )
        .unwrap();

        let file = File::create(path).unwrap();
        let props = WriterProperties::builder()
            .set_max_row_group_size(row_group_size)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props)).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_open_discovers_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.parquet");
        write_container(&path, 1024);

        let frame = ParquetFrame::open(&path, DType::Float32).unwrap();
        assert_eq!(frame.columns(), ["c1", "c2", "vc1"]);
        assert_eq!(frame.len(), 5);
    }

    #[test]
    fn test_reads_scalars_and_vlarrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.parquet");
        write_container(&path, 2);

        let frame = ParquetFrame::open(&path, DType::Int32).unwrap();
        assert_eq!(frame.get_scalar("c1", 4).unwrap(), -1.0);
        assert_eq!(frame.get_scalar("c2", 0).unwrap(), 9.0);
        for (i, row) in vlarrs().iter().enumerate() {
            assert_eq!(&frame.get_vlarr("vc1", i).unwrap(), row);
        }
        assert!(frame.get_scalar("c1", 5).is_err());
        assert!(frame.get_scalar("missing", 0).is_err());
    }

    #[test]
    fn test_raw_column_len() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.parquet");
        write_container(&path, 3);

        let frame = ParquetFrame::open(&path, DType::Float64).unwrap();
        for column in frame.columns() {
            assert_eq!(frame.raw_column(column).unwrap().len(), frame.len());
        }
    }

    #[test]
    fn test_read_ahead_matches_direct_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.parquet");
        write_container(&path, 2);

        let direct = ParquetFrame::open(&path, DType::Float64).unwrap();
        for chunk_size in 1..=6 {
            let chunked = ReadAheadFrame::open_parquet(&path, DType::Float64, chunk_size).unwrap();
            for i in [0, 1, 4, 2, 3, 3, 0] {
                assert_eq!(
                    chunked.get_scalar("c2", i).unwrap(),
                    direct.get_scalar("c2", i).unwrap()
                );
                assert_eq!(
                    chunked.get_vlarr("vc1", i).unwrap(),
                    direct.get_vlarr("vc1", i).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.parquet");
        write_container(&path, 1024);

        let frame = ReadAheadFrame::open_parquet(&path, DType::Float64, 2).unwrap();
        let json = serde_json::to_string(&frame.state()).unwrap();
        let state: FrameState = serde_json::from_str(&json).unwrap();

        let reopened = ReadAheadFrame::from_state(&state, 2).unwrap();
        assert_eq!(reopened.columns(), frame.columns());
        assert_eq!(reopened.get_scalar("c2", 1).unwrap(), 8.0);
    }
}
