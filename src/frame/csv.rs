//! Delimited-text frame loaded through `arrow_csv`.

use std::{
    fs::File,
    io::{BufReader, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{array::ArrayRef, compute::concat_batches, record_batch::RecordBatch};
use arrow_csv::{reader::Format, ReaderBuilder};
use tracing::info;

use super::{ColumnData, Frame, FrameState, MapFrame};
use crate::{
    dtype::DType,
    error::{Error, Result},
};

/// A frame that loads a whole CSV file into memory.
///
/// The first line is the header. Column types are inferred from every record
/// of the file:
/// numeric columns become scalar columns, text columns are parsed as
/// vlarrays serialized as `"a,b,c"` or `"[a,b,c]"` (quoted, since they
/// contain the delimiter). Empty cells are zero-length vlarrays.
///
/// Fast per-row access at the cost of holding every value in memory; see
/// [`TextFrame`](super::TextFrame) for the lighter alternative.
#[derive(Debug, Clone)]
pub struct CsvFrame {
    path: PathBuf,
    inner: MapFrame,
}

impl CsvFrame {
    /// Opens and parses a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a cell cannot be
    /// parsed.
    pub fn open(path: impl AsRef<Path>, dtype: DType) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(e, path))?;
        let mut buf_reader = BufReader::new(file);

        // a vlarray column may hold only single values for many rows
        let (schema, _) = Format::default()
            .with_header(true)
            .infer_schema(&mut buf_reader, None)?;
        let schema = Arc::new(schema);

        buf_reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::io(e, path))?;

        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .build(buf_reader)?;
        let batches: Vec<RecordBatch> = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = concat_batches(&schema, &batches)?;

        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| {
                ColumnData::from_arrow(array.as_ref(), dtype).map(|data| (field.name().clone(), data))
            })
            .collect::<Result<Vec<_>>>()?;
        let inner = MapFrame::from_columns(columns, dtype)?;

        info!(path = %path.display(), rows = inner.len(), columns = inner.columns().len(), "opened csv frame");

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Returns the path of the source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Captures the serializable state of this frame.
    pub fn state(&self) -> FrameState {
        FrameState {
            path: self.path.clone(),
            columns: self.inner.columns().to_vec(),
            len: self.inner.len(),
            dtype: self.inner.dtype(),
        }
    }

    /// Re-opens a frame from a captured state.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or no longer matches the
    /// state.
    pub fn from_state(state: &FrameState) -> Result<Self> {
        let frame = Self::open(&state.path, state.dtype)?;
        state.verify(frame.columns(), frame.len())?;
        Ok(frame)
    }
}

impl Frame for CsvFrame {
    fn columns(&self) -> &[String] {
        self.inner.columns()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn dtype(&self) -> DType {
        self.inner.dtype()
    }

    fn get_scalar(&self, column: &str, index: usize) -> Result<f64> {
        self.inner.get_scalar(column, index)
    }

    fn get_vlarr(&self, column: &str, index: usize) -> Result<Vec<f64>> {
        self.inner.get_vlarr(column, index)
    }

    fn raw_column(&self, column: &str) -> Result<ArrayRef> {
        self.inner.raw_column(column)
    }
}
