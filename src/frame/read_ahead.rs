//! Chunked read-ahead caching for backends with a high per-access cost.
//!
//! Each column keeps at most one cached chunk: a contiguous `[start, end)`
//! row range aligned to `chunk_size`. A read inside the cached range is served
//! from memory; any other read loads the aligned chunk around the requested
//! row in one bulk operation and replaces the previous chunk of that column.
//!
//! Sequential access costs one bulk read per `chunk_size` rows. Random access
//! degrades to one bulk read per access. Memory is bounded by
//! `chunk_size * column_count` rows.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Mutex, PoisonError},
};

use arrow::array::ArrayRef;
use tracing::debug;

use super::{check_index, ColumnData, Frame, FrameState, ParquetFrame};
use crate::{
    dtype::DType,
    error::{Error, Result},
};

/// A frame backend able to read a contiguous row range of one column at once.
pub trait ChunkSource: Frame {
    /// Reads rows `[start, end)` of `column`, coerced to the frame dtype.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown columns, invalid ranges, or failed reads.
    fn read_range(&self, column: &str, start: usize, end: usize) -> Result<ColumnData>;
}

#[derive(Debug)]
struct Chunk {
    start: usize,
    end: usize,
    data: ColumnData,
}

impl Chunk {
    fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// A frame that reads its source in fixed-size chunks, caching one chunk per
/// column.
///
/// Results are identical to reading the source directly; only the number of
/// backend reads changes.
///
/// # Example
///
/// ```
/// use vlndata::{DType, Frame, MapFrame, ReadAheadFrame};
///
/// let source = MapFrame::builder(DType::Float64)
///     .scalar("x", (0..10).map(f64::from).collect())
///     .build()
///     .unwrap();
/// let frame = ReadAheadFrame::new(source, 4).unwrap();
///
/// assert_eq!(frame.get_scalar("x", 5).unwrap(), 5.0);
/// ```
#[derive(Debug)]
pub struct ReadAheadFrame<S> {
    source: S,
    chunk_size: usize,
    chunks: Mutex<HashMap<String, Chunk>>,
}

impl<S: ChunkSource> ReadAheadFrame<S> {
    /// Wraps `source`, reading `chunk_size` rows at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if `chunk_size` is zero.
    pub fn new(source: S, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::invalid_config("chunk_size must be greater than 0"));
        }

        Ok(Self {
            source,
            chunk_size,
            chunks: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the cached `[start, end)` range of a column, if any.
    pub fn cached_range(&self, column: &str) -> Option<(usize, usize)> {
        let chunks = self.chunks.lock().unwrap_or_else(PoisonError::into_inner);
        chunks.get(column).map(|chunk| (chunk.start, chunk.end))
    }

    /// Runs `read` on the chunk holding `index`, loading it first if needed.
    fn with_chunk<T>(
        &self,
        column: &str,
        index: usize,
        read: impl FnOnce(&ColumnData, usize) -> Result<T>,
    ) -> Result<T> {
        if !self.source.has_column(column) {
            return Err(Error::column_not_found(column));
        }
        check_index(index, self.source.len())?;

        let mut chunks = self.chunks.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(chunk) = chunks.get(column).filter(|chunk| chunk.contains(index)) {
            return read(&chunk.data, index - chunk.start);
        }

        let start = (index / self.chunk_size) * self.chunk_size;
        let end = (start + self.chunk_size).min(self.source.len());
        debug!(column, start, end, "reading chunk");

        let data = self.source.read_range(column, start, end)?;
        if data.len() != end - start {
            return Err(Error::RowCountMismatch {
                column: column.to_string(),
                expected: end - start,
                actual: data.len(),
            });
        }

        let result = read(&data, index - start);
        chunks.insert(column.to_string(), Chunk { start, end, data });
        result
    }
}

impl ReadAheadFrame<ParquetFrame> {
    /// Opens a Parquet file with chunked read-ahead.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or `chunk_size` is zero.
    pub fn open_parquet(path: impl AsRef<Path>, dtype: DType, chunk_size: usize) -> Result<Self> {
        Self::new(ParquetFrame::open(path, dtype)?, chunk_size)
    }

    /// Captures the serializable state of the underlying file.
    pub fn state(&self) -> FrameState {
        self.source.state()
    }

    /// Re-opens a frame from a captured state.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or no longer matches
    /// the state.
    pub fn from_state(state: &FrameState, chunk_size: usize) -> Result<Self> {
        Self::new(ParquetFrame::from_state(state)?, chunk_size)
    }
}

impl<S: ChunkSource> Frame for ReadAheadFrame<S> {
    fn columns(&self) -> &[String] {
        self.source.columns()
    }

    fn len(&self) -> usize {
        self.source.len()
    }

    fn dtype(&self) -> DType {
        self.source.dtype()
    }

    fn get_scalar(&self, column: &str, index: usize) -> Result<f64> {
        self.with_chunk(column, index, |data, offset| data.scalar(column, offset))
    }

    fn get_vlarr(&self, column: &str, index: usize) -> Result<Vec<f64>> {
        self.with_chunk(column, index, |data, offset| data.vlarr(offset))
    }

    fn raw_column(&self, column: &str) -> Result<ArrayRef> {
        self.source.raw_column(column)
    }
}
