//! Memory-backed text frame that parses one line at a time.
//!
//! The raw bytes of the file are kept in memory (memory-mapped, or
//! decompressed for `.gz` and `.xz` inputs) and only the byte offsets of each line are
//! indexed up front. Values are tokenized on demand; the most recently
//! tokenized line is cached, so reading several columns of one row parses it
//! once.
//!
//! # Safety
//!
//! With the `mmap` feature the file is memory-mapped through `memmap2`.
//! Mapping is unsafe because external modification of the file while it is
//! mapped is undefined behavior. The file must not be modified while the
//! frame is alive.

#![allow(unsafe_code)]

use std::{
    collections::HashMap,
    ops::{Deref, Range},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use arrow::array::ArrayRef;
use bytes::Bytes;
#[cfg(feature = "mmap")]
use memmap2::Mmap;
use tracing::info;

use super::{check_index, parse_vlarr, ColumnData, Frame, FrameState};
use crate::{
    dtype::DType,
    error::{Error, Result},
};

/// Raw file contents.
#[derive(Debug)]
enum TextBuffer {
    #[cfg(feature = "mmap")]
    Mapped(Mmap),
    Owned(Bytes),
}

impl Deref for TextBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(feature = "mmap")]
            Self::Mapped(mmap) => mmap,
            Self::Owned(bytes) => bytes,
        }
    }
}

impl TextBuffer {
    fn load(path: &Path) -> Result<Self> {
        #[cfg_attr(not(any(feature = "gzip", feature = "xz")), allow(unused_variables))]
        let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();

        #[cfg(feature = "gzip")]
        if matches!(ext, "gz" | "gzip") {
            let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
            return read_decoded(flate2::read::GzDecoder::new(file), path);
        }

        #[cfg(feature = "xz")]
        if matches!(ext, "xz" | "lz" | "lzip") {
            // accepts both .xz and legacy .lzma streams
            let stream = xz2::stream::Stream::new_auto_decoder(u64::MAX, 0)
                .map_err(|e| Error::parse(format!("cannot start xz decoder: {e}")))?;
            let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
            return read_decoded(xz2::read::XzDecoder::new_stream(file, stream), path);
        }

        #[cfg(feature = "mmap")]
        {
            let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
            if file.metadata().map_err(|e| Error::io(e, path))?.len() == 0 {
                // zero-length files cannot be mapped on every platform
                return Ok(Self::Owned(Bytes::new()));
            }
            // SAFETY: the map is read-only and lives as long as the frame
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(e, path))?;
            Ok(Self::Mapped(mmap))
        }

        #[cfg(not(feature = "mmap"))]
        {
            let data = std::fs::read(path).map_err(|e| Error::io(e, path))?;
            Ok(Self::Owned(Bytes::from(data)))
        }
    }
}

#[cfg(any(feature = "gzip", feature = "xz"))]
fn read_decoded(mut reader: impl std::io::Read, path: &Path) -> Result<TextBuffer> {
    let mut decoded = Vec::new();
    reader
        .read_to_end(&mut decoded)
        .map_err(|e| Error::io(e, path))?;
    Ok(TextBuffer::Owned(Bytes::from(decoded)))
}

#[derive(Debug)]
struct CachedLine {
    index: usize,
    tokens: Vec<String>,
}

/// A frame over a CSV file held in memory as raw bytes.
///
/// Uses far less memory than [`CsvFrame`](super::CsvFrame) at the cost of
/// parsing values on every access. The file format is the same: a header
/// line, then one row per line, vlarrays serialized as `"a,b,c"` or
/// `"[a,b,c]"`. Quoted fields spanning several lines are not supported.
#[derive(Debug)]
pub struct TextFrame {
    path: PathBuf,
    buffer: TextBuffer,
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    lines: Vec<Range<usize>>,
    dtype: DType,
    cached_line: Mutex<Option<CachedLine>>,
}

impl TextFrame {
    /// Opens a text file. Files ending in `.gz` (with the `gzip` feature) or
    /// `.xz`/`.lz` (with the `xz` feature) are decompressed into memory;
    /// other files are memory-mapped (with the `mmap` feature) or read into
    /// memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its header is not
    /// valid UTF-8.
    pub fn open(path: impl AsRef<Path>, dtype: DType) -> Result<Self> {
        let path = path.as_ref();
        let buffer = TextBuffer::load(path)?;

        let mut lines = index_lines(&buffer);
        let columns = if lines.is_empty() {
            Vec::new()
        } else {
            let header = lines.remove(0);
            split_fields(line_str(&buffer, &header)?)?
                .into_iter()
                .map(|name| name.trim().to_string())
                .collect()
        };
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        info!(path = %path.display(), rows = lines.len(), columns = columns.len(), "opened text frame");

        Ok(Self {
            path: path.to_path_buf(),
            buffer,
            columns,
            column_index,
            lines,
            dtype,
            cached_line: Mutex::new(None),
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
            columns: self.columns.clone(),
            len: self.lines.len(),
            dtype: self.dtype,
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
        state.verify(&frame.columns, frame.lines.len())?;
        Ok(frame)
    }

    /// Returns the raw, unparsed text of one cell.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown columns, out-of-range rows, or rows with
    /// too few fields.
    pub fn get_value(&self, column: &str, index: usize) -> Result<String> {
        let position = *self
            .column_index
            .get(column)
            .ok_or_else(|| Error::column_not_found(column))?;
        check_index(index, self.lines.len())?;

        let mut cached = self.cached_line.lock().unwrap_or_else(PoisonError::into_inner);
        if cached.as_ref().map_or(true, |line| line.index != index) {
            let tokens = split_fields(line_str(&self.buffer, &self.lines[index])?)?;
            *cached = Some(CachedLine { index, tokens });
        }

        cached
            .as_ref()
            .and_then(|line| line.tokens.get(position))
            .cloned()
            .ok_or_else(|| Error::parse(format!("row {index} has no field for column '{column}'")))
    }
}

impl Frame for TextFrame {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn len(&self) -> usize {
        self.lines.len()
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn get_scalar(&self, column: &str, index: usize) -> Result<f64> {
        let value = self.get_value(column, index)?;
        parse_scalar(&value).map(|v| self.dtype.coerce(v))
    }

    fn get_vlarr(&self, column: &str, index: usize) -> Result<Vec<f64>> {
        let value = self.get_value(column, index)?;
        Ok(self.dtype.coerce_slice(&parse_vlarr(&value)?))
    }

    fn raw_column(&self, column: &str) -> Result<ArrayRef> {
        let cells = (0..self.lines.len())
            .map(|i| self.get_value(column, i))
            .collect::<Result<Vec<_>>>()?;

        let scalars: Option<Vec<f64>> = cells.iter().map(|cell| parse_scalar(cell).ok()).collect();
        let data = match scalars {
            Some(values) => ColumnData::Scalar(values),
            None => ColumnData::VlArray(
                cells
                    .iter()
                    .map(|cell| parse_vlarr(cell))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(data.coerce(self.dtype).to_arrow())
    }
}

/// Parses a scalar cell; an empty cell is a missing value (NaN).
fn parse_scalar(cell: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|e| Error::parse(format!("invalid scalar '{cell}': {e}")))
}

/// Returns the byte range of every non-empty line, without terminators.
fn index_lines(data: &[u8]) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut start = 0;

    for (pos, _) in data.iter().enumerate().filter(|(_, &b)| b == b'\n') {
        push_line(&mut lines, data, start, pos);
        start = pos + 1;
    }
    push_line(&mut lines, data, start, data.len());

    lines
}

fn push_line(lines: &mut Vec<Range<usize>>, data: &[u8], start: usize, mut end: usize) {
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    if end > start {
        lines.push(start..end);
    }
}

fn line_str<'a>(data: &'a [u8], range: &Range<usize>) -> Result<&'a str> {
    std::str::from_utf8(&data[range.clone()])
        .map_err(|e| Error::parse(format!("line is not valid UTF-8: {e}")))
}

/// Splits one CSV line into fields.
///
/// Vlarray cells holding commas must be quoted; brackets carry no meaning to
/// the tokenizer.
fn split_fields(line: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    let found = reader
        .read_record(&mut record)
        .map_err(|e| Error::parse(format!("invalid line: {e}")))?;
    if !found {
        return Ok(Vec::new());
    }
    Ok(record.iter().map(str::to_string).collect())
}
