//! vlndata - Variable-Length Numeric Data Loading in Rust
//!
//! Random-access access to tabular data where a column holds either one
//! number per row (*scalar* columns) or a variable-length numeric sequence
//! per row (*vlarray* columns), turned into fixed-shape, padded batches.
//!
//! # Layers
//!
//! 1. **Frames** ([`Frame`]) - read-only, row-indexed column sources:
//!    in-memory maps, CSV, memory-mapped text, Parquet, and a chunked
//!    read-ahead cache; decorators for row subsets, seeded shuffles and
//!    derived columns
//! 2. **Datasets** ([`Dataset`]) - extraction of named column groups per
//!    row, with caching and transform-pipeline decorators
//! 3. **Transforms** ([`Transform`]) - noise injection, vlarray sorting and
//!    shuffling, NaN masking
//! 4. **Batching** - [`collate`] and the [`DataLoader`]
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use vlndata::{DType, DataLoader, FrameRef, GroupedDataset, MapFrame};
//!
//! let frame: FrameRef = Arc::new(
//!     MapFrame::builder(DType::Float32)
//!         .scalar("energy", vec![10.0, 20.0, 30.0])
//!         .vlarr("pt", vec![vec![1.0, 2.0], vec![3.0], vec![]])
//!         .vlarr("eta", vec![vec![0.1, 0.2], vec![0.3], vec![]])
//!         .build()
//!         .unwrap(),
//! );
//!
//! let dataset = GroupedDataset::new(frame)
//!     .scalar_group("event", ["energy"])
//!     .vlarr_group("particles", ["pt", "eta"]);
//!
//! let mut loader = DataLoader::new(dataset).batch_size(3).pad(-1.0);
//! for batch in &mut loader {
//!     let batch = batch.unwrap();
//!     assert_eq!(batch["event"].shape(), &[3, 1]);
//!     assert_eq!(batch["particles"].shape(), &[3, 2, 2]);
//! }
//! ```

// unsafe_code is forbidden except where explicitly allowed (memory-mapped text)
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_lossless,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::redundant_clone,
        clippy::too_many_lines,
        clippy::float_cmp,
        clippy::similar_names
    )
)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod collate;
pub mod config;
pub mod dataloader;
pub mod dataset;
pub mod dtype;
pub mod error;
pub mod frame;
pub mod transform;

pub use collate::{collate, Batch};
pub use config::{
    construct_dataset, construct_dataset_from_frames, construct_frame, DatasetConfig,
    FrameConfig, FrameSpec, FrameSplits, NoiseSpec, TransformSpec,
};
pub use dataloader::{DataLoader, DataLoaderBuilder, DataLoaderIterator};
pub use dataset::{
    CachedDataset, ColumnGroups, Dataset, DatasetRef, GroupedDataset, Sample, Split,
    TransformedDataset, VlArrLimits,
};
pub use dtype::DType;
pub use error::{Error, Result};
pub use frame::{
    derive_fn, train_val_test_split, ChunkSource, ColumnData, ColumnKind, CsvFrame, DeriveFn,
    DerivedFrame, Frame, FrameRef, FrameState, MapFrame, MapFrameBuilder, ParquetFrame,
    ReadAheadFrame, SplitSize, SubsetFrame, TextFrame,
};
pub use transform::{
    DebugNoise, DiscreteNoise, GaussianNoise, MaskNanTransform, Noise, NoiseColumns,
    NoiseTransform, Transform, UniformNoise, VlArrShuffleTransform, VlArrSortTransform,
};
