//! Declarative construction of frames and datasets.
//!
//! A [`DatasetConfig`] describes a whole input pipeline as JSON: which
//! backend to open, whether to shuffle and split its rows, how to group
//! columns, and which transforms to attach for training and evaluation.
//!
//! ```json
//! {
//!   "frame": { "name": "csv", "path": "particles.csv", "dtype": "float32" },
//!   "shuffle": true,
//!   "seed": 7,
//!   "val_size": 0.2,
//!   "split": "train",
//!   "scalar_groups": { "event": ["energy"] },
//!   "vlarr_groups": { "particles": ["pt", "eta"] },
//!   "vlarr_limits": { "particles": 32 },
//!   "transform_train": [
//!     { "name": "vlarr-shuffle", "vlarr_group": "particles", "seed": 1 }
//!   ],
//!   "transform_test": [
//!     { "name": "vlarr-sort", "vlarr_group": "particles", "column": "pt" }
//!   ]
//! }
//! ```
//!
//! Derived columns are closures and cannot be expressed in JSON; they are
//! passed alongside the config to [`construct_frame`] and
//! [`construct_dataset`].

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    dataset::{
        CachedDataset, ColumnGroups, Dataset, DatasetRef, GroupedDataset, Split,
        TransformedDataset, VlArrLimits,
    },
    dtype::DType,
    error::{Error, Result},
    frame::{
        train_val_test_split, CsvFrame, DeriveFn, DerivedFrame, Frame, FrameRef, MapFrame,
        ParquetFrame, ReadAheadFrame, SplitSize, SubsetFrame, TextFrame,
    },
    transform::{
        DebugNoise, DiscreteNoise, GaussianNoise, MaskNanTransform, Noise, NoiseColumns,
        NoiseTransform, Transform, UniformNoise, VlArrShuffleTransform, VlArrSortTransform,
    },
};

fn default_true() -> bool {
    true
}

/// A frame backend to open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum FrameSpec {
    /// Delimited text loaded whole ([`CsvFrame`]).
    Csv {
        /// Input file.
        path: PathBuf,
        /// Element dtype.
        #[serde(default)]
        dtype: DType,
    },
    /// Memory-backed text tokenized per line ([`TextFrame`]).
    Text {
        /// Input file, optionally gzip-compressed.
        path: PathBuf,
        /// Element dtype.
        #[serde(default)]
        dtype: DType,
    },
    /// Parquet read per access ([`ParquetFrame`]).
    Parquet {
        /// Input file.
        path: PathBuf,
        /// Element dtype.
        #[serde(default)]
        dtype: DType,
    },
    /// Parquet behind the chunked read-ahead cache ([`ReadAheadFrame`]).
    ParquetReadAhead {
        /// Input file.
        path: PathBuf,
        /// Element dtype.
        #[serde(default)]
        dtype: DType,
        /// Rows loaded per chunk.
        chunk_size: usize,
    },
    /// Columns given inline ([`MapFrame`]).
    Map {
        /// Scalar columns, one value per row.
        #[serde(default)]
        scalar_data: IndexMap<String, Vec<f64>>,
        /// Vlarray columns, one sequence per row.
        #[serde(default)]
        vlarr_data: IndexMap<String, Vec<Vec<f64>>>,
        /// Element dtype.
        #[serde(default)]
        dtype: DType,
    },
}

impl FrameSpec {
    /// Returns the input path, if the frame is file-backed.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Csv { path, .. }
            | Self::Text { path, .. }
            | Self::Parquet { path, .. }
            | Self::ParquetReadAhead { path, .. } => Some(path),
            Self::Map { .. } => None,
        }
    }

    /// Opens the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's open error.
    pub fn open(&self) -> Result<FrameRef> {
        let frame: FrameRef = match self {
            Self::Csv { path, dtype } => Arc::new(CsvFrame::open(path, *dtype)?),
            Self::Text { path, dtype } => Arc::new(TextFrame::open(path, *dtype)?),
            Self::Parquet { path, dtype } => Arc::new(ParquetFrame::open(path, *dtype)?),
            Self::ParquetReadAhead {
                path,
                dtype,
                chunk_size,
            } => Arc::new(ReadAheadFrame::open_parquet(path, *dtype, *chunk_size)?),
            Self::Map {
                scalar_data,
                vlarr_data,
                dtype,
            } => Arc::new(MapFrame::new(
                scalar_data.clone().into_iter().collect(),
                vlarr_data.clone().into_iter().collect(),
                *dtype,
            )?),
        };
        Ok(frame)
    }
}

/// How to open, decorate and split a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// The backend to open.
    pub frame: FrameSpec,
    /// Whether to shuffle the rows before splitting.
    #[serde(default)]
    pub shuffle: bool,
    /// Seed of the row shuffle.
    #[serde(default)]
    pub seed: u64,
    /// Validation split size; the frame is split when this or `test_size`
    /// is set.
    #[serde(default)]
    pub val_size: Option<SplitSize>,
    /// Test split size.
    #[serde(default)]
    pub test_size: Option<SplitSize>,
    /// Whether derived columns are evaluated on first access.
    #[serde(default)]
    pub lazy_derived: bool,
}

impl FrameConfig {
    /// Creates a config that opens `frame` without shuffling or splitting.
    pub fn new(frame: FrameSpec) -> Self {
        Self {
            frame,
            shuffle: false,
            seed: 0,
            val_size: None,
            test_size: None,
            lazy_derived: false,
        }
    }

    /// Returns true if the frame is split into train, validation and test
    /// parts.
    pub fn is_split(&self) -> bool {
        self.val_size.is_some() || self.test_size.is_some()
    }
}

/// A constructed frame, whole or split.
#[derive(Clone)]
pub enum FrameSplits {
    /// The whole frame.
    Full(FrameRef),
    /// Contiguous train, validation and test parts.
    Split {
        /// Training rows.
        train: FrameRef,
        /// Validation rows.
        val: FrameRef,
        /// Test rows.
        test: FrameRef,
    },
}

impl std::fmt::Debug for FrameSplits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full(frame) => f.debug_tuple("Full").field(&frame.len()).finish(),
            Self::Split { train, val, test } => f
                .debug_struct("Split")
                .field("train", &train.len())
                .field("val", &val.len())
                .field("test", &test.len())
                .finish(),
        }
    }
}

impl FrameSplits {
    /// Returns the frame for `split`; a whole frame serves every split.
    pub fn select(&self, split: Split) -> FrameRef {
        match self {
            Self::Full(frame) => Arc::clone(frame),
            Self::Split { train, val, test } => Arc::clone(match split {
                Split::Train => train,
                Split::Val => val,
                Split::Test => test,
            }),
        }
    }
}

/// Opens the frame of `config`, adds `derived` columns, shuffles and splits.
///
/// Steps run in that order: derived columns are computed over the
/// unshuffled backend, and the split is taken from the shuffled rows.
///
/// # Errors
///
/// Returns open, derivation or split errors.
pub fn construct_frame(
    config: &FrameConfig,
    derived: impl IntoIterator<Item = (String, DeriveFn)>,
) -> Result<FrameSplits> {
    let mut frame = config.frame.open()?;

    let derived: Vec<(String, DeriveFn)> = derived.into_iter().collect();
    if !derived.is_empty() {
        frame = Arc::new(DerivedFrame::new(frame, derived, config.lazy_derived)?);
    }

    if config.shuffle {
        frame = Arc::new(SubsetFrame::shuffled(frame, config.seed));
    }

    if !config.is_split() {
        return Ok(FrameSplits::Full(frame));
    }

    let (train, val, test) = train_val_test_split(&frame, config.val_size, config.test_size)?;
    info!(
        train = train.len(),
        val = val.len(),
        test = test.len(),
        "Split frame"
    );
    Ok(FrameSplits::Split {
        train: Arc::new(train),
        val: Arc::new(val),
        test: Arc::new(test),
    })
}

/// Random source of a [`NoiseTransform`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum NoiseSpec {
    /// Constant value ([`DebugNoise`]).
    Debug {
        /// The value.
        value: f64,
    },
    /// Uniform on `[low, high)` ([`UniformNoise`]).
    Uniform {
        /// Lower bound.
        #[serde(alias = "a")]
        low: f64,
        /// Upper bound.
        #[serde(alias = "b")]
        high: f64,
        /// Generator seed.
        #[serde(default)]
        seed: u64,
    },
    /// Draws from a fixed set of values ([`DiscreteNoise`]).
    Discrete {
        /// Candidate values.
        values: Vec<f64>,
        /// Optional probabilities, one per value.
        #[serde(default)]
        prob: Option<Vec<f64>>,
        /// Generator seed.
        #[serde(default)]
        seed: u64,
    },
    /// Normal distribution ([`GaussianNoise`]).
    #[serde(alias = "normal")]
    Gaussian {
        /// Mean.
        mu: f64,
        /// Standard deviation.
        sigma: f64,
        /// Generator seed.
        #[serde(default)]
        seed: u64,
    },
}

impl NoiseSpec {
    /// Builds the noise source.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid distribution parameters.
    pub fn build(&self) -> Result<Box<dyn Noise>> {
        Ok(match self {
            Self::Debug { value } => Box::new(DebugNoise::new(*value)),
            Self::Uniform { low, high, seed } => Box::new(UniformNoise::new(*low, *high, *seed)?),
            Self::Discrete { values, prob, seed } => {
                Box::new(DiscreteNoise::new(values.clone(), prob.clone(), *seed)?)
            }
            Self::Gaussian { mu, sigma, seed } => {
                Box::new(GaussianNoise::new(*mu, *sigma, *seed)?)
            }
        })
    }
}

/// A transform to attach to a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum TransformSpec {
    /// [`MaskNanTransform`].
    MaskNan {
        /// Replacement for non-finite values.
        #[serde(default)]
        mask: f64,
    },
    /// [`NoiseTransform`].
    Noise {
        /// Random source.
        noise: NoiseSpec,
        /// One draw shared by every target value of a row.
        #[serde(default)]
        correlated: bool,
        /// Multiplicative instead of additive noise.
        #[serde(default)]
        relative: bool,
        /// Scalar groups and the columns that receive noise.
        #[serde(default)]
        scalar_groups: IndexMap<String, NoiseColumns>,
        /// Vlarray groups and the columns that receive noise.
        #[serde(default)]
        vlarr_groups: IndexMap<String, NoiseColumns>,
    },
    /// [`VlArrShuffleTransform`].
    VlarrShuffle {
        /// Group whose rows are shuffled.
        vlarr_group: String,
        /// Generator seed.
        #[serde(default)]
        seed: u64,
    },
    /// [`VlArrSortTransform`].
    VlarrSort {
        /// Group whose rows are sorted.
        vlarr_group: String,
        /// Sort key column.
        column: String,
        /// Ascending order.
        #[serde(default = "default_true")]
        ascending: bool,
    },
}

impl TransformSpec {
    /// Builds the (unbound) transform.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid noise parameters.
    pub fn build(&self) -> Result<Box<dyn Transform>> {
        Ok(match self {
            Self::MaskNan { mask } => Box::new(MaskNanTransform::new(*mask)),
            Self::Noise {
                noise,
                correlated,
                relative,
                scalar_groups,
                vlarr_groups,
            } => {
                let mut transform = NoiseTransform::new(noise.build()?)
                    .correlated(*correlated)
                    .relative(*relative);
                for (group, columns) in scalar_groups {
                    transform = transform.scalar_group(group.clone(), columns.clone());
                }
                for (group, columns) in vlarr_groups {
                    transform = transform.vlarr_group(group.clone(), columns.clone());
                }
                Box::new(transform)
            }
            Self::VlarrShuffle { vlarr_group, seed } => {
                Box::new(VlArrShuffleTransform::new(vlarr_group.clone(), *seed))
            }
            Self::VlarrSort {
                vlarr_group,
                column,
                ascending,
            } => Box::new(VlArrSortTransform::new(
                vlarr_group.clone(),
                column.clone(),
                *ascending,
            )),
        })
    }
}

/// A complete dataset pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Frame construction.
    #[serde(flatten)]
    pub frame: FrameConfig,
    /// Whether to cache extracted rows.
    #[serde(default)]
    pub cache: bool,
    /// Which part of a split frame to read.
    #[serde(default)]
    pub split: Split,
    /// Scalar groups.
    #[serde(default)]
    pub scalar_groups: ColumnGroups,
    /// Vlarray groups.
    #[serde(default)]
    pub vlarr_groups: ColumnGroups,
    /// Vlarray length caps.
    #[serde(default)]
    pub vlarr_limits: VlArrLimits,
    /// Transforms attached for the train split.
    #[serde(default)]
    pub transform_train: Option<Vec<TransformSpec>>,
    /// Transforms attached for the validation and test splits.
    #[serde(default)]
    pub transform_test: Option<Vec<TransformSpec>>,
}

impl DatasetConfig {
    /// Creates a config over `frame` with no groups and no transforms.
    pub fn new(frame: FrameSpec) -> Self {
        Self {
            frame: FrameConfig::new(frame),
            cache: false,
            split: Split::Train,
            scalar_groups: ColumnGroups::new(),
            vlarr_groups: ColumnGroups::new(),
            vlarr_limits: VlArrLimits::new(),
            transform_train: None,
            transform_test: None,
        }
    }

    /// Parses a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config from `path`.
    ///
    /// # Errors
    ///
    /// Returns I/O or parse errors.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        Self::from_json(&json)
    }

    /// Returns the transforms attached for the configured split.
    pub fn transforms(&self) -> Option<&[TransformSpec]> {
        match self.split {
            Split::Train => self.transform_train.as_deref(),
            Split::Val | Split::Test => self.transform_test.as_deref(),
        }
    }
}

/// Builds the dataset described by `config`.
///
/// # Errors
///
/// Returns frame construction errors and transform bind errors.
pub fn construct_dataset(
    config: &DatasetConfig,
    derived: impl IntoIterator<Item = (String, DeriveFn)>,
) -> Result<DatasetRef> {
    let frames = construct_frame(&config.frame, derived)?;
    construct_dataset_from_frames(&frames, config)
}

/// Builds a dataset over already constructed frames.
///
/// Picks the frame of `config.split`, groups its columns, optionally
/// caches extracted rows, then attaches the train transforms (train split)
/// or the test transforms (validation and test splits). The frame-building
/// fields of `config` are ignored.
///
/// # Errors
///
/// Returns transform build or bind errors.
pub fn construct_dataset_from_frames(
    frames: &FrameSplits,
    config: &DatasetConfig,
) -> Result<DatasetRef> {
    let frame = frames.select(config.split);

    let mut dataset: DatasetRef = Arc::new(GroupedDataset::with_groups(
        frame,
        config.scalar_groups.clone(),
        config.vlarr_groups.clone(),
        config.vlarr_limits.clone(),
    ));

    if config.cache {
        dataset = Arc::new(CachedDataset::new(dataset));
    }

    let num_transforms = if let Some(specs) = config.transforms() {
        let transforms = specs
            .iter()
            .map(TransformSpec::build)
            .collect::<Result<Vec<_>>>()?;
        let num_transforms = transforms.len();
        dataset = Arc::new(TransformedDataset::new(dataset, transforms)?);
        num_transforms
    } else {
        0
    };

    info!(
        split = %config.split,
        rows = dataset.len(),
        cache = config.cache,
        transforms = num_transforms,
        "Constructed dataset"
    );

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ndarray::array;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::frame::{derive_fn, ColumnData};

    fn write_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,energy,pt").unwrap();
        for i in 0..10 {
            writeln!(file, "{i},{}.5,\"[{i},{}]\"", i * 10, i + 1).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn csv_config(path: &Path) -> DatasetConfig {
        let mut config = DatasetConfig::new(FrameSpec::Csv {
            path: path.to_path_buf(),
            dtype: DType::Float64,
        });
        config.scalar_groups.insert("s".into(), vec!["id".into(), "energy".into()]);
        config.vlarr_groups.insert("v".into(), vec!["pt".into()]);
        config
    }

    #[test]
    fn test_parse_full_config() {
        let config = DatasetConfig::from_json(
            r#"{
                "frame": { "name": "parquet-read-ahead", "path": "a.parquet", "chunk_size": 64 },
                "shuffle": true,
                "seed": 3,
                "val_size": 0.25,
                "test_size": 10,
                "cache": true,
                "split": "val",
                "scalar_groups": { "s": ["x", "y"] },
                "vlarr_groups": { "v": ["pt"] },
                "vlarr_limits": { "v": 8 },
                "transform_train": [
                    { "name": "mask-nan", "mask": -1 },
                    { "name": "vlarr-shuffle", "vlarr_group": "v" }
                ],
                "transform_test": [
                    { "name": "vlarr-sort", "vlarr_group": "v", "column": "pt", "ascending": false },
                    {
                        "name": "noise",
                        "noise": { "name": "normal", "mu": 0, "sigma": 0.1, "seed": 5 },
                        "relative": true,
                        "scalar_groups": { "s": { "x": 0.5 } },
                        "vlarr_groups": { "v": ["pt"] }
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.frame.frame,
            FrameSpec::ParquetReadAhead {
                path: "a.parquet".into(),
                dtype: DType::Float32,
                chunk_size: 64,
            }
        );
        assert!(config.frame.shuffle);
        assert_eq!(config.frame.seed, 3);
        assert_eq!(config.frame.val_size, Some(SplitSize::Fraction(0.25)));
        assert_eq!(config.frame.test_size, Some(SplitSize::Count(10)));
        assert!(config.frame.is_split());
        assert!(config.cache);
        assert_eq!(config.split, Split::Val);
        assert_eq!(config.vlarr_limits["v"], 8);

        let test = config.transforms().unwrap();
        assert_eq!(test.len(), 2);
        assert_eq!(
            test[0],
            TransformSpec::VlarrSort {
                vlarr_group: "v".into(),
                column: "pt".into(),
                ascending: false,
            }
        );
        let TransformSpec::Noise {
            noise,
            relative,
            correlated,
            scalar_groups,
            ..
        } = &test[1]
        else {
            panic!("expected a noise transform, got {:?}", test[1]);
        };
        assert_eq!(
            *noise,
            NoiseSpec::Gaussian {
                mu: 0.0,
                sigma: 0.1,
                seed: 5
            }
        );
        assert!(*relative);
        assert!(!*correlated);
        assert_eq!(
            scalar_groups["s"],
            [("x", 0.5)].into_iter().collect::<NoiseColumns>()
        );
        assert_eq!(
            config.transform_train.as_ref().unwrap()[0],
            TransformSpec::MaskNan { mask: -1.0 }
        );
    }

    #[test]
    fn test_defaults() {
        let config =
            DatasetConfig::from_json(r#"{ "frame": { "name": "csv", "path": "x.csv" } }"#).unwrap();
        assert_eq!(config, DatasetConfig::new(FrameSpec::Csv {
            path: "x.csv".into(),
            dtype: DType::Float32,
        }));
        assert!(config.transforms().is_none());
    }

    #[test]
    fn test_unknown_names_rejected() {
        assert!(matches!(
            DatasetConfig::from_json(r#"{ "frame": { "name": "hdf5", "path": "x" } }"#),
            Err(Error::Json(_))
        ));
        assert!(serde_json::from_str::<TransformSpec>(r#"{ "name": "rotate" }"#).is_err());
        assert!(serde_json::from_str::<NoiseSpec>(r#"{ "name": "poisson" }"#).is_err());
    }

    #[test]
    fn test_noise_spec_aliases() {
        let uniform: NoiseSpec =
            serde_json::from_str(r#"{ "name": "uniform", "a": -1, "b": 1 }"#).unwrap();
        assert_eq!(
            uniform,
            NoiseSpec::Uniform {
                low: -1.0,
                high: 1.0,
                seed: 0
            }
        );
        assert!(uniform.build().is_ok());

        let bad: NoiseSpec =
            serde_json::from_str(r#"{ "name": "uniform", "low": 1, "high": 1 }"#).unwrap();
        assert!(matches!(bad.build(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_transform_spec_build_names() {
        let specs: Vec<TransformSpec> = serde_json::from_str(
            r#"[
                { "name": "mask-nan" },
                { "name": "noise", "noise": { "name": "debug", "value": 1 } },
                { "name": "vlarr-shuffle", "vlarr_group": "v", "seed": 2 },
                { "name": "vlarr-sort", "vlarr_group": "v", "column": "pt" }
            ]"#,
        )
        .unwrap();
        let names: Vec<String> = specs
            .iter()
            .map(|spec| spec.build().unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["mask-nan", "noise", "vlarr-shuffle", "vlarr-sort"]);
    }

    #[test]
    fn test_inline_map_frame() {
        let config = DatasetConfig::from_json(
            r#"{
                "frame": {
                    "name": "map",
                    "scalar_data": { "energy": [1.5, 2.5, 3.5] },
                    "vlarr_data": { "pt": [[1, 2], [], [3]] },
                    "dtype": "float64"
                },
                "scalar_groups": { "s": ["energy"] },
                "vlarr_groups": { "v": ["pt"] }
            }"#,
        )
        .unwrap();
        assert!(config.frame.frame.path().is_none());

        let dataset = construct_dataset(&config, []).unwrap();
        assert_eq!(dataset.len(), 3);
        let sample = dataset.get(0).unwrap();
        assert_eq!(sample["s"], array![1.5].into_dyn());
        assert_eq!(sample["v"], array![[1.0], [2.0]].into_dyn());
        assert_eq!(dataset.get(1).unwrap()["v"].shape(), &[0, 1]);
    }

    #[test]
    fn test_inline_map_frame_row_count_mismatch() {
        let spec: FrameSpec = serde_json::from_str(
            r#"{ "name": "map", "scalar_data": { "a": [1], "b": [1, 2] } }"#,
        )
        .unwrap();
        assert!(matches!(spec.open(), Err(Error::RowCountMismatch { .. })));
    }

    #[test]
    fn test_construct_frame_full_and_split() {
        let file = write_csv();
        let mut config = FrameConfig::new(FrameSpec::Csv {
            path: file.path().to_path_buf(),
            dtype: DType::Float64,
        });

        let FrameSplits::Full(frame) = construct_frame(&config, []).unwrap() else {
            panic!("expected a full frame");
        };
        assert_eq!(frame.len(), 10);

        config.val_size = Some(SplitSize::Fraction(0.2));
        config.test_size = Some(SplitSize::Count(3));
        let splits = construct_frame(&config, []).unwrap();
        let FrameSplits::Split { train, val, test } = &splits else {
            panic!("expected a split frame");
        };
        assert_eq!((train.len(), val.len(), test.len()), (5, 2, 3));
        assert_eq!(val.get_scalar("id", 0).unwrap(), 5.0);
        assert_eq!(splits.select(Split::Test).get_scalar("id", 2).unwrap(), 9.0);
    }

    #[test]
    fn test_construct_frame_shuffle_is_seeded() {
        let file = write_csv();
        let mut config = FrameConfig::new(FrameSpec::Csv {
            path: file.path().to_path_buf(),
            dtype: DType::Float64,
        });
        config.shuffle = true;
        config.seed = 11;

        let ids = |splits: FrameSplits| -> Vec<f64> {
            let frame = splits.select(Split::Train);
            (0..frame.len())
                .map(|i| frame.get_scalar("id", i).unwrap())
                .collect()
        };
        let first = ids(construct_frame(&config, []).unwrap());
        let second = ids(construct_frame(&config, []).unwrap());
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(sorted, (0..10).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_construct_frame_with_derived_columns() {
        let file = write_csv();
        let mut config = FrameConfig::new(FrameSpec::Csv {
            path: file.path().to_path_buf(),
            dtype: DType::Float64,
        });
        config.shuffle = true;

        let double_id = derive_fn(|frame: &dyn Frame| {
            (0..frame.len())
                .map(|i| frame.get_scalar("id", i).map(|id| 2.0 * id))
                .collect::<Result<Vec<_>>>()
                .map(ColumnData::Scalar)
        });
        let frame = construct_frame(&config, [("id2".to_string(), double_id)])
            .unwrap()
            .select(Split::Train);

        assert!(frame.has_column("id2"));
        for i in 0..frame.len() {
            let id = frame.get_scalar("id", i).unwrap();
            assert_eq!(frame.get_scalar("id2", i).unwrap(), 2.0 * id);
        }
    }

    #[test]
    fn test_construct_dataset_train_transforms() {
        let file = write_csv();
        let mut config = csv_config(file.path());
        config.transform_train = Some(vec![TransformSpec::VlarrSort {
            vlarr_group: "v".into(),
            column: "pt".into(),
            ascending: false,
        }]);

        let dataset = construct_dataset(&config, []).unwrap();
        assert_eq!(dataset.len(), 10);

        let sample = dataset.get(2).unwrap();
        assert_eq!(sample["s"], array![2.0, 20.5].into_dyn());
        assert_eq!(sample["v"], array![[3.0], [2.0]].into_dyn());
    }

    #[test]
    fn test_construct_dataset_test_split_uses_test_transforms() {
        let file = write_csv();
        let mut config = csv_config(file.path());
        config.frame.test_size = Some(SplitSize::Count(4));
        config.split = Split::Test;
        config.cache = true;
        config.transform_train = Some(vec![TransformSpec::MaskNan { mask: 0.0 }]);
        config.transform_test = Some(vec![TransformSpec::Noise {
            noise: NoiseSpec::Debug { value: 1.0 },
            correlated: false,
            relative: false,
            scalar_groups: [("s".to_string(), NoiseColumns::from(vec!["energy"]))]
                .into_iter()
                .collect(),
            vlarr_groups: IndexMap::new(),
        }]);

        let dataset = construct_dataset(&config, []).unwrap();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.get(0).unwrap()["s"], array![6.0, 61.5].into_dyn());
        // Cached rows are copied before the noise is added
        assert_eq!(dataset.get(0).unwrap()["s"], array![6.0, 61.5].into_dyn());
    }

    #[test]
    fn test_construct_dataset_bind_error() {
        let file = write_csv();
        let mut config = csv_config(file.path());
        config.transform_train = Some(vec![TransformSpec::VlarrShuffle {
            vlarr_group: "missing".into(),
            seed: 0,
        }]);
        assert!(matches!(
            construct_dataset(&config, []),
            Err(Error::GroupNotFound { .. })
        ));
    }

    #[test]
    fn test_construct_dataset_from_frames_full_serves_every_split() {
        let file = write_csv();
        let mut config = csv_config(file.path());
        let frames = construct_frame(&config.frame, []).unwrap();

        config.split = Split::Val;
        let dataset = construct_dataset_from_frames(&frames, &config).unwrap();
        assert_eq!(dataset.len(), 10);
    }

    #[test]
    fn test_from_path() {
        let file = write_csv();
        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let config = csv_config(file.path());
        write!(json, "{}", serde_json::to_string(&config).unwrap()).unwrap();
        json.flush().unwrap();

        assert_eq!(DatasetConfig::from_path(json.path()).unwrap(), config);
        assert!(matches!(
            DatasetConfig::from_path("/nonexistent/config.json"),
            Err(Error::Io { .. })
        ));
    }
}
