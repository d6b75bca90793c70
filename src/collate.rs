//! Collation of extracted rows into padded batches.
//!
//! Per group, the rank of the row arrays decides the batch layout:
//!
//! | Row shape | Group kind | Batch shape         |
//! |-----------|------------|---------------------|
//! | `(C,)`    | scalar     | `(N, C)`            |
//! | `(L, C)`  | vlarray    | `(N, L_max, C)`     |
//!
//! Vlarray rows shorter than `L_max` are filled with the pad value.

use indexmap::IndexMap;
use ndarray::{s, Array2, Array3, ArrayD, Ix1, Ix2};

use crate::{
    dataset::Sample,
    error::{Error, Result},
};

/// A collated batch: group name to batch array, in group order.
pub type Batch = IndexMap<String, ArrayD<f64>>;

/// Shape of one group across a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchShape {
    Scalar { columns: usize },
    VlArray { max_len: usize, columns: usize },
}

fn infer_shape<'a>(group: &str, arrays: impl Iterator<Item = &'a ArrayD<f64>>) -> Result<BatchShape> {
    let mut shape: Option<BatchShape> = None;

    for array in arrays {
        let current = match *array.shape() {
            [columns] => BatchShape::Scalar { columns },
            [len, columns] => BatchShape::VlArray {
                max_len: len,
                columns,
            },
            ref other => {
                return Err(Error::shape_mismatch(format!(
                    "group '{group}' has a row of shape {other:?}, expected (C,) or (L, C)"
                )));
            }
        };

        shape = Some(match (shape, current) {
            (None, current) => current,
            (Some(BatchShape::Scalar { columns: a }), BatchShape::Scalar { columns: b }) if a == b => {
                current
            }
            (
                Some(BatchShape::VlArray {
                    max_len: a_len,
                    columns: a,
                }),
                BatchShape::VlArray {
                    max_len: b_len,
                    columns: b,
                },
            ) if a == b => BatchShape::VlArray {
                max_len: a_len.max(b_len),
                columns: a,
            },
            (Some(expected), _) => {
                return Err(Error::shape_mismatch(format!(
                    "group '{group}' mixes row shapes {expected:?} and {:?}",
                    array.shape()
                )));
            }
        });
    }

    shape.ok_or_else(|| Error::shape_mismatch(format!("group '{group}' has no rows")))
}

fn dimensionality_error(group: &str, e: ndarray::ShapeError) -> Error {
    Error::shape_mismatch(format!("group '{group}': {e}"))
}

/// Collates samples into one batch, padding vlarray groups with `pad`.
///
/// An empty input yields an empty batch.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the samples do not share the same
/// groups, or if the arrays of one group disagree on rank or column count.
/// No partial batch is returned.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use vlndata::{collate, Sample};
///
/// let mut short = Sample::new();
/// short.insert("v".to_string(), array![[1.0, 2.0]].into_dyn());
/// let mut long = Sample::new();
/// long.insert("v".to_string(), array![[1.0, 2.0], [3.0, 4.0]].into_dyn());
///
/// let batch = collate(&[short, long], -1.0).unwrap();
/// assert_eq!(
///     batch["v"],
///     array![[[1.0, 2.0], [-1.0, -1.0]], [[1.0, 2.0], [3.0, 4.0]]].into_dyn()
/// );
/// ```
pub fn collate(samples: &[Sample], pad: f64) -> Result<Batch> {
    let Some(first) = samples.first() else {
        return Ok(Batch::new());
    };

    for (i, sample) in samples.iter().enumerate().skip(1) {
        if sample.len() != first.len() || !first.keys().all(|k| sample.contains_key(k)) {
            return Err(Error::shape_mismatch(format!(
                "sample {i} has groups {:?}, expected {:?}",
                sample.keys().collect::<Vec<_>>(),
                first.keys().collect::<Vec<_>>()
            )));
        }
    }

    let n = samples.len();
    let mut batch = Batch::with_capacity(first.len());

    for group in first.keys() {
        let rows = || samples.iter().map(|sample| &sample[group]);

        let collated = match infer_shape(group, rows())? {
            BatchShape::Scalar { columns } => {
                let mut result = Array2::zeros((n, columns));
                for (i, row) in rows().enumerate() {
                    let row = row
                        .view()
                        .into_dimensionality::<Ix1>()
                        .map_err(|e| dimensionality_error(group, e))?;
                    result.row_mut(i).assign(&row);
                }
                result.into_dyn()
            }
            BatchShape::VlArray { max_len, columns } => {
                let mut result = Array3::from_elem((n, max_len, columns), pad);
                for (i, row) in rows().enumerate() {
                    let row = row
                        .view()
                        .into_dimensionality::<Ix2>()
                        .map_err(|e| dimensionality_error(group, e))?;
                    let len = row.nrows();
                    result.slice_mut(s![i, ..len, ..]).assign(&row);
                }
                result.into_dyn()
            }
        };

        batch.insert(group.clone(), collated);
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use ndarray::{array, ArrayD, IxDyn};

    use super::*;

    fn sample(entries: &[(&str, ArrayD<f64>)]) -> Sample {
        entries
            .iter()
            .map(|(name, array)| ((*name).to_string(), array.clone()))
            .collect()
    }

    #[test]
    fn test_scalar_groups_stack() {
        let batch = collate(
            &[
                sample(&[("g", array![1.0, 2.0, 3.0].into_dyn())]),
                sample(&[("g", array![5.0, 6.0, 7.0].into_dyn())]),
            ],
            0.0,
        )
        .unwrap();
        assert_eq!(
            batch["g"],
            array![[1.0, 2.0, 3.0], [5.0, 6.0, 7.0]].into_dyn()
        );
    }

    #[test]
    fn test_single_row_batch() {
        let batch = collate(&[sample(&[("g", array![1.0, 2.0, 3.0].into_dyn())])], 0.0).unwrap();
        assert_eq!(batch["g"], array![[1.0, 2.0, 3.0]].into_dyn());
    }

    #[test]
    fn test_vlarray_groups_padded() {
        let batch = collate(
            &[
                sample(&[("v", array![[1.0, 2.0]].into_dyn())]),
                sample(&[("v", array![[1.0, 2.0], [3.0, 4.0]].into_dyn())]),
                sample(&[("v", ArrayD::zeros(IxDyn(&[0, 2])))]),
            ],
            -1.0,
        )
        .unwrap();
        assert_eq!(
            batch["v"],
            array![
                [[1.0, 2.0], [-1.0, -1.0]],
                [[1.0, 2.0], [3.0, 4.0]],
                [[-1.0, -1.0], [-1.0, -1.0]]
            ]
            .into_dyn()
        );
    }

    #[test]
    fn test_all_empty_vlarrays() {
        let empty = || sample(&[("v", ArrayD::zeros(IxDyn(&[0, 3])))]);
        let batch = collate(&[empty(), empty()], 0.0).unwrap();
        assert_eq!(batch["v"].shape(), &[2, 0, 3]);
    }

    #[test]
    fn test_group_order_follows_first_sample() {
        let a = sample(&[
            ("b", array![1.0].into_dyn()),
            ("a", array![[1.0]].into_dyn()),
        ]);
        let b = sample(&[
            ("a", array![[2.0]].into_dyn()),
            ("b", array![2.0].into_dyn()),
        ]);
        let batch = collate(&[a, b], 0.0).unwrap();
        let keys: Vec<&str> = batch.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(batch["a"], array![[[1.0]], [[2.0]]].into_dyn());
    }

    #[test]
    fn test_empty_input() {
        assert!(collate(&[], 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_column_mismatch_fails() {
        let result = collate(
            &[
                sample(&[("g", array![1.0, 2.0].into_dyn())]),
                sample(&[("g", array![1.0, 2.0, 3.0].into_dyn())]),
            ],
            0.0,
        );
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));

        let result = collate(
            &[
                sample(&[("v", array![[1.0, 2.0]].into_dyn())]),
                sample(&[("v", array![[1.0]].into_dyn())]),
            ],
            0.0,
        );
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_rank_mismatch_fails() {
        let result = collate(
            &[
                sample(&[("g", array![1.0].into_dyn())]),
                sample(&[("g", array![[1.0]].into_dyn())]),
            ],
            0.0,
        );
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));

        let result = collate(&[sample(&[("g", array![[[1.0]]].into_dyn())])], 0.0);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_key_mismatch_fails() {
        let result = collate(
            &[
                sample(&[("g", array![1.0].into_dyn())]),
                sample(&[("h", array![1.0].into_dyn())]),
            ],
            0.0,
        );
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }
}
