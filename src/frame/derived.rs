//! Derived-column decorator.
//!
//! A derived column is computed from the whole parent frame in one call and
//! held for the lifetime of the decorator. Eager frames evaluate every
//! derived column at construction; lazy frames evaluate each one on first
//! access.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use arrow::array::ArrayRef;
use tracing::debug;

use super::{ColumnData, Frame, FrameRef};
use crate::{
    dtype::DType,
    error::{Error, Result},
};

/// Computes one derived column from the parent frame, one value per parent
/// row.
pub type DeriveFn = Arc<dyn Fn(&dyn Frame) -> Result<ColumnData> + Send + Sync>;

/// Wraps a closure as a [`DeriveFn`].
pub fn derive_fn<F>(f: F) -> DeriveFn
where
    F: Fn(&dyn Frame) -> Result<ColumnData> + Send + Sync + 'static,
{
    Arc::new(f)
}

enum DerivedState {
    Unevaluated,
    Evaluated(Arc<ColumnData>),
}

struct DerivedColumn {
    derive: DeriveFn,
    state: Mutex<DerivedState>,
}

/// A frame that appends derived columns to its parent.
///
/// Derived column names follow the parent columns in sorted order and must
/// not collide with parent columns.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use vlndata::{derive_fn, ColumnData, DType, DerivedFrame, Frame, MapFrame};
///
/// let parent = MapFrame::builder(DType::Float64)
///     .scalar("x", vec![1.0, 2.0, 3.0])
///     .build()
///     .unwrap();
///
/// let double = derive_fn(|frame| {
///     let values = (0..frame.len())
///         .map(|i| frame.get_scalar("x", i).map(|x| 2.0 * x))
///         .collect::<vlndata::Result<Vec<_>>>()?;
///     Ok(ColumnData::Scalar(values))
/// });
///
/// let frame = DerivedFrame::eager(Arc::new(parent), [("x2".to_string(), double)]).unwrap();
/// assert_eq!(frame.columns(), ["x", "x2"]);
/// assert_eq!(frame.get_scalar("x2", 2).unwrap(), 6.0);
/// ```
pub struct DerivedFrame {
    parent: FrameRef,
    columns: Vec<String>,
    derived: BTreeMap<String, DerivedColumn>,
}

impl std::fmt::Debug for DerivedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedFrame")
            .field("columns", &self.columns)
            .field("derived", &self.derived.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DerivedFrame {
    /// Wraps `parent` and evaluates every derived column now.
    ///
    /// # Errors
    ///
    /// Returns an error if a name collides with a parent column or a
    /// derivation fails or returns the wrong number of rows.
    pub fn eager(
        parent: FrameRef,
        columns: impl IntoIterator<Item = (String, DeriveFn)>,
    ) -> Result<Self> {
        Self::new(parent, columns, false)
    }

    /// Wraps `parent`; each derived column is evaluated on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if a name collides with a parent column.
    pub fn lazy(
        parent: FrameRef,
        columns: impl IntoIterator<Item = (String, DeriveFn)>,
    ) -> Result<Self> {
        Self::new(parent, columns, true)
    }

    /// Wraps `parent`, evaluating derived columns eagerly unless `lazy`.
    ///
    /// # Errors
    ///
    /// See [`eager`](Self::eager) and [`lazy`](Self::lazy).
    pub fn new(
        parent: FrameRef,
        columns: impl IntoIterator<Item = (String, DeriveFn)>,
        lazy: bool,
    ) -> Result<Self> {
        let mut derived = BTreeMap::new();
        for (name, derive) in columns {
            if parent.has_column(&name) || derived.contains_key(&name) {
                return Err(Error::invalid_config(format!(
                    "derived column '{name}' is already defined"
                )));
            }
            derived.insert(
                name,
                DerivedColumn {
                    derive,
                    state: Mutex::new(DerivedState::Unevaluated),
                },
            );
        }

        let columns = parent
            .columns()
            .iter()
            .cloned()
            .chain(derived.keys().cloned())
            .collect();

        let frame = Self {
            parent,
            columns,
            derived,
        };

        if !lazy {
            for name in frame.derived.keys() {
                frame.evaluate(name)?;
            }
        }

        Ok(frame)
    }

    /// Returns the wrapped frame.
    pub fn parent(&self) -> &FrameRef {
        &self.parent
    }

    /// Returns true if `column` is derived and already evaluated.
    pub fn is_evaluated(&self, column: &str) -> bool {
        self.derived.get(column).is_some_and(|derived| {
            let state = derived.state.lock().unwrap_or_else(PoisonError::into_inner);
            matches!(*state, DerivedState::Evaluated(_))
        })
    }

    /// Returns the values of a derived column, computing them at most once.
    ///
    /// A failed derivation is not cached; the next access retries it.
    fn evaluate(&self, column: &str) -> Result<Arc<ColumnData>> {
        let derived = self
            .derived
            .get(column)
            .ok_or_else(|| Error::column_not_found(column))?;

        let mut state = derived.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let DerivedState::Evaluated(data) = &*state {
            return Ok(Arc::clone(data));
        }

        debug!(column, rows = self.parent.len(), "evaluating derived column");
        let data = (derived.derive)(self.parent.as_ref())?;
        if data.len() != self.parent.len() {
            return Err(Error::RowCountMismatch {
                column: column.to_string(),
                expected: self.parent.len(),
                actual: data.len(),
            });
        }

        let data = Arc::new(data.coerce(self.parent.dtype()));
        *state = DerivedState::Evaluated(Arc::clone(&data));
        Ok(data)
    }
}

impl Frame for DerivedFrame {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn len(&self) -> usize {
        self.parent.len()
    }

    fn dtype(&self) -> DType {
        self.parent.dtype()
    }

    fn get_scalar(&self, column: &str, index: usize) -> Result<f64> {
        if self.derived.contains_key(column) {
            return self.evaluate(column)?.scalar(column, index);
        }
        self.parent.get_scalar(column, index)
    }

    fn get_vlarr(&self, column: &str, index: usize) -> Result<Vec<f64>> {
        if self.derived.contains_key(column) {
            return self.evaluate(column)?.vlarr(index);
        }
        self.parent.get_vlarr(column, index)
    }

    fn raw_column(&self, column: &str) -> Result<ArrayRef> {
        if self.derived.contains_key(column) {
            return Ok(self.evaluate(column)?.to_arrow());
        }
        self.parent.raw_column(column)
    }
}
