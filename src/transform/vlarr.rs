//! Row reordering of vlarray groups.

use ndarray::{Array2, ArrayD, Axis, Ix2};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use super::Transform;
use crate::{
    dataset::{Dataset, Sample},
    error::{Error, Result},
};

/// Views the array of `group` as `(L, C)`.
fn vlarr_mut<'a>(sample: &'a mut Sample, group: &str) -> Result<&'a mut ArrayD<f64>> {
    let data = sample
        .get_mut(group)
        .ok_or_else(|| Error::group_not_found(group))?;
    if data.ndim() != 2 {
        return Err(Error::shape_mismatch(format!(
            "group '{group}' has shape {:?}, expected a (L, C) vlarray group",
            data.shape()
        )));
    }
    Ok(data)
}

fn reorder(data: &ArrayD<f64>, order: &[usize]) -> Result<ArrayD<f64>> {
    let rows = data.view().into_dimensionality::<Ix2>().map_err(|e| {
        Error::shape_mismatch(format!("cannot reorder vlarray rows: {e}"))
    })?;
    let reordered: Array2<f64> = rows.select(Axis(0), order);
    Ok(reordered.into_dyn())
}

/// Returns the stable ascending (or descending) order of `key`.
///
/// Equal keys keep their relative order. NaN keys sort last either way.
fn argsort(key: &[f64], ascending: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..key.len()).collect();
    let compare = |a: f64, b: f64| {
        a.partial_cmp(&b)
            .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
    };
    order.sort_by(|&i, &j| {
        let (a, b) = (key[i], key[j]);
        if ascending {
            compare(a, b)
        } else {
            compare(-a, -b)
        }
    });
    order
}

/// Sorts the rows of a vlarray group by one of its columns.
///
/// Descending order sorts the negated key, so rows with equal keys keep
/// their original relative order in both directions.
#[derive(Debug, Clone)]
pub struct VlArrSortTransform {
    group: String,
    column: String,
    ascending: bool,
    column_index: Option<usize>,
}

impl VlArrSortTransform {
    /// Sorts group `group` by its column `column`.
    pub fn new(group: impl Into<String>, column: impl Into<String>, ascending: bool) -> Self {
        Self {
            group: group.into(),
            column: column.into(),
            ascending,
            column_index: None,
        }
    }

    /// Returns the position of the sort column within the group, once bound.
    pub fn column_index(&self) -> Option<usize> {
        self.column_index
    }
}

impl Transform for VlArrSortTransform {
    fn name(&self) -> &str {
        "vlarr-sort"
    }

    fn bind(&mut self, parent: &dyn Dataset) -> Result<()> {
        let columns = parent
            .vlarr_groups()
            .get(&self.group)
            .ok_or_else(|| Error::group_not_found(&self.group))?;
        let index = columns
            .iter()
            .position(|c| *c == self.column)
            .ok_or_else(|| Error::column_not_found(&self.column))?;
        self.column_index = Some(index);
        Ok(())
    }

    fn apply(&mut self, mut sample: Sample, _index: usize) -> Result<Sample> {
        let column = self
            .column_index
            .ok_or_else(|| Error::unbound_transform(self.name()))?;

        let data = vlarr_mut(&mut sample, &self.group)?;
        if column >= data.shape()[1] {
            return Err(Error::shape_mismatch(format!(
                "group '{}' has {} columns, cannot sort by column {column}",
                self.group,
                data.shape()[1]
            )));
        }
        if data.shape()[0] < 2 {
            return Ok(sample);
        }

        let key: Vec<f64> = data.index_axis(Axis(1), column).iter().copied().collect();
        let order = argsort(&key, self.ascending);
        *data = reorder(data, &order)?;

        Ok(sample)
    }
}

/// Shuffles the rows of a vlarray group.
///
/// The generator is seeded once; every call advances it, so repeated
/// accesses to the same row produce different orders.
#[derive(Debug, Clone)]
pub struct VlArrShuffleTransform {
    group: String,
    rng: StdRng,
    bound: bool,
}

impl VlArrShuffleTransform {
    /// Shuffles group `group` with a generator seeded by `seed`.
    pub fn new(group: impl Into<String>, seed: u64) -> Self {
        Self {
            group: group.into(),
            rng: StdRng::seed_from_u64(seed),
            bound: false,
        }
    }
}

impl Transform for VlArrShuffleTransform {
    fn name(&self) -> &str {
        "vlarr-shuffle"
    }

    fn bind(&mut self, parent: &dyn Dataset) -> Result<()> {
        if !parent.vlarr_groups().contains_key(&self.group) {
            return Err(Error::group_not_found(&self.group));
        }
        self.bound = true;
        Ok(())
    }

    fn apply(&mut self, mut sample: Sample, _index: usize) -> Result<Sample> {
        if !self.bound {
            return Err(Error::unbound_transform(self.name()));
        }

        let data = vlarr_mut(&mut sample, &self.group)?;
        if data.shape()[0] < 2 {
            return Ok(sample);
        }

        let mut order: Vec<usize> = (0..data.shape()[0]).collect();
        order.shuffle(&mut self.rng);
        *data = reorder(data, &order)?;

        Ok(sample)
    }
}
