//! Additive and multiplicative noise injection.

use indexmap::IndexMap;
use ndarray::{ArrayD, Axis, Zip};
use serde::{Deserialize, Serialize};

use super::{Noise, Transform};
use crate::{
    dataset::{ColumnGroups, Dataset, Sample},
    error::{Error, Result},
};

const NAME: &str = "noise";

/// Columns of one group that receive noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoiseColumns {
    /// Column names; every column gets weight 1.
    Plain(Vec<String>),
    /// Column name to noise weight.
    Weighted(IndexMap<String, f64>),
}

impl NoiseColumns {
    fn targets(&self) -> Vec<(&str, Option<f64>)> {
        match self {
            Self::Plain(columns) => columns.iter().map(|c| (c.as_str(), None)).collect(),
            Self::Weighted(columns) => columns
                .iter()
                .map(|(c, &w)| (c.as_str(), Some(w)))
                .collect(),
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for NoiseColumns {
    fn from(columns: Vec<S>) -> Self {
        Self::Plain(columns.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for NoiseColumns {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::Weighted(iter.into_iter().map(|(c, w)| (c.into(), w)).collect())
    }
}

/// Positions and weights resolved against one group of the parent dataset.
#[derive(Debug, Clone, PartialEq)]
struct BoundGroup {
    index_map: Vec<usize>,
    weight_map: Option<Vec<f64>>,
}

impl BoundGroup {
    fn resolve(group: &str, noise: &NoiseColumns, groups: &ColumnGroups) -> Result<Self> {
        let columns = groups
            .get(group)
            .ok_or_else(|| Error::group_not_found(group))?;

        let targets = noise.targets();
        let index_map = targets
            .iter()
            .map(|(column, _)| {
                columns
                    .iter()
                    .position(|c| c == column)
                    .ok_or_else(|| Error::column_not_found(*column))
            })
            .collect::<Result<Vec<_>>>()?;
        let weight_map = match noise {
            NoiseColumns::Plain(_) => None,
            NoiseColumns::Weighted(_) => Some(targets.iter().map(|(_, w)| w.unwrap_or(1.0)).collect()),
        };

        Ok(Self {
            index_map,
            weight_map,
        })
    }

    fn weight(&self, position: usize) -> f64 {
        self.weight_map.as_ref().map_or(1.0, |weights| weights[position])
    }
}

/// Adds noise to selected columns of selected groups.
///
/// - *Correlated*: one noise value per row, shared by every targeted value.
/// - *Uncorrelated*: one independent noise value per targeted value.
///
/// Additive noise computes `value + weight * noise`; relative noise computes
/// `value * (1 + weight * noise)`. Columns that are not targeted are left
/// untouched, as are groups missing from the sample.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use vlndata::{
///     DType, Dataset, DebugNoise, GroupedDataset, MapFrame, NoiseColumns, NoiseTransform,
///     TransformedDataset,
/// };
///
/// let frame = MapFrame::builder(DType::Float64)
///     .scalar("a", vec![1.0])
///     .scalar("b", vec![2.0])
///     .build()
///     .unwrap();
/// let dataset = GroupedDataset::new(Arc::new(frame)).scalar_group("g", ["a", "b"]);
///
/// let noise = NoiseTransform::new(Box::new(DebugNoise::new(0.5)))
///     .correlated(true)
///     .scalar_group("g", NoiseColumns::from(vec!["b"]));
/// let dataset = TransformedDataset::new(dataset, vec![Box::new(noise)]).unwrap();
///
/// assert_eq!(dataset.get(0).unwrap()["g"].as_slice().unwrap(), &[1.0, 2.5]);
/// ```
#[derive(Debug)]
pub struct NoiseTransform {
    noise: Box<dyn Noise>,
    correlated: bool,
    relative: bool,
    scalar_groups: IndexMap<String, NoiseColumns>,
    vlarr_groups: IndexMap<String, NoiseColumns>,
    bound: Option<IndexMap<String, BoundGroup>>,
}

impl NoiseTransform {
    /// Creates an uncorrelated, additive noise transform with no targets.
    pub fn new(noise: Box<dyn Noise>) -> Self {
        Self {
            noise,
            correlated: false,
            relative: false,
            scalar_groups: IndexMap::new(),
            vlarr_groups: IndexMap::new(),
            bound: None,
        }
    }

    /// Shares one noise value across a whole row.
    #[must_use]
    pub fn correlated(mut self, correlated: bool) -> Self {
        self.correlated = correlated;
        self
    }

    /// Applies noise multiplicatively.
    #[must_use]
    pub fn relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    /// Targets columns of a scalar group.
    #[must_use]
    pub fn scalar_group(mut self, group: impl Into<String>, columns: NoiseColumns) -> Self {
        self.scalar_groups.insert(group.into(), columns);
        self
    }

    /// Targets columns of a vlarray group.
    #[must_use]
    pub fn vlarr_group(mut self, group: impl Into<String>, columns: NoiseColumns) -> Self {
        self.vlarr_groups.insert(group.into(), columns);
        self
    }
}

enum Noisy {
    Shared(f64),
    PerValue(ArrayD<f64>),
}

impl Transform for NoiseTransform {
    fn name(&self) -> &str {
        NAME
    }

    fn bind(&mut self, parent: &dyn Dataset) -> Result<()> {
        let mut bound = IndexMap::new();
        for (group, columns) in &self.scalar_groups {
            bound.insert(
                group.clone(),
                BoundGroup::resolve(group, columns, parent.scalar_groups())?,
            );
        }
        for (group, columns) in &self.vlarr_groups {
            bound.insert(
                group.clone(),
                BoundGroup::resolve(group, columns, parent.vlarr_groups())?,
            );
        }
        self.bound = Some(bound);
        Ok(())
    }

    fn apply(&mut self, mut sample: Sample, _index: usize) -> Result<Sample> {
        let Some(bound) = self.bound.as_ref() else {
            return Err(Error::unbound_transform(NAME));
        };

        let shared = if self.correlated {
            let noise = self.noise.generate(&[1]);
            Some(noise.iter().next().copied().unwrap_or_default())
        } else {
            None
        };

        for (group, data) in &mut sample {
            let Some(group_bound) = bound.get(group) else {
                continue;
            };
            let noise = match shared {
                Some(value) => Noisy::Shared(value),
                None => {
                    let mut shape = data.shape().to_vec();
                    shape.pop();
                    shape.push(group_bound.index_map.len());
                    Noisy::PerValue(self.noise.generate(&shape))
                }
            };
            apply_noise(data, group_bound, &noise, self.relative)?;
        }

        Ok(sample)
    }
}

fn apply_noise(
    data: &mut ArrayD<f64>,
    bound: &BoundGroup,
    noise: &Noisy,
    relative: bool,
) -> Result<()> {
    let Some(last) = data.ndim().checked_sub(1) else {
        return Err(Error::shape_mismatch("noise cannot be applied to a 0-d array"));
    };
    let width = data.shape()[last];

    for (position, &column) in bound.index_map.iter().enumerate() {
        if column >= width {
            return Err(Error::shape_mismatch(format!(
                "noise targets column {column} of an array with {width} columns"
            )));
        }
        let weight = bound.weight(position);
        let perturb = |value: &mut f64, noise: f64| {
            if relative {
                *value *= 1.0 + weight * noise;
            } else {
                *value += weight * noise;
            }
        };

        let mut lane = data.index_axis_mut(Axis(last), column);
        match noise {
            Noisy::Shared(noise) => lane.map_inplace(|value| perturb(value, *noise)),
            Noisy::PerValue(noise) => {
                let noise = noise.index_axis(Axis(last), position);
                Zip::from(&mut lane)
                    .and(&noise)
                    .for_each(|value, &noise| perturb(value, noise));
            }
        }
    }

    Ok(())
}
