//! Noise generators used by [`NoiseTransform`](super::NoiseTransform).

use ndarray::{ArrayD, IxDyn};
use rand::{
    distributions::{Distribution, Uniform, WeightedIndex},
    rngs::StdRng,
    seq::SliceRandom,
    SeedableRng,
};
use rand_distr::Normal;

use crate::error::{Error, Result};

/// A source of noise values.
pub trait Noise: Send + std::fmt::Debug {
    /// Draws an array of noise values with the given shape.
    fn generate(&mut self, shape: &[usize]) -> ArrayD<f64>;
}

/// Constant noise, for testing pipelines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugNoise {
    value: f64,
}

impl DebugNoise {
    /// Creates a generator that always returns `value`.
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Noise for DebugNoise {
    fn generate(&mut self, shape: &[usize]) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(shape), self.value)
    }
}

/// Uniform noise on `[low, high)`.
#[derive(Debug)]
pub struct UniformNoise {
    dist: Uniform<f64>,
    rng: StdRng,
}

impl UniformNoise {
    /// Creates a seeded uniform generator.
    ///
    /// # Errors
    ///
    /// Returns an error unless `low < high` and both bounds are finite.
    pub fn new(low: f64, high: f64, seed: u64) -> Result<Self> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(Error::invalid_config(format!(
                "uniform noise needs finite bounds with low < high, got [{low}, {high})"
            )));
        }
        Ok(Self {
            dist: Uniform::new(low, high),
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Noise for UniformNoise {
    fn generate(&mut self, shape: &[usize]) -> ArrayD<f64> {
        ArrayD::from_shape_simple_fn(IxDyn(shape), || self.dist.sample(&mut self.rng))
    }
}

/// Noise drawn from a finite set of values, uniformly or with given
/// probabilities.
#[derive(Debug)]
pub struct DiscreteNoise {
    values: Vec<f64>,
    weights: Option<WeightedIndex<f64>>,
    rng: StdRng,
}

impl DiscreteNoise {
    /// Creates a seeded discrete generator.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is empty, or if `prob` does not have one
    /// non-negative entry per value with a positive sum.
    pub fn new(values: Vec<f64>, prob: Option<Vec<f64>>, seed: u64) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::invalid_config("discrete noise needs at least one value"));
        }

        let weights = match prob {
            Some(prob) if prob.len() != values.len() => {
                return Err(Error::invalid_config(format!(
                    "discrete noise has {} values but {} probabilities",
                    values.len(),
                    prob.len()
                )));
            }
            Some(prob) => Some(WeightedIndex::new(&prob).map_err(|e| {
                Error::invalid_config(format!("invalid discrete noise probabilities: {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            values,
            weights,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    fn draw(&mut self) -> f64 {
        match &self.weights {
            Some(weights) => self.values[weights.sample(&mut self.rng)],
            None => self.values.choose(&mut self.rng).copied().unwrap_or_default(),
        }
    }
}

impl Noise for DiscreteNoise {
    fn generate(&mut self, shape: &[usize]) -> ArrayD<f64> {
        ArrayD::from_shape_simple_fn(IxDyn(shape), || self.draw())
    }
}

/// Gaussian noise with mean `mu` and standard deviation `sigma`.
#[derive(Debug)]
pub struct GaussianNoise {
    dist: Normal<f64>,
    rng: StdRng,
}

impl GaussianNoise {
    /// Creates a seeded Gaussian generator.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-finite or negative `sigma`.
    pub fn new(mu: f64, sigma: f64, seed: u64) -> Result<Self> {
        if !(sigma.is_finite() && sigma >= 0.0) {
            return Err(Error::invalid_config(format!(
                "gaussian noise needs a finite, non-negative sigma, got {sigma}"
            )));
        }
        let dist = Normal::new(mu, sigma)
            .map_err(|e| Error::invalid_config(format!("invalid gaussian noise: {e}")))?;
        Ok(Self {
            dist,
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Noise for GaussianNoise {
    fn generate(&mut self, shape: &[usize]) -> ArrayD<f64> {
        ArrayD::from_shape_simple_fn(IxDyn(shape), || self.dist.sample(&mut self.rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_noise_is_constant() {
        let noise = DebugNoise::new(0.5).generate(&[2, 3]);
        assert_eq!(noise.shape(), &[2, 3]);
        assert!(noise.iter().all(|&v| v == 0.5));
    }

    #[test]
    fn test_uniform_bounds_and_seed() {
        let a = UniformNoise::new(-1.0, 2.0, 3).unwrap().generate(&[500]);
        let b = UniformNoise::new(-1.0, 2.0, 3).unwrap().generate(&[500]);
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| (-1.0..2.0).contains(&v)));
        assert!(UniformNoise::new(1.0, 1.0, 0).is_err());
    }

    #[test]
    fn test_discrete_draws_only_given_values() {
        let mut noise = DiscreteNoise::new(vec![-1.0, 1.0], None, 7).unwrap();
        let values = noise.generate(&[200]);
        assert!(values.iter().all(|&v| v == -1.0 || v == 1.0));
        assert!(values.iter().any(|&v| v == -1.0));
        assert!(values.iter().any(|&v| v == 1.0));
    }

    #[test]
    fn test_discrete_probabilities() {
        let mut noise = DiscreteNoise::new(vec![-1.0, 1.0], Some(vec![0.0, 1.0]), 7).unwrap();
        assert!(noise.generate(&[100]).iter().all(|&v| v == 1.0));

        assert!(DiscreteNoise::new(vec![1.0], Some(vec![0.5, 0.5]), 0).is_err());
        assert!(DiscreteNoise::new(vec![1.0, 2.0], Some(vec![0.0, 0.0]), 0).is_err());
        assert!(DiscreteNoise::new(Vec::new(), None, 0).is_err());
    }

    #[test]
    fn test_gaussian_moments() {
        let values = GaussianNoise::new(2.0, 0.5, 11).unwrap().generate(&[4000]);
        let mean = values.mean().unwrap();
        let std = values.std(0.0);
        assert!((mean - 2.0).abs() < 0.05, "mean {mean}");
        assert!((std - 0.5).abs() < 0.05, "std {std}");
        assert!(GaussianNoise::new(0.0, f64::NAN, 0).is_err());
    }

    #[test]
    fn test_zero_sized_shapes() {
        let mut noise = GaussianNoise::new(0.0, 1.0, 0).unwrap();
        assert_eq!(noise.generate(&[0, 3]).len(), 0);
    }
}
