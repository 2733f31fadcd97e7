use ndarray::Array2;
use ndarray_rand::RandomExt;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand_distr::Uniform;
use serde::{Deserialize, Serialize};

/// Weight initialization schemes for layer kernels.
///
/// # Variants
///
/// - `GlorotUniform` - Samples from U(-limit, limit) with limit = sqrt(6 / (fan_in + fan_out)).
///   A seed makes the draw reproducible.
/// - `Zeros` - All weights start at zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initializer {
    GlorotUniform { seed: Option<u64> },
    Zeros,
}

impl Default for Initializer {
    fn default() -> Self {
        Initializer::GlorotUniform { seed: None }
    }
}

impl Initializer {
    /// Glorot uniform with a fixed seed.
    pub fn glorot_uniform_seeded(seed: u64) -> Self {
        Initializer::GlorotUniform { seed: Some(seed) }
    }

    /// Half-width of the Glorot uniform interval for a kernel of the given fans.
    pub fn glorot_limit(fan_in: usize, fan_out: usize) -> f32 {
        (6.0 / (fan_in + fan_out) as f32).sqrt()
    }

    /// Creates a kernel of shape (fan_in, fan_out).
    ///
    /// # Parameters
    ///
    /// - `fan_in` - Number of input units
    /// - `fan_out` - Number of output units
    ///
    /// # Returns
    ///
    /// * `Array2<f32>` - The initialized kernel
    pub fn initialize(&self, fan_in: usize, fan_out: usize) -> Array2<f32> {
        match *self {
            Initializer::Zeros => Array2::zeros((fan_in, fan_out)),
            Initializer::GlorotUniform { seed } => {
                let limit = Self::glorot_limit(fan_in, fan_out);
                let dist = Uniform::new(-limit, limit);
                match seed {
                    Some(seed) => {
                        let mut rng = StdRng::seed_from_u64(seed);
                        Array2::random_using((fan_in, fan_out), dist, &mut rng)
                    }
                    None => Array2::random((fan_in, fan_out), dist),
                }
            }
        }
    }
}
