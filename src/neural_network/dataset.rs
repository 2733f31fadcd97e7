use crate::error::ModelError;
use crate::neural_network::Tensor;
use ndarray::{Array2, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Paired feature and label matrices, ready for batching.
///
/// Rows are samples. Labels are already encoded the way the network's loss
/// expects them (one-hot rows for classification, raw targets for regression).
///
/// # Example
/// ```rust
/// use modelsmith::neural_network::Dataset;
/// use ndarray::Array2;
///
/// let ds = Dataset::new(Array2::zeros((10, 4)), Array2::zeros((10, 3))).unwrap();
/// assert_eq!(ds.len(), 10);
/// assert_eq!(ds.steps_per_pass(4), 3);
///
/// // an endless stream of batches; the last batch of each pass is partial
/// let sizes: Vec<usize> = ds.stream(4, None).take(4).map(|(x, _)| x.shape()[0]).collect();
/// assert_eq!(sizes, vec![4, 4, 2, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Array2<f32>,
}

impl Dataset {
    /// Pairs features with labels.
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - The dataset
    /// - `Err(ModelError::InputValidationError)` - If it is empty, row counts differ, or a value is not finite
    pub fn new(features: Array2<f32>, labels: Array2<f32>) -> Result<Self, ModelError> {
        if features.nrows() == 0 {
            return Err(ModelError::InputValidationError(
                "Dataset must contain at least one sample".to_string(),
            ));
        }

        if features.nrows() != labels.nrows() {
            return Err(ModelError::InputValidationError(format!(
                "Sample count mismatch: features have {} rows, labels have {} rows",
                features.nrows(),
                labels.nrows()
            )));
        }

        if features.iter().chain(labels.iter()).any(|v| !v.is_finite()) {
            return Err(ModelError::InputValidationError(
                "Dataset contains NaN or infinite values".to_string(),
            ));
        }

        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_outputs(&self) -> usize {
        self.labels.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    pub fn labels(&self) -> ArrayView2<'_, f32> {
        self.labels.view()
    }

    /// Number of batches needed to see every sample once.
    pub fn steps_per_pass(&self, batch_size: usize) -> usize {
        self.len().div_ceil(batch_size.max(1))
    }

    /// Gathers the given rows into a (features, labels) tensor pair.
    pub fn batch(&self, indices: &[usize]) -> (Tensor, Tensor) {
        (
            self.features.select(Axis(0), indices).into_dyn(),
            self.labels.select(Axis(0), indices).into_dyn(),
        )
    }

    /// Creates an endlessly repeating batch iterator over the dataset.
    ///
    /// # Parameters
    ///
    /// - `batch_size` - Rows per batch (0 is treated as 1)
    /// - `shuffle_seed` - `Some(seed)` reshuffles the sample order before every pass
    ///   with a generator seeded once from `seed`; `None` keeps the stored order
    pub fn stream(&self, batch_size: usize, shuffle_seed: Option<u64>) -> BatchStream<'_> {
        BatchStream::new(self, batch_size, shuffle_seed)
    }
}

/// Endless batch iterator over a [`Dataset`].
///
/// Passes are laid end to end, so a caller asking for `k` batches per epoch
/// continues where the previous epoch stopped. Each pass ends with a partial
/// batch when the dataset size is not a multiple of the batch size.
pub struct BatchStream<'a> {
    dataset: &'a Dataset,
    batch_size: usize,
    order: Vec<usize>,
    cursor: usize,
    rng: Option<StdRng>,
    passes: usize,
}

impl<'a> BatchStream<'a> {
    fn new(dataset: &'a Dataset, batch_size: usize, shuffle_seed: Option<u64>) -> Self {
        let mut stream = Self {
            dataset,
            batch_size: batch_size.max(1),
            order: (0..dataset.len()).collect(),
            cursor: 0,
            rng: shuffle_seed.map(StdRng::seed_from_u64),
            passes: 0,
        };
        stream.reshuffle();
        stream
    }

    fn reshuffle(&mut self) {
        if let Some(rng) = self.rng.as_mut() {
            self.order.shuffle(rng);
        }
    }

    /// Number of completed passes over the dataset.
    pub fn passes(&self) -> usize {
        self.passes
    }
}

impl Iterator for BatchStream<'_> {
    type Item = (Tensor, Tensor);

    fn next(&mut self) -> Option<Self::Item> {
        if self.order.is_empty() {
            return None;
        }

        if self.cursor >= self.order.len() {
            self.cursor = 0;
            self.passes += 1;
            self.reshuffle();
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.dataset.batch(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }
}
